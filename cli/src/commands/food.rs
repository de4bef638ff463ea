use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use bodyledger_core::service::HealthService;

use super::helpers::{no_neg_zero, truncate};

pub(crate) fn cmd_food_add(
    svc: &HealthService,
    name: &str,
    calories: f64,
    json: bool,
) -> Result<()> {
    let food = svc.add_catalog_food(name, calories)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        println!(
            "Saved {} ({} cal per unit)",
            food.food_name,
            no_neg_zero(food.calories_per_unit)
        );
    }
    Ok(())
}

pub(crate) fn cmd_food_list(svc: &HealthService, json: bool) -> Result<()> {
    let foods = svc.list_catalog()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else if foods.is_empty() {
        eprintln!("No foods in the catalog. Use `bodyledger food add` or `bodyledger import catalog`.");
    } else {
        #[derive(Tabled)]
        struct FoodRow {
            #[tabled(rename = "#")]
            idx: usize,
            #[tabled(rename = "Food")]
            name: String,
            #[tabled(rename = "Cal/unit")]
            calories: String,
        }

        let rows: Vec<FoodRow> = foods
            .iter()
            .enumerate()
            .map(|(i, f)| FoodRow {
                idx: i + 1,
                name: truncate(&f.food_name, 35),
                calories: format!("{}", no_neg_zero(f.calories_per_unit)),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }
    Ok(())
}
