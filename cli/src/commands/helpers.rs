use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Columns},
};

use bodyledger_core::chart::RollingChart;
use bodyledger_core::models::ProfileView;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
        },
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

fn kcal(v: f64) -> String {
    format!("{:.0}", no_neg_zero(v))
}

pub(crate) fn print_profile(view: &ProfileView) {
    let p = &view.profile;
    println!("{} (saved {})", p.user_id, p.recorded_at.format("%Y-%m-%d %H:%M"));
    println!("  Sex:        {}", p.sex);
    println!("  Born:       {}", p.birth_date.format("%Y-%m-%d"));
    println!("  Height:     {} {}", view.height, p.height_unit);
    println!("  Weight:     {} {}", view.weight, p.weight_unit);
    println!(
        "  Activity:   {} ({})",
        p.activity_level,
        p.activity_level.description()
    );
    println!("  BMI:        {:.2}", p.bmi);
    println!("  BMR:        {} kcal/day", kcal(p.bmr));
    println!("  TDEE:       {} kcal/day", kcal(p.tdee));
}

/// One row per day: calories per food, total, TDEE and target status.
pub(crate) fn chart_table(chart: &RollingChart) -> Table {
    let mut builder = Builder::default();

    let mut header = vec!["Date".to_string()];
    header.extend(chart.foods.iter().map(|f| truncate(&f.food_name, 20)));
    header.extend(["Total", "TDEE", "Status"].map(String::from));
    builder.push_record(header);

    for (i, day) in chart.days.iter().enumerate() {
        let mut row = vec![day.date.format("%Y-%m-%d").to_string()];
        row.extend(chart.foods.iter().map(|f| kcal(f.calories_per_day[i])));
        row.push(kcal(day.intake));
        row.push(kcal(day.tdee));
        row.push(day.status.label().to_string());
        builder.push_record(row);
    }

    let food_cols = chart.foods.len();
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..food_cols + 3)).with(Alignment::right()));
    table
}
