use anyhow::Result;

use bodyledger_core::calculators::ActivityLevel;
use bodyledger_core::models::ProfileForm;
use bodyledger_core::service::HealthService;

use super::helpers::{chart_table, json_error, print_profile};

pub(crate) fn cmd_login(svc: &HealthService, user: &str, json: bool) -> Result<()> {
    let view = svc.login(user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if let Some(ref profile) = view.profile {
        print_profile(profile);
    } else {
        println!("Welcome, {}! No profile saved yet.", view.user);
        println!(
            "  Save one with `bodyledger profile save {} --sex ... --birth-date ... --height ... --weight ...`",
            view.user
        );
    }
    println!();
    println!("Last 7 days:");
    println!("{}", chart_table(&view.chart));
    Ok(())
}

pub(crate) fn cmd_profile_save(
    svc: &HealthService,
    user: &str,
    form: &ProfileForm,
    json: bool,
) -> Result<()> {
    let saved = svc.save_info(user, form)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
    } else {
        println!(
            "Saved profile for {}: BMI {:.2}, BMR {:.0} kcal, TDEE {:.0} kcal",
            saved.user_id, saved.bmi, saved.bmr, saved.tdee
        );
        if saved.height_cm <= 0.0 {
            eprintln!("Note: height is 0, so BMR and TDEE were not calculated.");
        }
        let chart = svc.build_rolling_chart(&saved.user_id)?;
        println!();
        println!("Last 7 days:");
        println!("{}", chart_table(&chart));
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &HealthService, user: &str, json: bool) -> Result<()> {
    let profile = svc.latest_profile(user)?;

    match profile {
        Some(view) if json => println!("{}", serde_json::to_string_pretty(&view)?),
        Some(view) => print_profile(&view),
        None if json => println!("{}", json_error(&format!("No profile saved for '{user}'"))),
        None => eprintln!("No profile saved for '{user}'."),
    }
    Ok(())
}

pub(crate) fn cmd_activity_levels(json: bool) -> Result<()> {
    if json {
        let levels: Vec<_> = ActivityLevel::ALL
            .iter()
            .map(|l| {
                serde_json::json!({
                    "key": l.as_str(),
                    "multiplier": l.multiplier(),
                    "description": l.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&levels)?);
    } else {
        for level in ActivityLevel::ALL {
            println!(
                "  {:<12} x{:<6} {}",
                level.as_str(),
                level.multiplier(),
                level.description()
            );
        }
    }
    Ok(())
}
