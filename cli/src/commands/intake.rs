use anyhow::Result;

use bodyledger_core::service::HealthService;

use super::helpers::chart_table;

/// Returns `false` when any unit could not be recorded.
pub(crate) fn cmd_eat(
    svc: &HealthService,
    user: &str,
    food: &str,
    quantity: u32,
    json: bool,
) -> Result<bool> {
    let report = svc.add_food(user, food, quantity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in &report.outcomes {
            if outcome.success {
                println!("{}", outcome.message);
            } else {
                eprintln!("{}", outcome.message);
            }
        }
        let chart = svc.build_rolling_chart(user)?;
        println!();
        println!("Last 7 days:");
        println!("{}", chart_table(&chart));
    }

    Ok(report.success)
}
