use anyhow::Result;

use bodyledger_core::service::HealthService;

use super::helpers::{chart_table, parse_date};

pub(crate) fn cmd_chart(
    svc: &HealthService,
    user: &str,
    until: Option<String>,
    json: bool,
) -> Result<()> {
    let today = parse_date(until)?;
    let chart = svc.build_rolling_chart_at(user, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chart)?);
    } else {
        println!(
            "{}: {} to {}",
            chart.user,
            chart.dates[0].format("%Y-%m-%d"),
            today.format("%Y-%m-%d")
        );
        println!("{}", chart_table(&chart));
    }
    Ok(())
}
