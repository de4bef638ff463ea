use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{IntakeEvent, PersonalProfile};

pub const WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// Intake reached or exceeded the day's TDEE.
    Met,
    Under,
}

impl TargetStatus {
    #[must_use]
    pub fn for_day(intake: f64, tdee: f64) -> Self {
        if intake >= tdee {
            TargetStatus::Met
        } else {
            TargetStatus::Under
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TargetStatus::Met => "met/over target",
            TargetStatus::Under => "under target",
        }
    }
}

/// Calories from one food on each window date, aligned with `RollingChart::dates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodSeries {
    pub food_name: String,
    pub calories_per_day: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPoint {
    pub date: NaiveDate,
    pub intake: f64,
    pub tdee: f64,
    pub status: TargetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingChart {
    pub user: String,
    pub dates: Vec<NaiveDate>,
    pub foods: Vec<FoodSeries>,
    pub days: Vec<DayPoint>,
}

/// `today - 6 ..= today`, oldest first.
#[must_use]
pub fn window_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WINDOW_DAYS)
        .rev()
        .map(|offset| today - Duration::days(offset as i64))
        .collect()
}

/// Reconstruct the trailing window from the two logs. Records belonging to
/// other users are ignored, and both slices are read in insertion order.
pub fn build_rolling_chart_at(
    user: &str,
    today: NaiveDate,
    profiles: &[PersonalProfile],
    events: &[IntakeEvent],
) -> RollingChart {
    let dates = window_dates(today);
    let first = dates[0];
    let index_of = |date: NaiveDate| -> Option<usize> {
        let offset = (date - first).num_days();
        usize::try_from(offset).ok().filter(|&i| i < WINDOW_DAYS)
    };

    let mut foods: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for event in events.iter().filter(|e| e.user_id == user) {
        let series = foods
            .entry(event.food_name.as_str())
            .or_insert_with(|| vec![0.0; WINDOW_DAYS]);
        if let Some(i) = index_of(event.recorded_at.date()) {
            series[i] += event.calories;
        }
    }

    // Last TDEE of each day in the window, plus the last one before it.
    let mut carried = 0.0;
    let mut daily_tdee: [Option<f64>; WINDOW_DAYS] = [None; WINDOW_DAYS];
    for profile in profiles.iter().filter(|p| p.user_id == user) {
        let date = profile.recorded_at.date();
        if date < first {
            carried = profile.tdee;
        } else if let Some(i) = index_of(date) {
            daily_tdee[i] = Some(profile.tdee);
        }
    }

    let days = dates
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            if let Some(tdee) = daily_tdee[i] {
                carried = tdee;
            }
            // f64's Sum starts from -0.0
            let intake = foods.values().fold(0.0, |acc, series| acc + series[i]);
            DayPoint {
                date,
                intake,
                tdee: carried,
                status: TargetStatus::for_day(intake, carried),
            }
        })
        .collect();

    RollingChart {
        user: user.to_string(),
        dates,
        foods: foods
            .into_iter()
            .map(|(name, calories_per_day)| FoodSeries {
                food_name: name.to_string(),
                calories_per_day,
            })
            .collect(),
        days,
    }
}
