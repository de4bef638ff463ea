use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calculators::{ActivityLevel, Sex};
use crate::error::InvalidInput;
use crate::units::{HeightUnit, WeightUnit};

/// Storage format for record timestamps (local time, microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One saved snapshot of a user's body metrics. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalProfile {
    pub id: i64,
    pub recorded_at: NaiveDateTime,
    pub user_id: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
    pub bmr: f64,
    pub tdee: f64,
    pub activity_level: ActivityLevel,
    pub height_unit: HeightUnit,
    pub weight_unit: WeightUnit,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub recorded_at: NaiveDateTime,
    pub user_id: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
    pub bmr: f64,
    pub tdee: f64,
    pub activity_level: ActivityLevel,
    pub height_unit: HeightUnit,
    pub weight_unit: WeightUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodCatalogEntry {
    pub id: i64,
    pub food_name: String,
    pub calories_per_unit: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// A single consumption of one catalog unit. `calories` is a copy taken when
/// the event was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeEvent {
    pub id: i64,
    pub recorded_at: NaiveDateTime,
    pub user_id: String,
    pub food_name: String,
    pub calories: f64,
}

#[derive(Debug, Clone)]
pub struct NewIntakeEvent {
    pub recorded_at: NaiveDateTime,
    pub user_id: String,
    pub food_name: String,
    pub calories: f64,
}

/// Result of one attempted intake append. An unknown food is reported here
/// with `success = false`, not as an error.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<IntakeEvent>,
}

impl IntakeOutcome {
    #[must_use]
    pub fn added(event: IntakeEvent) -> Self {
        let message = format!("Added {} ({} cal)!", event.food_name, event.calories);
        Self {
            success: true,
            message,
            event: Some(event),
        }
    }

    #[must_use]
    pub fn unknown_food(food_name: &str) -> Self {
        Self {
            success: false,
            message: format!("Food '{food_name}' not found!"),
            event: None,
        }
    }

    #[must_use]
    pub fn failed(food_name: &str, err: &anyhow::Error) -> Self {
        Self {
            success: false,
            message: format!("Failed to add {food_name}: {err:#}"),
            event: None,
        }
    }
}

/// Raw values as entered by a user, before parsing and unit normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub sex: String,
    pub birth_date: String,
    pub height: f64,
    pub weight: f64,
    #[serde(default = "default_height_unit")]
    pub height_unit: String,
    #[serde(default = "default_weight_unit")]
    pub weight_unit: String,
    #[serde(default = "default_activity_level")]
    pub activity_level: String,
}

fn default_height_unit() -> String {
    HeightUnit::Cm.as_str().to_string()
}

fn default_weight_unit() -> String {
    WeightUnit::Kg.as_str().to_string()
}

fn default_activity_level() -> String {
    ActivityLevel::Sedentary.as_str().to_string()
}

impl ProfileForm {
    /// Prefill for a user with no saved profile: male, born 1 January
    /// 25 years ago, zero height and weight, sedentary.
    #[must_use]
    pub fn defaults(today: NaiveDate) -> Self {
        let birth = NaiveDate::from_ymd_opt(today.year() - 25, 1, 1).unwrap_or(today);
        Self {
            sex: Sex::Male.as_str().to_string(),
            birth_date: birth.format("%Y-%m-%d").to_string(),
            height: 0.0,
            weight: 0.0,
            height_unit: default_height_unit(),
            weight_unit: default_weight_unit(),
            activity_level: default_activity_level(),
        }
    }

    #[must_use]
    pub fn from_view(view: &ProfileView) -> Self {
        let p = &view.profile;
        Self {
            sex: p.sex.as_str().to_string(),
            birth_date: p.birth_date.format("%Y-%m-%d").to_string(),
            height: view.height,
            weight: view.weight,
            height_unit: p.height_unit.as_str().to_string(),
            weight_unit: p.weight_unit.as_str().to_string(),
            activity_level: p.activity_level.as_str().to_string(),
        }
    }
}

/// A stored profile with height and weight re-expressed in the units the
/// user originally entered them in.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub profile: PersonalProfile,
    pub height: f64,
    pub weight: f64,
}

impl From<PersonalProfile> for ProfileView {
    fn from(profile: PersonalProfile) -> Self {
        let height = profile.height_unit.from_cm(profile.height_cm);
        let weight = profile.weight_unit.from_kg(profile.weight_kg);
        Self {
            profile,
            height,
            weight,
        }
    }
}

/// Fold an ordered log into the user's current snapshot: the last matching
/// record wins.
pub fn latest_by_user<'a, I>(records: I, user_id: &str) -> Option<&'a PersonalProfile>
where
    I: IntoIterator<Item = &'a PersonalProfile>,
{
    records
        .into_iter()
        .fold(None, |current, record| {
            if record.user_id == user_id {
                Some(record)
            } else {
                current
            }
        })
}

pub fn validate_user_id(user_id: &str) -> Result<String, InvalidInput> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput::EmptyUserId);
    }
    Ok(trimmed.to_string())
}

pub fn validate_measurement(field: &'static str, value: f64) -> Result<f64, InvalidInput> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidInput::NonFiniteMeasurement {
            field,
            value: value.to_string(),
        })
    }
}

pub fn validate_catalog_food(food_name: &str, calories_per_unit: f64) -> anyhow::Result<()> {
    if food_name.trim().is_empty() {
        anyhow::bail!("Food name must not be empty");
    }
    if !calories_per_unit.is_finite() || calories_per_unit < 0.0 {
        anyhow::bail!("Calories must be a non-negative number, got {calories_per_unit}");
    }
    Ok(())
}

/// Accepts ISO dates (`1990-04-12`) and the day:month:year form
/// (`12:Apr:1990`).
pub fn parse_birth_date(s: &str) -> Result<NaiveDate, InvalidInput> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d:%b:%Y"))
        .map_err(|_| InvalidInput::InvalidBirthDate(s.to_string()))
}

#[must_use]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the storage format as well as space-separated timestamps with or
/// without fractional seconds.
pub fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| anyhow::anyhow!("Invalid timestamp '{s}'"))
}
