//! Body metric formulas: BMI, BMR (Mifflin-St Jeor) and TDEE.
//!
//! Everything here is pure. Functions that depend on "now" take `today` as an
//! argument so callers decide which clock to use.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Other];

    /// Constant added after the shared `10w + 6.25h - 5a` term.
    #[must_use]
    pub fn offset(self) -> f64 {
        match self {
            Sex::Male => 5.0,
            Sex::Female => -161.0,
            Sex::Other => -78.0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }
}

impl FromStr for Sex {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            "other" => Ok(Sex::Other),
            _ => Err(InvalidInput::UnknownSex(s.to_string())),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    #[default]
    Sedentary,
    /// Exercise 1-3 times a week
    Light,
    /// Exercise 4-5 times a week
    Moderate,
    /// Exercise 6-7 times a week
    Active,
    /// Training twice a day or more
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Little or no exercise",
            ActivityLevel::Light => "Exercise 1-3 times per week",
            ActivityLevel::Moderate => "Exercise 4-5 times per week",
            ActivityLevel::Active => "Exercise 6-7 times per week",
            ActivityLevel::VeryActive => "Exercise twice a day or more",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = InvalidInput;

    /// Keys are matched exactly; only surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| InvalidInput::UnknownActivityLevel(s.to_string()))
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round half away from zero to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Body Mass Index: `weight / height_m²`, rounded to 2 decimals.
///
/// A non-positive height yields `0.0` instead of dividing by zero.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if height_cm <= 0.0 {
        return 0.0;
    }
    let height_m = height_cm / 100.0;
    round2(weight_kg / (height_m * height_m))
}

/// Age as the difference of calendar years. Month and day are ignored.
#[must_use]
pub fn age_in_years(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - birth_date.year()
}

/// Basal Metabolic Rate (Mifflin-St Jeor) in kcal/day.
#[must_use]
pub fn bmr(
    weight_kg: f64,
    height_cm: f64,
    birth_date: NaiveDate,
    sex: Sex,
    today: NaiveDate,
) -> f64 {
    let age = f64::from(age_in_years(birth_date, today));
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * age + sex.offset()
}

/// Total Daily Energy Expenditure: BMR scaled by the activity multiplier.
#[must_use]
pub fn tdee(bmr: f64, level: ActivityLevel) -> f64 {
    bmr * level.multiplier()
}

/// [`bmr`] for callers holding the raw sex string.
pub fn bmr_from_str(
    weight_kg: f64,
    height_cm: f64,
    birth_date: NaiveDate,
    sex: &str,
    today: NaiveDate,
) -> Result<f64, InvalidInput> {
    let sex: Sex = sex.parse()?;
    Ok(bmr(weight_kg, height_cm, birth_date, sex, today))
}

/// [`tdee`] for callers holding the raw activity level key.
pub fn tdee_from_str(bmr: f64, level: &str) -> Result<f64, InvalidInput> {
    let level: ActivityLevel = level.parse()?;
    Ok(tdee(bmr, level))
}

/// The three derived values stored with every profile snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileMetrics {
    pub bmi: f64,
    pub bmr: f64,
    pub tdee: f64,
}

impl ProfileMetrics {
    /// BMR is only computed for a positive height and TDEE only for a
    /// positive BMR; otherwise they are zero.
    #[must_use]
    pub fn compute(
        weight_kg: f64,
        height_cm: f64,
        birth_date: NaiveDate,
        sex: Sex,
        level: ActivityLevel,
        today: NaiveDate,
    ) -> Self {
        let bmi = bmi(weight_kg, height_cm);
        let bmr = if height_cm > 0.0 {
            bmr(weight_kg, height_cm, birth_date, sex, today)
        } else {
            0.0
        };
        let tdee = if bmr > 0.0 { tdee(bmr, level) } else { 0.0 };
        Self { bmi, bmr, tdee }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bmi_reference_value() {
        assert_eq!(bmi(70.0, 175.0), 22.86);
    }

    #[test]
    fn test_bmi_zero_height() {
        assert_eq!(bmi(70.0, 0.0), 0.0);
        assert_eq!(bmi(120.0, 0.0), 0.0);
        assert_eq!(bmi(70.0, -10.0), 0.0);
    }

    #[test]
    fn test_age_ignores_month_and_day() {
        let today = ymd(2024, 1, 1);
        assert_eq!(age_in_years(ymd(1990, 12, 31), today), 34);
        assert_eq!(age_in_years(ymd(1990, 1, 1), today), 34);
    }

    #[test]
    fn test_bmr_male_reference_value() {
        // 10*70 + 6.25*175 - 5*34 + 5 = 1628.75
        let v = bmr(70.0, 175.0, ymd(1990, 6, 1), Sex::Male, ymd(2024, 3, 1));
        assert!((v - 1628.75).abs() < 1e-9);
    }

    #[test]
    fn test_bmr_male_female_gap() {
        let birth = ymd(1985, 4, 12);
        let today = ymd(2024, 6, 15);
        let male = bmr(80.0, 180.0, birth, Sex::Male, today);
        let female = bmr(80.0, 180.0, birth, Sex::Female, today);
        assert_eq!(male - female, 166.0);
    }

    #[test]
    fn test_bmr_other_offset() {
        let birth = ymd(2000, 1, 1);
        let today = ymd(2024, 1, 1);
        let male = bmr(60.0, 165.0, birth, Sex::Male, today);
        let other = bmr(60.0, 165.0, birth, Sex::Other, today);
        assert_eq!(male - other, 83.0);
    }

    #[test]
    fn test_bmr_monotonic_in_weight_and_height() {
        let birth = ymd(1995, 2, 2);
        let today = ymd(2024, 2, 2);
        for sex in Sex::ALL {
            let mut prev = f64::MIN;
            for w in 40..120 {
                let v = bmr(f64::from(w), 170.0, birth, sex, today);
                assert!(v > prev);
                prev = v;
            }
            let mut prev = f64::MIN;
            for h in 140..210 {
                let v = bmr(70.0, f64::from(h), birth, sex, today);
                assert!(v > prev);
                prev = v;
            }
        }
    }

    #[test]
    fn test_sex_parse_case_insensitive() {
        assert_eq!("Male".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!("FEMALE".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(" other ".parse::<Sex>().unwrap(), Sex::Other);
    }

    #[test]
    fn test_sex_parse_invalid() {
        let err = "robot".parse::<Sex>().unwrap_err();
        assert_eq!(err, InvalidInput::UnknownSex("robot".to_string()));
    }

    #[test]
    fn test_bmr_from_str_rejects_unknown_sex() {
        let r = bmr_from_str(70.0, 175.0, ymd(1990, 1, 1), "x", ymd(2024, 1, 1));
        assert!(r.is_err());
        let ok = bmr_from_str(70.0, 175.0, ymd(1990, 1, 1), "MALE", ymd(2024, 1, 1));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_tdee_exact_for_each_level() {
        let base = 1628.75;
        let expected = [
            ("sedentary", 1.2),
            ("light", 1.375),
            ("moderate", 1.55),
            ("active", 1.725),
            ("very_active", 1.9),
        ];
        for (key, factor) in expected {
            let level: ActivityLevel = key.parse().unwrap();
            assert_eq!(tdee(base, level), base * factor);
            assert_eq!(tdee_from_str(base, key).unwrap(), base * factor);
        }
    }

    #[test]
    fn test_tdee_unknown_level() {
        assert!(tdee_from_str(1500.0, "couch_potato").is_err());
        assert!(tdee_from_str(1500.0, "").is_err());
        assert!(matches!(
            "extreme".parse::<ActivityLevel>(),
            Err(InvalidInput::UnknownActivityLevel(_))
        ));
    }

    #[test]
    fn test_activity_level_round_trips_through_key() {
        for level in ActivityLevel::ALL {
            assert_eq!(level.as_str().parse::<ActivityLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_profile_metrics_zero_height() {
        let m = ProfileMetrics::compute(
            70.0,
            0.0,
            ymd(1990, 1, 1),
            Sex::Male,
            ActivityLevel::Active,
            ymd(2024, 1, 1),
        );
        assert_eq!(m.bmi, 0.0);
        assert_eq!(m.bmr, 0.0);
        assert_eq!(m.tdee, 0.0);
    }

    #[test]
    fn test_profile_metrics_full() {
        let m = ProfileMetrics::compute(
            70.0,
            175.0,
            ymd(1990, 1, 1),
            Sex::Male,
            ActivityLevel::Sedentary,
            ymd(2024, 1, 1),
        );
        assert_eq!(m.bmi, 22.86);
        assert!((m.bmr - 1628.75).abs() < 1e-9);
        assert!((m.tdee - 1628.75 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_profile_metrics_negative_bmr_has_no_tdee() {
        // A tiny weight drives BMR below zero; TDEE is then not computed.
        let m = ProfileMetrics::compute(
            1.0,
            10.0,
            ymd(1920, 1, 1),
            Sex::Female,
            ActivityLevel::VeryActive,
            ymd(2024, 1, 1),
        );
        assert!(m.bmr < 0.0);
        assert_eq!(m.tdee, 0.0);
    }
}
