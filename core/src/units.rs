//! Height and weight units accepted at entry time.
//!
//! Storage is always metric. The entry unit is kept next to each profile
//! snapshot only so the value can be shown back the way it was typed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calculators::round2;
use crate::error::InvalidInput;

pub const CM_PER_FT: f64 = 30.48;
pub const LBS_PER_KG: f64 = 2.20462;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Cm,
    Ft,
}

impl HeightUnit {
    #[must_use]
    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            HeightUnit::Cm => value,
            HeightUnit::Ft => value * CM_PER_FT,
        }
    }

    /// Convert stored centimetres back to this unit, rounded for display.
    #[must_use]
    pub fn from_cm(self, cm: f64) -> f64 {
        match self {
            HeightUnit::Cm => cm,
            HeightUnit::Ft => round2(cm / CM_PER_FT),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HeightUnit::Cm => "cm",
            HeightUnit::Ft => "ft",
        }
    }
}

impl FromStr for HeightUnit {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cm" => Ok(HeightUnit::Cm),
            "ft" | "feet" => Ok(HeightUnit::Ft),
            _ => Err(InvalidInput::UnknownHeightUnit(s.to_string())),
        }
    }
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    #[must_use]
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lbs => value / LBS_PER_KG,
        }
    }

    /// Convert stored kilograms back to this unit, rounded for display.
    #[must_use]
    pub fn from_kg(self, kg: f64) -> f64 {
        match self {
            WeightUnit::Kg => kg,
            WeightUnit::Lbs => round2(kg * LBS_PER_KG),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }
}

impl FromStr for WeightUnit {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "lbs" | "lb" => Ok(WeightUnit::Lbs),
            _ => Err(InvalidInput::UnknownWeightUnit(s.to_string())),
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_conversion() {
        assert!((HeightUnit::Ft.to_cm(6.0) - 182.88).abs() < 1e-9);
        assert_eq!(HeightUnit::Cm.to_cm(175.0), 175.0);
        assert_eq!(HeightUnit::Ft.from_cm(182.88), 6.0);
    }

    #[test]
    fn test_weight_conversion() {
        let kg = WeightUnit::Lbs.to_kg(154.0);
        assert!((kg - 69.853).abs() < 0.001);
        assert_eq!(WeightUnit::Lbs.from_kg(kg), 154.0);
        assert_eq!(WeightUnit::Kg.to_kg(70.0), 70.0);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("CM".parse::<HeightUnit>().unwrap(), HeightUnit::Cm);
        assert_eq!("ft".parse::<HeightUnit>().unwrap(), HeightUnit::Ft);
        assert_eq!("lb".parse::<WeightUnit>().unwrap(), WeightUnit::Lbs);
        assert_eq!("Kg".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
    }

    #[test]
    fn test_unit_parsing_invalid() {
        assert!(matches!(
            "inch".parse::<HeightUnit>(),
            Err(InvalidInput::UnknownHeightUnit(_))
        ));
        assert!(matches!(
            "stone".parse::<WeightUnit>(),
            Err(InvalidInput::UnknownWeightUnit(_))
        ));
    }
}
