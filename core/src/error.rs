use thiserror::Error;

/// A value outside one of the closed input categories.
///
/// These are hard failures: callers must surface them rather than fall back
/// to a default, since they mean the entered data cannot be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("Invalid sex '{0}'. Must be one of: male, female, other")]
    UnknownSex(String),

    #[error(
        "Invalid activity level '{0}'. Must be one of: sedentary, light, moderate, active, very_active"
    )]
    UnknownActivityLevel(String),

    #[error("Invalid height unit '{0}'. Use 'cm' or 'ft'")]
    UnknownHeightUnit(String),

    #[error("Invalid weight unit '{0}'. Use 'kg' or 'lbs'")]
    UnknownWeightUnit(String),

    #[error("Invalid birth date '{0}'. Use YYYY-MM-DD or D:Mon:YYYY")]
    InvalidBirthDate(String),

    #[error("Invalid {field} '{value}'. Must be a finite number")]
    NonFiniteMeasurement { field: &'static str, value: String },

    #[error("User name must not be empty")]
    EmptyUserId,
}
