mod chart;
mod food;
mod helpers;
mod import;
mod intake;
mod profile;

pub(crate) use chart::cmd_chart;
pub(crate) use food::{cmd_food_add, cmd_food_list};
pub(crate) use import::{ImportKind, cmd_import};
pub(crate) use intake::cmd_eat;
pub(crate) use profile::{cmd_activity_levels, cmd_login, cmd_profile_save, cmd_profile_show};
