mod activity;
mod export;
mod food;
mod helpers;
mod log;
mod profile;
mod summary;
mod weight;

pub(crate) use activity::cmd_activity;
pub(crate) use export::{cmd_export, cmd_import, cmd_info};
pub(crate) use food::{cmd_food, cmd_foods};
pub(crate) use log::cmd_log;
pub(crate) use profile::{cmd_profile_set, cmd_profile_show};
pub(crate) use summary::cmd_summary;
pub(crate) use weight::{cmd_weight_history, cmd_weight_set, cmd_weight_show};
