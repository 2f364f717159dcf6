pub mod counter;
pub mod db;
pub mod error;
pub mod models;
pub mod prefill;

pub use counter::{CalorieCounter, Clock, FixedClock, ModelState, SystemClock};
pub use db::{Collection, LocalStore, StoreLocation};
pub use error::StoreError;
pub use prefill::FoodTable;
