#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod loader;
mod telemetry;
mod types;

pub use loader::load;
pub use telemetry::init_telemetry;
pub use types::Config;
