pub mod api;
pub mod date_utils;
pub mod logging;

pub use api::{ApiClient, CensusBackend};
pub use logging::init_logging;
