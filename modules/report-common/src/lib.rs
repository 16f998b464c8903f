pub mod changes;
pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use changes::{path, Change, ChangeSet};
pub use config::{Collections, Config, Policy};
pub use error::ConfigError;
pub use geo::{haversine_km, CoordKey};
pub use types::*;
