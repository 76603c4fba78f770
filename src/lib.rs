pub mod engine;
pub mod schema;
pub mod shared;

pub use engine::{ConfigError, ConnectSession, StateModel, UpdateIntent};
pub use schema::{Schema, SchemaError};
