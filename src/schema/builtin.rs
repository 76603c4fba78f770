use super::Schema;
use std::sync::{Arc, OnceLock};

pub const CONNECT_SCHEMA_YAML: &str = include_str!("connect.yaml");

/// The Connect wizard schema shipped with the crate, parsed once per process.
pub fn connect_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            // Guarded by `embedded_schema_parses_with_expected_shape`.
            Arc::new(
                Schema::from_yaml_str(CONNECT_SCHEMA_YAML)
                    .expect("embedded connect schema is valid"),
            )
        })
        .clone()
}
