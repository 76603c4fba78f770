//! Serde glue for schema documents, where ids and templates are written as
//! plain strings but must be validated when the document is read.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt::Display;

/// Reads a string and runs `parser` over it. A parser failure becomes a
/// deserialization error naming the value: ``invalid <kind> `<raw>`: <reason>``,
/// so a bad `{{placeholder}}` or field id in YAML points at the offending text.
pub fn parse_via_string<'de, D, T, E, F>(deserializer: D, kind: &str, parser: F) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    E: Display,
    F: FnOnce(&str) -> Result<T, E>,
{
    let raw = String::deserialize(deserializer)?;
    parser(&raw).map_err(|err| D::Error::custom(format!("invalid {kind} `{raw}`: {err}")))
}
