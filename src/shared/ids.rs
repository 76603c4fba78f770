//! Identifiers a schema document uses to name its modes, fields and steps.
//! Conditions, option tables and session calls refer to entries by these ids,
//! so they share one character set and are validated when a schema is read.

use super::serde_ext::parse_via_string;
use serde::{Deserialize, Deserializer, Serialize};

pub fn validate_identifier_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only ASCII letters, digits, '-' or '_'"
    ))
}

macro_rules! define_id_type {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn parse(raw: &str) -> Result<Self, String> {
                validate_identifier_value($kind, raw)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl TryFrom<&str> for $name {
            type Error = String;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                parse_via_string(deserializer, $kind, Self::parse)
            }
        }
    };
}

define_id_type!(ModeId, "mode id");
define_id_type!(FieldId, "field id");
define_id_type!(StepId, "step id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_camel_case_and_dashes() {
        assert_eq!(
            FieldId::parse("frameworkVariant").expect("field id").as_str(),
            "frameworkVariant"
        );
        assert_eq!(
            StepId::parse("install-skills").expect("step id"),
            "install-skills"
        );
    }

    #[test]
    fn deserialize_reports_kind_and_raw_value() {
        let err = serde_json::from_str::<ModeId>("\"two words\"").expect_err("invalid id");
        assert!(err.to_string().contains("invalid mode id `two words`"));
    }
}
