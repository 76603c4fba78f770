use crate::shared::ids::validate_identifier_value;
use crate::shared::serde_ext::parse_via_string;
use serde::ser::Serializer;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed placeholder in template")]
    Unclosed,
    #[error("empty placeholder in template")]
    EmptyPlaceholder,
    #[error("invalid placeholder `{{{{{token}}}}}`: {reason}")]
    InvalidPlaceholder { token: String, reason: String },
    #[error("missing value for placeholder `{{{{{name}}}}}`")]
    Unresolved { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder {
        name: String,
        fallback: Option<String>,
    },
}

/// Text with `{{name}}` and `{{name|fallback}}` placeholders, parsed once at
/// schema load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut cursor = raw;

        while let Some(start) = cursor.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(cursor[..start].to_string()));
            }
            let after_open = &cursor[start + 2..];
            let Some(close_offset) = after_open.find("}}") else {
                return Err(TemplateError::Unclosed);
            };
            let token = after_open[..close_offset].trim();
            if token.is_empty() {
                return Err(TemplateError::EmptyPlaceholder);
            }
            let (name, fallback) = match token.split_once('|') {
                Some((name, fallback)) => (name.trim(), Some(fallback.trim().to_string())),
                None => (token, None),
            };
            validate_identifier_value("placeholder name", name).map_err(|reason| {
                TemplateError::InvalidPlaceholder {
                    token: token.to_string(),
                    reason,
                }
            })?;
            segments.push(Segment::Placeholder {
                name: name.to_string(),
                fallback,
            });
            cursor = &after_open[close_offset + 2..];
        }

        if !cursor.is_empty() {
            segments.push(Segment::Literal(cursor.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder through `resolve`, falling back to the
    /// inline default when `resolve` yields nothing.
    pub fn render<F>(&self, mut resolve: F) -> Result<String, TemplateError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut rendered = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder { name, fallback } => {
                    match resolve(name).or_else(|| fallback.clone()) {
                        Some(value) => rendered.push_str(&value),
                        None => {
                            return Err(TemplateError::Unresolved { name: name.clone() });
                        }
                    }
                }
            }
        }
        Ok(rendered)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.raw.fmt(f)
    }
}

impl Serialize for Template {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string(deserializer, "template", Self::parse)
    }
}
