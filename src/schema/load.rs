use super::{Schema, SchemaDocument, SchemaError};
use std::fs;
use std::path::Path;

impl Schema {
    pub fn from_yaml_str(raw: &str) -> Result<Self, SchemaError> {
        let document = serde_yaml::from_str::<SchemaDocument>(raw)
            .map_err(|source| SchemaError::Parse { source })?;
        Self::new(document)
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let raw = fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn to_yaml_string(&self) -> Result<String, SchemaError> {
        serde_yaml::to_string(&self.to_document()).map_err(|source| SchemaError::Encode { source })
    }
}
