#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid schema yaml: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to encode schema yaml: {source}")]
    Encode {
        #[source]
        source: serde_yaml::Error,
    },
    #[error("schema must declare at least one mode")]
    NoModes,
    #[error("duplicate {kind} `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("`default_mode` `{mode}` is not declared in `modes`")]
    UnknownDefaultMode { mode: String },
    #[error("{owner} references unknown mode `{mode}`")]
    UnknownMode { owner: String, mode: String },
    #[error("field `{field}` depends on unknown field `{dependency}`")]
    UnknownDependency { field: String, dependency: String },
    #[error("step `{step}` condition references unknown field `{field}`")]
    UnknownStepField { step: String, field: String },
    #[error("field dependency cycle: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },
    #[error("field `{field}` has invalid default: {reason}")]
    InvalidDefault { field: String, reason: String },
}
