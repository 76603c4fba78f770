pub mod builtin;
pub mod condition;
pub mod error;
pub mod graph;
pub mod load;
pub mod options;
pub mod template;
pub mod value;

pub use condition::Condition;
pub use error::SchemaError;
pub use graph::DependencyIndex;
pub use options::{ConditionalOption, FieldOption, OptionSet};
pub use template::{Template, TemplateError};
pub use value::{FieldValue, FieldValues};

use crate::shared::{FieldId, ModeId, StepId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDef {
    pub id: ModeId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKindTag {
    Select,
    Boolean,
    Text,
}

impl FieldKindTag {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKindTag::Select => "select",
            FieldKindTag::Boolean => "boolean",
            FieldKindTag::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Select(OptionSet),
    Boolean,
    Text,
}

impl FieldKind {
    pub fn tag(&self) -> FieldKindTag {
        match self {
            FieldKind::Select(_) => FieldKindTag::Select,
            FieldKind::Boolean => FieldKindTag::Boolean,
            FieldKind::Text => FieldKindTag::Text,
        }
    }

    /// Whether `value` has the shape this kind stores. Option membership for
    /// `select` is checked separately against the resolved options.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            FieldKind::Select(_) | FieldKind::Text => matches!(value, FieldValue::Text(_)),
            FieldKind::Boolean => matches!(value, FieldValue::Bool(_)),
        }
    }

    pub fn options(&self) -> Option<&OptionSet> {
        match self {
            FieldKind::Select(options) => Some(options),
            FieldKind::Boolean | FieldKind::Text => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldDocument", into = "FieldDocument")]
pub struct FieldDef {
    pub id: FieldId,
    pub label: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    /// Modes the field is declared for; empty means every mode.
    pub modes: Vec<ModeId>,
    pub depends_on: Vec<FieldId>,
    pub default: Option<FieldValue>,
    pub visible_when: Option<Condition>,
}

impl FieldDef {
    pub fn is_declared_for(&self, mode: &ModeId) -> bool {
        self.modes.is_empty() || self.modes.contains(mode)
    }

    /// Explicit `depends_on` plus every field read by `visible_when` or by the
    /// option set.
    pub fn dependencies(&self) -> Vec<&FieldId> {
        let mut out: Vec<&FieldId> = Vec::new();
        let implicit = self
            .visible_when
            .iter()
            .flat_map(Condition::referenced_fields)
            .chain(
                self.kind
                    .options()
                    .into_iter()
                    .flat_map(OptionSet::referenced_fields),
            );
        for field in self.depends_on.iter().chain(implicit) {
            if !out.contains(&field) {
                out.push(field);
            }
        }
        out
    }

    fn conditions(&self) -> Vec<&Condition> {
        let mut out: Vec<&Condition> = self.visible_when.iter().collect();
        if let Some(options) = self.kind.options() {
            out.extend(options.conditions());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDocument {
    id: FieldId,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    kind: FieldKindTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<OptionSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    modes: Vec<ModeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visible_when: Option<Condition>,
}

impl TryFrom<FieldDocument> for FieldDef {
    type Error = String;

    fn try_from(value: FieldDocument) -> Result<Self, Self::Error> {
        let kind = match (value.kind, value.options) {
            (FieldKindTag::Select, Some(options)) => FieldKind::Select(options),
            (FieldKindTag::Select, None) => {
                return Err(format!("select field `{}` requires `options`", value.id));
            }
            (FieldKindTag::Boolean, None) => FieldKind::Boolean,
            (FieldKindTag::Text, None) => FieldKind::Text,
            (tag, Some(_)) => {
                return Err(format!(
                    "{} field `{}` must not declare `options`",
                    tag.as_str(),
                    value.id
                ));
            }
        };
        Ok(Self {
            id: value.id,
            label: value.label,
            description: value.description,
            kind,
            modes: value.modes,
            depends_on: value.depends_on,
            default: value.default,
            visible_when: value.visible_when,
        })
    }
}

impl From<FieldDef> for FieldDocument {
    fn from(value: FieldDef) -> Self {
        let kind = value.kind.tag();
        let options = match value.kind {
            FieldKind::Select(options) => Some(options),
            FieldKind::Boolean | FieldKind::Text => None,
        };
        Self {
            id: value.id,
            label: value.label,
            description: value.description,
            kind,
            options,
            modes: value.modes,
            depends_on: value.depends_on,
            default: value.default,
            visible_when: value.visible_when,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandTemplate {
    pub run: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTemplate {
    pub path: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub content: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDef {
    pub id: StepId,
    pub title: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Template>,
    /// Modes the step renders in; empty means every mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<ModeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_when: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileTemplate>,
}

impl StepDef {
    pub fn is_declared_for(&self, mode: &ModeId) -> bool {
        self.modes.is_empty() || self.modes.contains(mode)
    }

    fn conditions(&self) -> Vec<&Condition> {
        self.include_when
            .iter()
            .chain(self.commands.iter().filter_map(|command| command.when.as_ref()))
            .chain(self.files.iter().filter_map(|file| file.when.as_ref()))
            .collect()
    }
}

/// Serialized form of a schema, as read from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<ModeId>,
    pub modes: Vec<ModeDef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// Validated, immutable description of modes, fields and steps.
///
/// Construction fails fast on any structural problem, so every `Schema` in
/// hand has unique ids, resolvable references and an acyclic field graph.
#[derive(Debug, Clone)]
pub struct Schema {
    modes: Vec<ModeDef>,
    fields: Vec<FieldDef>,
    steps: Vec<StepDef>,
    default_mode: ModeId,
    field_positions: HashMap<FieldId, usize>,
    dependencies: DependencyIndex,
}

impl Schema {
    pub fn new(document: SchemaDocument) -> Result<Self, SchemaError> {
        let SchemaDocument {
            default_mode,
            modes,
            fields,
            steps,
        } = document;

        let Some(first_mode) = modes.first() else {
            return Err(SchemaError::NoModes);
        };
        let default_mode = default_mode.unwrap_or_else(|| first_mode.id.clone());

        ensure_unique("mode id", modes.iter().map(|mode| mode.id.as_str()))?;
        ensure_unique("field id", fields.iter().map(|field| field.id.as_str()))?;
        ensure_unique("step id", steps.iter().map(|step| step.id.as_str()))?;

        let mode_ids: HashSet<&ModeId> = modes.iter().map(|mode| &mode.id).collect();
        if !mode_ids.contains(&default_mode) {
            return Err(SchemaError::UnknownDefaultMode {
                mode: default_mode.to_string(),
            });
        }

        for field in &fields {
            let owner = format!("field `{}`", field.id);
            let condition_modes = field
                .conditions()
                .into_iter()
                .flat_map(Condition::referenced_modes);
            ensure_known_modes(&mode_ids, &owner, field.modes.iter().chain(condition_modes))?;
            validate_default(field)?;
        }

        let dependencies = DependencyIndex::build(&fields)?;
        let field_positions: HashMap<FieldId, usize> = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.id.clone(), idx))
            .collect();

        for step in &steps {
            let owner = format!("step `{}`", step.id);
            let conditions = step.conditions();
            let condition_modes = conditions
                .iter()
                .flat_map(|condition| condition.referenced_modes());
            ensure_known_modes(&mode_ids, &owner, step.modes.iter().chain(condition_modes))?;
            for condition in &conditions {
                for field in condition.referenced_fields() {
                    if !field_positions.contains_key(field) {
                        return Err(SchemaError::UnknownStepField {
                            step: step.id.to_string(),
                            field: field.to_string(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            modes,
            fields,
            steps,
            default_mode,
            field_positions,
            dependencies,
        })
    }

    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument {
            default_mode: Some(self.default_mode.clone()),
            modes: self.modes.clone(),
            fields: self.fields.clone(),
            steps: self.steps.clone(),
        }
    }

    pub fn modes(&self) -> &[ModeDef] {
        &self.modes
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn steps(&self) -> &[StepDef] {
        &self.steps
    }

    pub fn default_mode(&self) -> &ModeId {
        &self.default_mode
    }

    pub fn mode(&self, id: &str) -> Option<&ModeDef> {
        self.modes.iter().find(|mode| mode.id.as_str() == id)
    }

    pub fn field(&self, id: &str) -> Option<&FieldDef> {
        self.field_position(id).map(|idx| &self.fields[idx])
    }

    pub fn field_position(&self, id: &str) -> Option<usize> {
        self.field_positions.get(id).copied()
    }

    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|step| step.id.as_str() == id)
    }

    pub fn dependencies(&self) -> &DependencyIndex {
        &self.dependencies
    }

    /// Fields in dependency order: every field comes after the fields it reads.
    pub fn fields_in_dependency_order(&self) -> impl Iterator<Item = &FieldDef> {
        self.dependencies
            .order()
            .iter()
            .map(move |&idx| &self.fields[idx])
    }
}

fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SchemaError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn ensure_known_modes<'a>(
    known: &HashSet<&ModeId>,
    owner: &str,
    referenced: impl IntoIterator<Item = &'a ModeId>,
) -> Result<(), SchemaError> {
    for mode in referenced {
        if !known.contains(mode) {
            return Err(SchemaError::UnknownMode {
                owner: owner.to_string(),
                mode: mode.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_default(field: &FieldDef) -> Result<(), SchemaError> {
    let Some(default) = &field.default else {
        return Ok(());
    };
    if !field.kind.accepts(default) {
        return Err(SchemaError::InvalidDefault {
            field: field.id.to_string(),
            reason: format!(
                "{} field cannot default to {} value `{default}`",
                field.kind.tag().as_str(),
                default.kind_name()
            ),
        });
    }
    if let Some(options) = field.kind.options() {
        if !options
            .all_options()
            .iter()
            .any(|option| option.matches(default))
        {
            return Err(SchemaError::InvalidDefault {
                field: field.id.to_string(),
                reason: format!("`{default}` is not offered by any option"),
            });
        }
    }
    Ok(())
}
