use super::state::StateModel;
use crate::schema::{Condition, Schema, StepDef, Template, TemplateError};
use crate::shared::StepId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Caller-supplied substitutions (project URL, keys, ...) consulted after
/// field values.
pub type ContextVars = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStep {
    pub id: StepId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub commands: Vec<String>,
    pub files: Vec<ResolvedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to render step `{step_id}`: {source}")]
pub struct StepRenderError {
    pub step_id: StepId,
    #[source]
    pub source: TemplateError,
}

/// One entry per step included for the current state, in declaration order.
/// A step whose templates cannot be rendered yields an error; the others are
/// unaffected.
pub fn resolved_steps(
    schema: &Schema,
    state: &StateModel,
    context: &ContextVars,
) -> Vec<Result<ResolvedStep, StepRenderError>> {
    schema
        .steps()
        .iter()
        .filter(|step| is_step_included(step, state))
        .map(|step| {
            resolve_step(step, state, context).map_err(|source| StepRenderError {
                step_id: step.id.clone(),
                source,
            })
        })
        .collect()
}

pub fn is_step_included(step: &StepDef, state: &StateModel) -> bool {
    step.is_declared_for(&state.mode) && holds(step.include_when.as_ref(), state)
}

fn holds(condition: Option<&Condition>, state: &StateModel) -> bool {
    condition.map_or(true, |condition| condition.evaluate(&state.mode, &state.values))
}

fn resolve_step(
    step: &StepDef,
    state: &StateModel,
    context: &ContextVars,
) -> Result<ResolvedStep, TemplateError> {
    let render = |template: &Template| {
        template.render(|name| {
            state
                .values
                .get(name)
                .map(|value| value.as_key().into_owned())
                .or_else(|| context.get(name).cloned())
        })
    };

    let title = render(&step.title)?;
    let description = step.description.as_ref().map(&render).transpose()?;

    let mut commands = Vec::new();
    for command in &step.commands {
        if holds(command.when.as_ref(), state) {
            commands.push(render(&command.run)?);
        }
    }

    let mut files = Vec::new();
    for file in &step.files {
        if !holds(file.when.as_ref(), state) {
            continue;
        }
        files.push(ResolvedFile {
            path: render(&file.path)?,
            language: file.language.clone(),
            content: render(&file.content)?,
        });
    }

    Ok(ResolvedStep {
        id: step.id.clone(),
        title,
        description,
        commands,
        files,
    })
}
