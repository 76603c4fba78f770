use super::cascade::{
    apply_update, initial_state, restore_state, CascadeReport, ConfigError, InitialState,
    StateOverrides, UpdateIntent,
};
use super::diagnostics::{Diagnostics, Level};
use super::fields::active_fields;
use super::options::options_for;
use super::state::{FieldValue, StateModel};
use super::steps::{resolved_steps, ContextVars, ResolvedStep, StepRenderError};
use crate::schema::builtin::connect_schema;
use crate::schema::{FieldDef, FieldOption, Schema};
use crate::shared::ModeId;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One wizard session: a shared schema plus the state this session owns.
///
/// Mutations go through [`ConnectSession::set_mode`] and
/// [`ConnectSession::update_field`]; everything else is derived from the
/// current state on demand.
#[derive(Debug)]
pub struct ConnectSession {
    schema: Arc<Schema>,
    state: StateModel,
    context: ContextVars,
    diagnostics: Diagnostics,
}

impl ConnectSession {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::open(schema, &StateOverrides::default(), Diagnostics::default())
    }

    /// Session over the built-in Connect schema.
    pub fn connect() -> Self {
        Self::new(connect_schema())
    }

    pub fn with_overrides(schema: Arc<Schema>, overrides: &StateOverrides) -> Self {
        Self::open(schema, overrides, Diagnostics::default())
    }

    /// Overrides that cannot be honored are reported to `diagnostics` and
    /// replaced by schema defaults.
    pub fn open(schema: Arc<Schema>, overrides: &StateOverrides, diagnostics: Diagnostics) -> Self {
        let initial = initial_state(&schema, overrides);
        Self::start(schema, initial, diagnostics)
    }

    /// Rebuilds a session from a snapshot. The snapshot is re-reconciled
    /// against `schema`, so stale or foreign values never survive, while
    /// values remembered across mode switches are kept.
    pub fn restore(schema: Arc<Schema>, snapshot: StateModel, diagnostics: Diagnostics) -> Self {
        let initial = restore_state(&schema, snapshot);
        Self::start(schema, initial, diagnostics)
    }

    fn start(schema: Arc<Schema>, initial: InitialState, diagnostics: Diagnostics) -> Self {
        for error in &initial.rejected {
            diagnostics.rejected("init", error);
        }
        diagnostics.cascade("init", &initial.report);
        Self {
            schema,
            state: initial.state,
            context: ContextVars::new(),
            diagnostics,
        }
    }

    pub fn from_snapshot_json(schema: Arc<Schema>, raw: &str) -> Result<Self, serde_json::Error> {
        let snapshot: StateModel = serde_json::from_str(raw)?;
        Ok(Self::restore(schema, snapshot, Diagnostics::default()))
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.state)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn state(&self) -> &StateModel {
        &self.state
    }

    pub fn mode(&self) -> &ModeId {
        self.state.mode()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn context(&self) -> &ContextVars {
        &self.context
    }

    pub fn set_context_var(&mut self, name: &str, value: impl Into<String>) {
        self.context.insert(name.to_string(), value.into());
    }

    pub fn set_mode(&mut self, mode: &str) -> Result<CascadeReport, ConfigError> {
        self.apply(&UpdateIntent::set_mode(mode))
    }

    pub fn update_field(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<CascadeReport, ConfigError> {
        self.apply(&UpdateIntent::set_field(field, value))
    }

    /// Applies `intent` atomically: on error the state is untouched.
    pub fn apply(&mut self, intent: &UpdateIntent) -> Result<CascadeReport, ConfigError> {
        match apply_update(&self.schema, &self.state, intent) {
            Ok(outcome) => {
                self.diagnostics.cascade(intent.as_str(), &outcome.report);
                self.state = outcome.state;
                Ok(outcome.report)
            }
            Err(err) => {
                self.diagnostics.rejected(intent.as_str(), &err);
                Err(err)
            }
        }
    }

    pub fn active_fields(&self) -> Vec<&FieldDef> {
        active_fields(&self.schema, &self.state.mode, &self.state.values)
    }

    pub fn get_field_options(&self, field: &str) -> Vec<FieldOption> {
        if self.schema.field(field).is_none() {
            let mut fields = Map::new();
            fields.insert("field".to_string(), Value::from(field));
            self.diagnostics.record(
                Level::Debug,
                "options.unknown_field",
                &format!("no options for unknown field `{field}`"),
                fields,
            );
        }
        options_for(&self.schema, field, &self.state.mode, &self.state.values)
    }

    pub fn resolved_steps(&self) -> Vec<Result<ResolvedStep, StepRenderError>> {
        let steps = resolved_steps(&self.schema, &self.state, &self.context);
        for err in steps.iter().filter_map(|step| step.as_ref().err()) {
            self.diagnostics.render_failed(err);
        }
        steps
    }

    /// Successfully rendered steps only; failures go to diagnostics.
    pub fn rendered_steps(&self) -> Vec<ResolvedStep> {
        self.resolved_steps()
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }
}
