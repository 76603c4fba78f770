pub mod cascade;
pub mod diagnostics;
pub mod fields;
pub mod options;
pub mod session;
pub mod state;
pub mod steps;

pub use cascade::{
    apply_update, initial_state, restore_state, CascadeEffect, CascadeOutcome, CascadeReport, ConfigError,
    InitialState, StateOverrides, UpdateIntent,
};
pub use diagnostics::{Diagnostics, Level};
pub use fields::{active_fields, is_field_active};
pub use options::options_for;
pub use session::ConnectSession;
pub use state::StateModel;
pub use steps::{resolved_steps, ContextVars, ResolvedFile, ResolvedStep, StepRenderError};
