use connectwiz::engine::{
    active_fields, apply_update, initial_state, options_for, CascadeEffect, ConfigError,
    StateModel, StateOverrides, UpdateIntent,
};
use connectwiz::schema::builtin::connect_schema;
use connectwiz::schema::{FieldValue, Schema};

fn defaults(schema: &Schema) -> StateModel {
    initial_state(schema, &StateOverrides::default()).state
}

fn apply(schema: &Schema, state: &StateModel, intent: UpdateIntent) -> StateModel {
    apply_update(schema, state, &intent)
        .expect("update should apply")
        .state
}

fn assert_consistent(schema: &Schema, state: &StateModel) {
    let active: Vec<&str> = active_fields(schema, state.mode(), state.values())
        .into_iter()
        .map(|field| field.id.as_str())
        .collect();
    for (field, value) in state.values() {
        assert!(
            active.contains(&field.as_str()),
            "`{field}` has a value but is not active"
        );
        let def = schema.field(field.as_str()).expect("known field");
        if def.kind.options().is_some() {
            let options = options_for(schema, field.as_str(), state.mode(), state.values());
            assert!(
                options.iter().any(|option| option.matches(value)),
                "`{field}` holds `{value}` outside its options"
            );
        }
    }
}

#[test]
fn cascade_module_defaults_framework_and_variant() {
    let schema = connect_schema();
    let state = defaults(&schema);
    assert_eq!(state.mode(), "framework");
    assert_eq!(state.text("framework"), Some("nextjs"));
    assert_eq!(state.text("frameworkVariant"), Some("app"));
    assert_eq!(state.text("library"), Some("supabasejs"));
    assert_eq!(state.flag("frameworkUi"), Some(false));
    assert!(!state.contains("useIpv4"));
    assert_consistent(&schema, &state);
}

#[test]
fn cascade_module_resets_variant_when_framework_changes() {
    let schema = connect_schema();
    let state = apply(
        &schema,
        &defaults(&schema),
        UpdateIntent::set_field("framework", "react"),
    );
    assert_eq!(state.text("frameworkVariant"), Some("vite"));
    assert_consistent(&schema, &state);
}

#[test]
fn cascade_module_drops_variant_for_remix() {
    let schema = connect_schema();
    let outcome = apply_update(
        &schema,
        &defaults(&schema),
        &UpdateIntent::set_field("framework", "remix"),
    )
    .expect("remix is offered");
    assert!(!outcome.state.contains("frameworkVariant"));
    assert!(!outcome.state.contains("frameworkUi"));
    assert!(matches!(
        outcome.report.effect_for("frameworkVariant"),
        Some(CascadeEffect::Cleared { .. })
    ));
    assert!(matches!(
        outcome.report.effect_for("frameworkUi"),
        Some(CascadeEffect::Parked { .. })
    ));
    assert_consistent(&schema, &outcome.state);

    let back = apply(
        &schema,
        &outcome.state,
        UpdateIntent::set_field("framework", "nextjs"),
    );
    assert_eq!(back.text("frameworkVariant"), Some("app"));
    assert_eq!(back.flag("frameworkUi"), Some(false));
}

#[test]
fn cascade_module_leaves_unrelated_fields_alone() {
    let schema = connect_schema();
    let outcome = apply_update(
        &schema,
        &defaults(&schema),
        &UpdateIntent::set_field("frameworkVariant", "pages"),
    )
    .expect("pages is offered for nextjs");
    assert_eq!(outcome.state.text("frameworkVariant"), Some("pages"));
    assert_eq!(outcome.state.text("library"), Some("supabasejs"));
    assert_eq!(outcome.state.text("framework"), Some("nextjs"));
    assert_eq!(outcome.report.effects.len(), 1);
}

#[test]
fn cascade_module_rejects_bad_updates_without_mutation() {
    let schema = connect_schema();
    let state = defaults(&schema);
    let cases = [
        (
            UpdateIntent::set_mode("desktop"),
            ConfigError::UnknownMode {
                mode: "desktop".to_string(),
            },
        ),
        (
            UpdateIntent::set_field("doesNotExist", "x"),
            ConfigError::UnknownField {
                field: "doesNotExist".to_string(),
            },
        ),
        (
            UpdateIntent::set_field("orm", "drizzle"),
            ConfigError::InactiveField {
                field: "orm".to_string(),
                mode: "framework".to_string(),
            },
        ),
        (
            UpdateIntent::set_field("frameworkUi", "yes"),
            ConfigError::KindMismatch {
                field: "frameworkUi".to_string(),
                expected: "boolean",
                value: "yes".to_string(),
            },
        ),
        (
            UpdateIntent::set_field("frameworkVariant", "vite"),
            ConfigError::InvalidOption {
                field: "frameworkVariant".to_string(),
                value: "vite".to_string(),
            },
        ),
    ];
    for (intent, expected) in cases {
        let err = apply_update(&schema, &state, &intent).expect_err("update should fail");
        assert_eq!(err, expected);
    }
    assert_eq!(state, defaults(&schema));
}

#[test]
fn cascade_module_preserves_values_across_mode_round_trip() {
    let schema = connect_schema();
    let mut state = defaults(&schema);
    state = apply(&schema, &state, UpdateIntent::set_field("framework", "react"));
    state = apply(&schema, &state, UpdateIntent::set_field("frameworkVariant", "cra"));
    state = apply(&schema, &state, UpdateIntent::set_field("frameworkUi", true));
    let framework_values = state.values().clone();

    state = apply(&schema, &state, UpdateIntent::set_mode("direct"));
    assert_eq!(state.text("connectionMethod"), Some("direct"));
    assert!(!state.contains("framework"));
    assert_consistent(&schema, &state);

    state = apply(&schema, &state, UpdateIntent::set_field("connectionMethod", "session"));
    state = apply(&schema, &state, UpdateIntent::set_mode("orm"));
    assert_eq!(
        state.text("connectionMethod"),
        Some("direct"),
        "session pooler is not offered in orm mode"
    );

    state = apply(&schema, &state, UpdateIntent::set_mode("framework"));
    assert_eq!(state.values(), &framework_values);
    assert_consistent(&schema, &state);
}

#[test]
fn cascade_module_restores_value_reset_by_mode_switch() {
    let schema = connect_schema();
    let mut state = apply(&schema, &defaults(&schema), UpdateIntent::set_mode("direct"));
    state = apply(&schema, &state, UpdateIntent::set_field("connectionMethod", "session"));
    let direct_values = state.values().clone();

    state = apply(&schema, &state, UpdateIntent::set_mode("orm"));
    assert_eq!(state.text("connectionMethod"), Some("direct"));
    state = apply(&schema, &state, UpdateIntent::set_mode("direct"));
    assert_eq!(state.values(), &direct_values);

    state = apply(&schema, &state, UpdateIntent::set_mode("orm"));
    state = apply(
        &schema,
        &state,
        UpdateIntent::set_field("connectionMethod", "transaction"),
    );
    state = apply(&schema, &state, UpdateIntent::set_mode("direct"));
    assert_eq!(
        state.text("connectionMethod"),
        Some("transaction"),
        "an explicit edit replaces the remembered value"
    );
    assert!(state.parked().get("connectionMethod").is_none());
}

#[test]
fn cascade_module_restores_hidden_text_field() {
    let schema = connect_schema();
    let mut state = apply(&schema, &defaults(&schema), UpdateIntent::set_mode("orm"));
    assert_eq!(state.text("orm"), Some("prisma"));
    assert!(!state.contains("migrationsDir"));

    state = apply(&schema, &state, UpdateIntent::set_field("orm", "drizzle"));
    assert_eq!(state.text("migrationsDir"), Some("./drizzle"));
    state = apply(&schema, &state, UpdateIntent::set_field("migrationsDir", "./db/migrations"));
    state = apply(&schema, &state, UpdateIntent::set_field("orm", "prisma"));
    assert!(!state.contains("migrationsDir"));
    assert_eq!(
        state.parked().get("migrationsDir"),
        Some(&FieldValue::from("./db/migrations"))
    );

    state = apply(&schema, &state, UpdateIntent::set_field("orm", "drizzle"));
    assert_eq!(state.text("migrationsDir"), Some("./db/migrations"));
}

#[test]
fn cascade_module_defaults_are_idempotent() {
    let schema = connect_schema();
    let first = defaults(&schema);
    let second = defaults(&schema);
    assert_eq!(first, second);

    let mut overrides = StateOverrides::default();
    for (field, value) in first.values() {
        overrides = overrides.with_value(field.as_str(), value.clone());
    }
    let seeded = initial_state(&schema, &overrides);
    assert!(seeded.rejected.is_empty());
    assert_eq!(seeded.state, first);
}

#[test]
fn cascade_module_corrects_inconsistent_overrides() {
    let schema = connect_schema();
    let overrides = StateOverrides::default()
        .with_value("framework", "react")
        .with_value("frameworkVariant", "pages")
        .with_value("ghost", "boo")
        .with_value("useIpv4", "yes");
    let initial = initial_state(&schema, &overrides);

    assert_eq!(initial.state.text("framework"), Some("react"));
    assert_eq!(initial.state.text("frameworkVariant"), Some("vite"));
    assert_consistent(&schema, &initial.state);
    assert_eq!(
        initial.rejected,
        vec![
            ConfigError::UnknownField {
                field: "ghost".to_string(),
            },
            ConfigError::KindMismatch {
                field: "useIpv4".to_string(),
                expected: "boolean",
                value: "yes".to_string(),
            },
            ConfigError::InvalidOption {
                field: "frameworkVariant".to_string(),
                value: "pages".to_string(),
            },
        ]
    );
    assert!(initial.state.parked().is_empty());

    let overrides = StateOverrides::default()
        .with_value("framework", "remix")
        .with_value("frameworkVariant", "app");
    let initial = initial_state(&schema, &overrides);
    assert!(!initial.state.contains("frameworkVariant"));
    assert!(initial.state.parked().is_empty());
    assert_eq!(
        initial.rejected,
        vec![ConfigError::InvalidOption {
            field: "frameworkVariant".to_string(),
            value: "app".to_string(),
        }]
    );
}

#[test]
fn cascade_module_unknown_override_mode_falls_back_to_default() {
    let schema = connect_schema();
    let initial = initial_state(&schema, &StateOverrides::default().with_mode("desktop"));
    assert_eq!(initial.state.mode(), "framework");
    assert_eq!(
        initial.rejected,
        vec![ConfigError::UnknownMode {
            mode: "desktop".to_string(),
        }]
    );

    let initial = initial_state(&schema, &StateOverrides::default().with_mode("mcp"));
    assert_eq!(initial.state.text("mcpClient"), Some("cursor"));
    assert_eq!(initial.state.flag("readOnly"), Some(true));
}

fn mode_ids(schema: &Schema) -> Vec<String> {
    schema
        .modes()
        .iter()
        .map(|mode| mode.id.to_string())
        .collect()
}

fn select_choices(schema: &Schema, state: &StateModel) -> Vec<(String, String)> {
    active_fields(schema, state.mode(), state.values())
        .into_iter()
        .filter(|field| field.kind.options().is_some())
        .flat_map(|field| {
            options_for(schema, field.id.as_str(), state.mode(), state.values())
                .into_iter()
                .map(move |option| (field.id.to_string(), option.value))
        })
        .collect()
}

fn assert_round_trips(schema: &Schema, mode: &str, state: &StateModel, path: &str) {
    for other in mode_ids(schema) {
        let away = apply(schema, state, UpdateIntent::set_mode(&other));
        assert_consistent(schema, &away);
        let back = apply(schema, &away, UpdateIntent::set_mode(mode));
        assert_consistent(schema, &back);
        assert_eq!(
            back.values(),
            state.values(),
            "{mode} -> {other} -> {mode} after {path}"
        );
    }
}

#[test]
fn cascade_module_sweeps_every_select_value_and_mode_pair() {
    let schema = connect_schema();
    for mode in mode_ids(&schema) {
        let start = apply(&schema, &defaults(&schema), UpdateIntent::set_mode(&mode));
        assert_consistent(&schema, &start);
        assert_round_trips(&schema, &mode, &start, "defaults");

        for (field, value) in select_choices(&schema, &start) {
            let edited = apply(
                &schema,
                &start,
                UpdateIntent::set_field(&field, value.as_str()),
            );
            assert_consistent(&schema, &edited);
            assert_eq!(edited.text(&field), Some(value.as_str()));
            assert_round_trips(&schema, &mode, &edited, &format!("{field}={value}"));

            for (next_field, next_value) in select_choices(&schema, &edited) {
                let twice = apply(
                    &schema,
                    &edited,
                    UpdateIntent::set_field(&next_field, next_value.as_str()),
                );
                assert_consistent(&schema, &twice);
                assert_round_trips(
                    &schema,
                    &mode,
                    &twice,
                    &format!("{field}={value}, {next_field}={next_value}"),
                );
            }
        }
    }
}
