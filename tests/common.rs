#![allow(dead_code)]
//! Shared fixtures for `query-composer` integration tests.

use query_composer::*;
use std::sync::{Arc, Once};

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn statuses() -> Vec<OptionItem> {
    vec![
        OptionItem::new("active", "Active"),
        OptionItem::new("inactive", "Inactive"),
        OptionItem::new("banned", "Banned"),
    ]
}

pub fn schema() -> FilterSchema {
    FilterSchema::new(
        vec![
            FieldSpec::new("first_name", "First name", ValueType::Text),
            FieldSpec::new("age", "Age", ValueType::Number),
            FieldSpec::new("created", "Created", ValueType::Date),
            FieldSpec::new("status", "Status", ValueType::Select).with_options(statuses()),
        ],
        vec![
            OperatorSpec::new("=", "equals", &ValueType::ALL),
            OperatorSpec::new(">", "greater than", &[ValueType::Number, ValueType::Date]),
            OperatorSpec::new("LIKE", "like", &[ValueType::Text]).with_wildcard(),
            OperatorSpec::new("IN", "in", &ValueType::ALL),
        ],
    )
}

pub fn schema_with_loader(loader: Arc<dyn OptionLoader>) -> FilterSchema {
    let mut schema = schema();
    schema.fields.push(FieldSpec::new("city", "City", ValueType::Autocomplete));
    schema.attach_loader("city", loader).unwrap();
    schema.validate().unwrap();
    schema
}

pub fn builder() -> InputController {
    init_tracing();
    InputController::new(schema(), ComposerConfig::default())
}

/// Selects the suggestion whose value is `value`.
pub fn pick(builder: &mut InputController, value: &str) -> Reaction {
    let index = builder
        .suggestions()
        .iter()
        .position(|s| s.value == value)
        .unwrap_or_else(|| panic!("no suggestion `{value}` in {:?}", builder.suggestions()));
    builder.select(index)
}

/// Types `text` and commits it as a free-form value.
pub fn enter(builder: &mut InputController, text: &str) -> Reaction {
    for ch in text.chars() {
        let _ = builder.push_char(ch);
    }
    builder.commit()
}

pub fn type_text(builder: &mut InputController, text: &str) {
    for ch in text.chars() {
        let _ = builder.push_char(ch);
    }
}

pub fn applied(reaction: Reaction) {
    match reaction {
        Reaction::Applied => {}
        other => panic!("expected Applied, got: {other:?}"),
    }
}

pub fn raws(builder: &InputController) -> Vec<String> {
    builder.tokens().iter().map(|t| t.raw().to_string()).collect()
}

pub fn kinds(builder: &InputController) -> Vec<TokenKind> {
    builder.tokens().iter().map(Token::kind).collect()
}

pub fn current_field(builder: &InputController) -> Option<String> {
    builder.state().current_field.as_ref().map(|f| f.name.clone())
}

pub fn current_operator(builder: &InputController) -> Option<String> {
    builder
        .state()
        .current_operator
        .as_ref()
        .map(|op| op.symbol.clone())
}
