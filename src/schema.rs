//! Declarative description of what a predicate may be built from.
//!
//! A [`FilterSchema`] is supplied once per builder and never mutated by the
//! state machine. Static option lists round-trip through serde so schemas can
//! live in config files; async loaders are attached in code.
use crate::options::OptionLoader;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, sync::Arc};

static DEFAULT_CONNECTIVES: Lazy<Vec<ConnectiveSpec>> = Lazy::new(|| {
    vec![
        ConnectiveSpec::new("AND", "AND"),
        ConnectiveSpec::new("OR", "OR"),
    ]
});

fn default_connectives() -> Vec<ConnectiveSpec> {
    DEFAULT_CONNECTIVES.clone()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Number,
    Date,
    Select,
    Multiselect,
    Autocomplete,
}

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::Text,
        ValueType::Number,
        ValueType::Date,
        ValueType::Select,
        ValueType::Multiselect,
        ValueType::Autocomplete,
    ];

    /// Values come from an option source rather than free typing.
    pub fn is_enumerated(self) -> bool {
        matches!(
            self,
            ValueType::Select | ValueType::Multiselect | ValueType::Autocomplete
        )
    }
}

/// One selectable `(value, label)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

impl OptionItem {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionItem>>,
    #[serde(skip)]
    pub loader: Option<Arc<dyn OptionLoader>>,
}

/// Where the values of an enumerated field come from.
pub enum OptionSource<'a> {
    Static(&'a [OptionItem]),
    Loader(&'a Arc<dyn OptionLoader>),
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            value_type,
            options: None,
            loader: None,
        }
    }

    pub fn with_options(mut self, options: Vec<OptionItem>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn OptionLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// A loader wins over a static list when both are present on an
    /// unvalidated schema.
    pub fn source(&self) -> Option<OptionSource<'_>> {
        if let Some(loader) = &self.loader {
            return Some(OptionSource::Loader(loader));
        }
        self.options.as_deref().map(OptionSource::Static)
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("value_type", &self.value_type)
            .field("options", &self.options)
            .field("loader", &self.loader.as_ref().map(|_| "<loader>"))
            .finish()
    }
}

impl PartialEq for FieldSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.label == other.label
            && self.value_type == other.value_type
            && self.options == other.options
            && match (&self.loader, &other.loader) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSpec {
    pub symbol: String,
    pub label: String,
    #[serde(rename = "applicableValueTypes")]
    pub applies_to: Vec<ValueType>,
    /// Informational: the host may treat the value as a contains-style pattern.
    #[serde(default)]
    pub supports_wildcard: bool,
}

impl OperatorSpec {
    pub fn new(symbol: impl Into<String>, label: impl Into<String>, applies_to: &[ValueType]) -> Self {
        Self {
            symbol: symbol.into(),
            label: label.into(),
            applies_to: applies_to.to_vec(),
            supports_wildcard: false,
        }
    }

    pub fn with_wildcard(mut self) -> Self {
        self.supports_wildcard = true;
        self
    }

    pub fn applies_to(&self, value_type: ValueType) -> bool {
        self.applies_to.contains(&value_type)
    }

    /// Exact, case-insensitive match against the symbol or the label.
    pub fn matches_typed(&self, typed: &str) -> bool {
        !typed.is_empty()
            && (self.symbol.eq_ignore_ascii_case(typed) || self.label.eq_ignore_ascii_case(typed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectiveSpec {
    pub value: String,
    pub label: String,
}

impl ConnectiveSpec {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSchema {
    pub fields: Vec<FieldSpec>,
    pub operators: Vec<OperatorSpec>,
    #[serde(default = "default_connectives")]
    pub connectives: Vec<ConnectiveSpec>,
}

impl FilterSchema {
    pub fn new(fields: Vec<FieldSpec>, operators: Vec<OperatorSpec>) -> Self {
        Self {
            fields,
            operators,
            connectives: default_connectives(),
        }
    }

    pub fn with_connectives(mut self, connectives: Vec<ConnectiveSpec>) -> Self {
        self.connectives = connectives;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn operator(&self, symbol: &str) -> Option<&OperatorSpec> {
        self.operators.iter().find(|op| op.symbol == symbol)
    }

    pub fn operators_for(&self, value_type: ValueType) -> impl Iterator<Item = &OperatorSpec> {
        self.operators
            .iter()
            .filter(move |op| op.applies_to(value_type))
    }

    pub fn connective(&self, value: &str) -> Option<&ConnectiveSpec> {
        self.connectives.iter().find(|c| c.value == value)
    }

    /// Replaces the option source of `field` with an async loader.
    pub fn attach_loader(
        &mut self,
        field: &str,
        loader: Arc<dyn OptionLoader>,
    ) -> Result<(), SchemaError> {
        let spec = self
            .fields
            .iter_mut()
            .find(|spec| spec.name == field)
            .ok_or_else(|| SchemaError::field(field, "unknown field"))?;
        spec.options = None;
        spec.loader = Some(loader);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::new("field with empty name"));
            }
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::field(&field.name, "duplicate field name"));
            }
            let sources = usize::from(field.options.is_some()) + usize::from(field.loader.is_some());
            if field.value_type.is_enumerated() && sources != 1 {
                return Err(SchemaError::field(
                    &field.name,
                    "enumerated field needs exactly one of `options` or a loader",
                ));
            }
            if !field.value_type.is_enumerated() && sources != 0 {
                return Err(SchemaError::field(
                    &field.name,
                    "free-form field cannot declare an option source",
                ));
            }
        }
        for op in &self.operators {
            if op.symbol.is_empty() {
                return Err(SchemaError::new("operator with empty symbol"));
            }
            if op.applies_to.is_empty() {
                return Err(SchemaError::new(format!(
                    "operator `{}` applies to no value type",
                    op.symbol
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub message: String,
    pub field: Option<String>,
}

impl SchemaError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} (field `{field}`)", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SchemaError {}
