//! Suggestion engine: `(parse state, fragment) -> suggestions`.
//!
//! Pure apart from the option source it may hand back for async lookup.
use crate::options::{self, Lookup, OptionLoader};
use crate::schema::{FilterSchema, OptionItem};
use crate::state::{ParseState, Phase};

use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Field,
    Operator,
    Value,
    Connective,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub value: String,
    pub label: String,
    /// Multi-select only: the pair is currently in the pending set.
    pub selected: bool,
}

impl Suggestion {
    fn new(kind: SuggestionKind, value: &str, label: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            label: label.to_string(),
            selected: false,
        }
    }

    pub fn item(&self) -> OptionItem {
        OptionItem::new(self.value.clone(), self.label.clone())
    }
}

pub enum Suggestions {
    Ready(Vec<Suggestion>),
    /// Values have to come from an async loader first.
    Lookup(Arc<dyn OptionLoader>),
}

#[cfg(test)]
impl Suggestions {
    fn ready(self) -> Option<Vec<Suggestion>> {
        match self {
            Suggestions::Ready(list) => Some(list),
            Suggestions::Lookup(_) => None,
        }
    }
}

/// Ranks `label` against `fragment`: `0` for a prefix match, `1` for an
/// inner match, `None` when the fragment does not occur. Case-insensitive.
pub(crate) fn match_rank(label: &str, fragment: &str) -> Option<u8> {
    if fragment.is_empty() {
        return Some(0);
    }
    let label = label.to_lowercase();
    let fragment = fragment.to_lowercase();
    match label.find(&fragment)? {
        0 => Some(0),
        _ => Some(1),
    }
}

fn ranked<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    fragment: &str,
    label: impl Fn(&T) -> &str,
) -> Vec<&'a T> {
    let mut matched: Vec<(u8, &T)> = items
        .into_iter()
        .filter_map(|item| match_rank(label(item), fragment).map(|rank| (rank, item)))
        .collect();
    matched.sort_by_key(|(rank, _)| *rank);
    matched.into_iter().map(|(_, item)| item).collect()
}

pub fn suggest(schema: &FilterSchema, state: &ParseState, fragment: &str) -> Suggestions {
    match state.phase {
        Phase::Start => Suggestions::Ready(field_suggestions(schema, fragment)),
        Phase::AfterValue => {
            let mut list = field_suggestions(schema, fragment);
            list.extend(
                ranked(&schema.connectives, fragment, |c| c.label.as_str())
                    .into_iter()
                    .map(|c| Suggestion::new(SuggestionKind::Connective, &c.value, &c.label)),
            );
            Suggestions::Ready(list)
        }
        Phase::FieldChosen => {
            let Some(field) = &state.current_field else {
                return Suggestions::Ready(Vec::new());
            };
            let applicable: Vec<_> = schema.operators_for(field.value_type).collect();
            Suggestions::Ready(
                ranked(applicable, fragment, |op| op.label.as_str())
                    .into_iter()
                    .map(|op| Suggestion::new(SuggestionKind::Operator, &op.symbol, &op.label))
                    .collect(),
            )
        }
        Phase::OperatorChosen | Phase::MultiSelect => {
            let Some(field) = &state.current_field else {
                return Suggestions::Ready(Vec::new());
            };
            let enumerated = field.value_type.is_enumerated() || field.source().is_some();
            if !enumerated {
                return Suggestions::Ready(echo(fragment, state));
            }
            match options::lookup(field, fragment) {
                Lookup::Ready(items) => Suggestions::Ready(value_suggestions(&items, state)),
                Lookup::Deferred(loader) => Suggestions::Lookup(loader),
            }
        }
    }
}

/// Tags option pairs as value suggestions, marking pending multi-select picks.
pub fn value_suggestions(items: &[OptionItem], state: &ParseState) -> Vec<Suggestion> {
    items
        .iter()
        .map(|item| Suggestion {
            selected: state.is_pending(item),
            ..Suggestion::new(SuggestionKind::Value, &item.value, &item.label)
        })
        .collect()
}

fn field_suggestions(schema: &FilterSchema, fragment: &str) -> Vec<Suggestion> {
    ranked(&schema.fields, fragment, |f| f.label.as_str())
        .into_iter()
        .map(|f| Suggestion::new(SuggestionKind::Field, &f.name, &f.label))
        .collect()
}

/// Free-form values: the typed fragment itself is the only suggestion.
fn echo(fragment: &str, state: &ParseState) -> Vec<Suggestion> {
    if fragment.is_empty() {
        return Vec::new();
    }
    value_suggestions(&[OptionItem::new(fragment, fragment)], state)
}
