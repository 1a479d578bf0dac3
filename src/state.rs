//! Parse state is never stored on its own: it is re-derived from the token
//! list by a backward scan after every mutation, so it cannot drift from the
//! tokens it describes.
use crate::schema::{FieldSpec, FilterSchema, OperatorSpec, OptionItem};
use crate::token::{Bracket, Token};

use serde::Serialize;

/// Where the user is inside the clause being built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Nothing typed yet, or right after a connective or an opening bracket.
    #[default]
    Start,
    FieldChosen,
    OperatorChosen,
    /// Accumulating values for the set-membership operator.
    MultiSelect,
    /// Right after a value or a closing bracket.
    AfterValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseState {
    pub phase: Phase,
    pub current_field: Option<FieldSpec>,
    pub current_operator: Option<OperatorSpec>,
    pub multi_select_active: bool,
    pub async_search_active: bool,
    /// Unconfirmed multi-select picks. Tokens never reflect these; only the
    /// controller fills them in.
    pub pending_values: Vec<OptionItem>,
}

impl ParseState {
    fn after_value() -> Self {
        Self {
            phase: Phase::AfterValue,
            ..Self::default()
        }
    }

    pub fn is_pending(&self, item: &OptionItem) -> bool {
        self.pending_values.contains(item)
    }
}

/// Recomputes the parse state from `tokens`.
///
/// `membership` is the symbol of the set-membership operator.
pub fn derive_state(tokens: &[Token], schema: &FilterSchema, membership: &str) -> ParseState {
    let Some(tail) = tokens.last() else {
        return ParseState::default();
    };

    match tail {
        Token::Connective { .. } | Token::Bracket(Bracket::Open) => return ParseState::default(),
        Token::Value { .. } | Token::Bracket(Bracket::Close) => return ParseState::after_value(),
        Token::Field { .. } | Token::Operator { .. } => {}
    }

    let mut operator = None;
    let mut field = None;
    for token in tokens.iter().rev() {
        match token {
            Token::Operator { .. } if token.is_separator() => {}
            Token::Operator { raw, display } => {
                if operator.is_none() {
                    operator = Some((raw, display));
                }
            }
            Token::Field {
                raw,
                display,
                value_type,
            } => {
                field = Some(
                    schema
                        .field(raw)
                        .cloned()
                        .unwrap_or_else(|| FieldSpec::new(raw.clone(), display.clone(), *value_type)),
                );
                break;
            }
            Token::Value { .. } | Token::Connective { .. } | Token::Bracket(_) => break,
        }
    }

    let Some(field) = field else {
        return ParseState::default();
    };

    let Some((symbol, label)) = operator else {
        return ParseState {
            phase: Phase::FieldChosen,
            current_field: Some(field),
            ..ParseState::default()
        };
    };

    let operator = schema
        .operator(symbol)
        .cloned()
        .unwrap_or_else(|| OperatorSpec::new(symbol.clone(), label.clone(), &[field.value_type]));
    let multi_select_active = operator.symbol == membership;
    ParseState {
        phase: if multi_select_active {
            Phase::MultiSelect
        } else {
            Phase::OperatorChosen
        },
        async_search_active: field.has_loader(),
        multi_select_active,
        current_operator: Some(operator),
        current_field: Some(field),
        pending_values: Vec::new(),
    }
}
