use crate::consts::{CLOSE_BRACKET, OPEN_BRACKET, VALUE_SEPARATOR};
use crate::schema::{ConnectiveSpec, FieldSpec, OperatorSpec, OptionItem, ValueType};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Field,
    Operator,
    Value,
    Connective,
    Bracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bracket {
    Open,
    Close,
}

impl Bracket {
    pub fn as_char(self) -> char {
        match self {
            Bracket::Open => OPEN_BRACKET,
            Bracket::Close => CLOSE_BRACKET,
        }
    }

    /// Effect on bracket depth when a token of this shape is appended.
    pub fn depth_delta(self) -> isize {
        match self {
            Bracket::Open => 1,
            Bracket::Close => -1,
        }
    }
}

/// One atomic unit of the accumulated predicate.
///
/// `raw` feeds serialization and `display` feeds rendering. Tokens are never
/// edited once pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Field {
        raw: String,
        display: String,
        value_type: ValueType,
    },
    Operator {
        raw: String,
        display: String,
    },
    Value {
        raw: String,
        display: String,
        value_type: ValueType,
    },
    Connective {
        raw: String,
        display: String,
    },
    Bracket(Bracket),
}

impl Token {
    pub fn field(spec: &FieldSpec) -> Self {
        Token::Field {
            raw: spec.name.clone(),
            display: spec.label.clone(),
            value_type: spec.value_type,
        }
    }

    pub fn operator(spec: &OperatorSpec) -> Self {
        Token::Operator {
            raw: spec.symbol.clone(),
            display: spec.label.clone(),
        }
    }

    /// Comma placed between confirmed multi-select values.
    pub fn separator() -> Self {
        Token::Operator {
            raw: VALUE_SEPARATOR.to_string(),
            display: VALUE_SEPARATOR.to_string(),
        }
    }

    pub fn value(item: &OptionItem, value_type: ValueType) -> Self {
        Token::Value {
            raw: item.value.clone(),
            display: item.label.clone(),
            value_type,
        }
    }

    pub fn connective(spec: &ConnectiveSpec) -> Self {
        Token::Connective {
            raw: spec.value.clone(),
            display: spec.label.clone(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Field { .. } => TokenKind::Field,
            Token::Operator { .. } => TokenKind::Operator,
            Token::Value { .. } => TokenKind::Value,
            Token::Connective { .. } => TokenKind::Connective,
            Token::Bracket(_) => TokenKind::Bracket,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Token::Field { raw, .. }
            | Token::Operator { raw, .. }
            | Token::Value { raw, .. }
            | Token::Connective { raw, .. } => raw,
            Token::Bracket(Bracket::Open) => "(",
            Token::Bracket(Bracket::Close) => ")",
        }
    }

    pub fn display(&self) -> &str {
        match self {
            Token::Field { display, .. }
            | Token::Operator { display, .. }
            | Token::Value { display, .. }
            | Token::Connective { display, .. } => display,
            Token::Bracket(_) => self.raw(),
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Token::Field { value_type, .. } | Token::Value { value_type, .. } => Some(*value_type),
            _ => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Operator { raw, .. } if raw == VALUE_SEPARATOR)
    }

    pub fn is_operator_symbol(&self, symbol: &str) -> bool {
        matches!(self, Token::Operator { raw, .. } if raw == symbol)
    }

    pub fn is_close_bracket(&self) -> bool {
        matches!(self, Token::Bracket(Bracket::Close))
    }

    /// A value or a closing bracket completes a clause.
    pub fn ends_clause(&self) -> bool {
        matches!(self, Token::Value { .. } | Token::Bracket(Bracket::Close))
    }
}
