//! Token list to query string.
use crate::schema::ValueType;
use crate::token::Token;

/// Left-to-right fold over `tokens`; no re-validation happens here.
///
/// ```
/// use query_composer::{serialize, Token, ValueType};
///
/// let tokens = vec![
///     Token::Field { raw: "first_name".into(), display: "First name".into(), value_type: ValueType::Text },
///     Token::Operator { raw: "LIKE".into(), display: "like".into() },
///     Token::Value { raw: "john".into(), display: "john".into(), value_type: ValueType::Text },
/// ];
/// assert_eq!(serialize(&tokens), "first_name LIKE 'john'");
/// assert_eq!(serialize(&[]), "");
/// ```
pub fn serialize(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Connective { raw, .. } => {
                out.push(' ');
                out.push_str(raw);
                out.push(' ');
            }
            Token::Field { raw, .. } => out.push_str(raw),
            Token::Operator { raw, .. } if token.is_separator() => out.push_str(raw),
            Token::Operator { raw, .. } => {
                out.push(' ');
                out.push_str(raw);
                out.push(' ');
            }
            Token::Value { raw, .. } => {
                if owning_field_type(&tokens[..index]) == Some(ValueType::Text) {
                    out.push('\'');
                    out.push_str(raw);
                    out.push('\'');
                } else {
                    out.push_str(raw);
                }
            }
            Token::Bracket(_) => out.push_str(token.raw()),
        }
    }
    out
}

/// Serializes only up to the last finished clause, dropping a trailing
/// field, operator, connective or opening bracket that is still being
/// composed.
pub fn serialize_committed(tokens: &[Token]) -> String {
    let end = tokens
        .iter()
        .rposition(Token::ends_clause)
        .map_or(0, |index| index + 1);
    serialize(&tokens[..end])
}

/// Value type of the nearest field token before a value.
fn owning_field_type(preceding: &[Token]) -> Option<ValueType> {
    preceding.iter().rev().find_map(|token| match token {
        Token::Field { value_type, .. } => Some(*value_type),
        _ => None,
    })
}
