use std::time::Duration;

/// Quiet period before a raw input fragment reaches the suggestion engine.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
/// Longest quiet period honoured; larger configured values are clamped.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(60);
/// Set-membership operator that switches value entry into multi-select.
pub const MEMBERSHIP_OPERATOR: &str = "IN";
/// Raw value of the operator token placed between confirmed multi-select values.
pub const VALUE_SEPARATOR: &str = ",";
pub const OPEN_BRACKET: char = '(';
pub const CLOSE_BRACKET: char = ')';
