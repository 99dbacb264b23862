/// Dangerous-content pattern used to scan attribute and style values.
///
/// Deliberately broad: a false positive drops a harmless value, a false
/// negative lets script through.
use std::sync::LazyLock;

use regex::Regex;

static DANGEROUS_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)javascript:|on\w+\s*=|</?script|eval\s*\(|expression\s*\(")
        .expect("DANGEROUS_CONTENT: hardcoded regex is valid")
});

/// Returns true if `value` contains anything that looks executable.
pub fn is_dangerous(value: &str) -> bool {
    DANGEROUS_CONTENT.is_match(value)
}
