//! Friend code validation for incoming challenges.

use std::sync::LazyLock;

use regex::Regex;

/// Reply sent to the chat when a friend code is missing or malformed.
pub const FRIEND_CODE_HINT: &str = r#"You must enter a valid friend code ie. "!challenge 2817-2891-0029""#;

static FRIEND_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}[ -]?[0-9]{4}[ -]?[0-9]{4}$").expect("friend code pattern is valid")
});

/// Returns the trimmed code if it is three groups of four digits, optionally
/// separated by a space or dash.
pub fn validate_friend_code(code: &str) -> Option<&str> {
    let code = code.trim();
    FRIEND_CODE.is_match(code).then_some(code)
}
