//! Reply sanitizing: strips greetings the model opened with anyway.
//!
//! Best effort only: a greeting in the middle of a sentence, or one that is
//! not in [`GREETING_TOKENS`], survives.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Greeting phrases removed from the start of a reply. Spaces inside a
/// phrase match any (or no) whitespace.
pub const GREETING_TOKENS: &[&str] = &[
    "hey there",
    "hey",
    "hi there",
    "hi",
    "hiya",
    "hello there",
    "hello",
    "greetings",
    "howdy",
    "yo",
    "good morning",
    "good afternoon",
    "good evening",
    "good night",
    "good day",
];

/// Stacked greetings ("Hi! Hello there,") are stripped at most this many times.
pub const MAX_GREETING_SEGMENTS: usize = 3;

/// One anchored, case-insensitive pattern per token, longest phrase first so
/// "hiya" wins over "hi" and "hey there" over "hey".
static GREETINGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut tokens: Vec<&str> = GREETING_TOKENS.to_vec();
    tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
    tokens
        .iter()
        .map(|t| {
            let pattern = format!(r"(?i)^{}", t.replace(' ', r"\s*"));
            Regex::new(&pattern).expect("greeting pattern is valid")
        })
        .collect()
});

/// Punctuation and whitespace trailing a greeting.
static GREETING_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[!,.:]*\s*").expect("tail pattern is valid"));

/// Length of the greeting at the start of `text`, including its trailing
/// punctuation. A token followed by a letter or digit (in any script) is
/// the start of a longer word, not a greeting.
fn leading_greeting_len(text: &str) -> Option<usize> {
    let end = GREETINGS.iter().find_map(|re| {
        let m = re.find(text)?;
        let next = text[m.end()..].chars().next();
        match next {
            Some(c) if c.is_alphanumeric() => None,
            _ => Some(m.end()),
        }
    })?;
    let tail = GREETING_TAIL.find(&text[end..]).map_or(0, |m| m.end());
    Some(end + tail)
}

/// Remove up to [`MAX_GREETING_SEGMENTS`] leading greeting phrases.
///
/// Text that does not start with a greeting is returned unchanged,
/// including any leading whitespace.
pub fn strip_leading_greeting(text: &str) -> String {
    let mut rest = text.trim_start();
    let mut stripped = false;

    for _ in 0..MAX_GREETING_SEGMENTS {
        let Some(len) = leading_greeting_len(rest) else {
            break;
        };
        rest = rest[len..].trim_start();
        stripped = true;
    }

    if stripped {
        rest.to_string()
    } else {
        text.to_string()
    }
}
