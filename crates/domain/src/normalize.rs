use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Derives the lookup key used for every name and label comparison.
///
/// The input is lowercased, decomposed and stripped of diacritical marks. Every run of characters
/// outside `[a-z0-9]` becomes a single space and the result is trimmed. An empty key means that no
/// match is possible.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    let mut separator = false;

    for c in text
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
    {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if separator && !key.is_empty() {
                key.push(' ');
            }
            separator = false;
            key.push(c);
        } else {
            separator = true;
        }
    }

    key
}

#[must_use]
pub fn is_blank(text: &str) -> bool {
    normalize(text).is_empty()
}

pub fn tokens(key: &str) -> impl Iterator<Item = &str> {
    key.split(' ').filter(|t| !t.is_empty())
}

/// Case-insensitive equality as used for names coming from the exercise sources.
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
