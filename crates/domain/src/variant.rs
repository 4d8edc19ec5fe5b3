use std::{slice::Iter, sync::LazyLock};

use regex::Regex;

use crate::normalize::{eq_ignore_case, normalize, tokens};

/// Connector word introducing equipment or grip qualifiers ("Remo con barra").
pub const WITH_CONNECTOR: &str = "con";

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(.*?\)\s*").expect("parenthetical regex must compile")
});

static WITH_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{WITH_CONNECTOR}\b.*")).expect("with clause regex must compile")
});

/// Alternative spellings of a raw exercise name.
///
/// Behaves as a set: values differing only in case are stored once. Iteration follows insertion
/// order, which is the order in which the resolver tries the variants.
#[derive(Debug, Clone, Default, Eq)]
pub struct NameVariants(Vec<String>);

impl NameVariants {
    fn insert(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.0.push(value.to_string());
        true
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| eq_ignore_case(v, value))
    }

    pub fn iter(&self) -> Iter<'_, String> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty normalized keys of all variants, without duplicates.
    #[must_use]
    pub fn normalized_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.0.len());
        for key in self.0.iter().map(|v| normalize(v)) {
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl PartialEq for NameVariants {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl<'a> IntoIterator for &'a NameVariants {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Derives alternative spellings of a free-text exercise name.
///
/// The trimmed original always comes first. Further variants drop a parenthetical detail, keep the
/// text before the first dash, colon or comma, drop a trailing "con ..." clause, and add the
/// normalized form together with its first two tokens when it is longer than that.
#[must_use]
pub fn variants(raw: &str) -> NameVariants {
    let mut variants = NameVariants::default();

    if !variants.insert(raw) {
        return variants;
    }

    variants.insert(&PARENTHETICAL.replace_all(raw, " "));

    for separator in ['-', ':', ','] {
        if let Some((head, _)) = raw.split_once(separator) {
            variants.insert(head);
        }
    }

    variants.insert(&WITH_CLAUSE.replace(raw, ""));

    let key = normalize(raw);
    variants.insert(&key);

    let words = tokens(&key).collect::<Vec<_>>();
    if words.len() > 2 {
        variants.insert(&words[..2].join(" "));
    }

    variants
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn list(variants: &NameVariants) -> Vec<&str> {
        variants.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_variants_parenthetical() {
        let variants = variants("Bench Press (Barbell)");
        assert!(variants.contains("Bench Press"));
        assert_eq!(
            list(&variants),
            vec!["Bench Press (Barbell)", "Bench Press", "bench press barbell"]
        );
    }

    #[test]
    fn test_variants_separators_and_connector() {
        assert_eq!(
            list(&variants("Remo con barra - agarre prono")),
            vec![
                "Remo con barra - agarre prono",
                "Remo con barra",
                "Remo",
                "remo con barra agarre prono",
                "remo con",
            ]
        );
    }

    #[rstest]
    #[case("Sentadilla: variante frontal", "Sentadilla")]
    #[case("Dominadas, agarre amplio", "Dominadas")]
    #[case("Curl con Mancuerna", "Curl")]
    #[case("Curl CON mancuerna", "Curl")]
    #[case("Press de banca inclinado", "press de")]
    fn test_variants_contains(#[case] raw: &str, #[case] expected: &str) {
        assert!(variants(raw).contains(expected), "{expected} not in {raw}");
    }

    #[rstest]
    #[case("Contractora de pecho", "Contractora")]
    #[case("Press banca", "press")]
    fn test_variants_not_contains(#[case] raw: &str, #[case] unexpected: &str) {
        assert!(!variants(raw).contains(unexpected));
    }

    #[test]
    fn test_variants_starts_with_trimmed_original() {
        assert_eq!(
            variants("  Plancha  ").iter().next().map(String::as_str),
            Some("Plancha")
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_variants_blank(#[case] raw: &str) {
        assert!(variants(raw).is_empty());
    }

    #[rstest]
    #[case("Bench Press (Barbell)")]
    #[case("Remo con barra - agarre prono")]
    #[case("Extensión de Cuádriceps, máquina")]
    fn test_variants_deterministic(#[case] raw: &str) {
        assert_eq!(variants(raw), variants(raw));
        assert_eq!(list(&variants(raw)), list(&variants(raw)));
    }

    #[test]
    fn test_variants_set_semantics() {
        let variants = variants("press (x)");
        assert_eq!(list(&variants), vec!["press (x)", "press", "press x"]);
        assert!(variants.contains("PRESS"));
    }

    #[test]
    fn test_name_variants_eq_ignores_order() {
        let a = NameVariants(vec!["A".to_string(), "b".to_string()]);
        let b = NameVariants(vec!["B".to_string(), "a".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, NameVariants(vec!["a".to_string()]));
    }

    #[test]
    fn test_normalized_keys() {
        assert_eq!(
            variants("Bench Press (Barbell)").normalized_keys(),
            vec!["bench press barbell", "bench press"]
        );
    }
}
