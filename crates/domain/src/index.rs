use std::collections::{HashMap, HashSet};

use log::{debug, error};

use crate::{ExerciseRecord, ExerciseSource, muscle::registry, normalize::normalize};

/// Below this number of taxonomy matches, muscle group queries also match on exercise names.
pub const SUBSTRING_FALLBACK_THRESHOLD: usize = 5;

/// In-memory index over all known exercises.
///
/// Every record is reachable by the normalized form of its name, its alternate name and each of
/// its keywords. On key collisions the first record wins.
#[derive(Debug, Default)]
pub struct ExerciseIndex {
    records: Vec<ExerciseRecord>,
    by_key: HashMap<String, usize>,
}

impl ExerciseIndex {
    pub fn build(records: impl IntoIterator<Item = ExerciseRecord>) -> Self {
        let mut index = Self::default();

        for record in records {
            if normalize(&record.name).is_empty() {
                continue;
            }

            let position = index.records.len();
            for key in record
                .names()
                .chain(record.keywords.iter().map(String::as_str))
                .map(normalize)
                .filter(|k| !k.is_empty())
            {
                index.by_key.entry(key).or_insert(position);
            }
            index.records.push(record);
        }

        index
    }

    /// Loads all records of `source`. A failing source results in an empty index.
    pub fn from_source(source: &impl ExerciseSource) -> Self {
        match source.all_records() {
            Ok(records) => {
                let index = Self::build(records.into_iter().map(ExerciseRecord::from));
                debug!(
                    "indexed {} exercises under {} keys",
                    index.len(),
                    index.by_key.len()
                );
                index
            }
            Err(err) => {
                error!("failed to load exercises, continuing without index: {err}");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[ExerciseRecord] {
        &self.records
    }

    #[must_use]
    pub fn by_normalized_key(&self, key: &str) -> Option<ExerciseRecord> {
        let key = normalize(key);
        if key.is_empty() {
            return None;
        }
        self.by_key.get(&key).map(|i| self.records[*i].clone())
    }

    /// Exercises training the given muscle group, sorted by name.
    ///
    /// Records are matched through the muscle group registry. If that yields fewer than
    /// [`SUBSTRING_FALLBACK_THRESHOLD`] exercises, records whose name contains the group's name are
    /// added.
    #[must_use]
    pub fn by_muscle_group(&self, label: &str) -> Vec<ExerciseRecord> {
        let label = label.trim();
        if label.is_empty() {
            return vec![];
        }

        let canonical = registry().canonical_of(label).unwrap_or(label);
        let canonical_key = normalize(canonical);

        let mut seen = HashSet::new();
        let mut results = self
            .records
            .iter()
            .filter(|r| {
                r.muscle_groups
                    .iter()
                    .any(|g| registry().same_group(g, canonical))
            })
            .filter(|r| seen.insert(r.name.to_lowercase()))
            .cloned()
            .collect::<Vec<_>>();

        if results.len() < SUBSTRING_FALLBACK_THRESHOLD && !canonical_key.is_empty() {
            results.extend(
                self.records
                    .iter()
                    .filter(|r| normalize(&r.name).contains(&canonical_key))
                    .filter(|r| seen.insert(r.name.to_lowercase()))
                    .cloned(),
            );
        }

        results.sort_by_key(|r| r.name.to_lowercase());
        results
    }

    /// Free-text search over names and muscle groups, sorted by name.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<ExerciseRecord> {
        let key = normalize(query);
        if key.is_empty() {
            return vec![];
        }
        let raw = query.trim().to_lowercase();

        let mut seen = HashSet::new();
        let mut results = self
            .records
            .iter()
            .filter(|r| {
                normalize(&r.name).contains(&key)
                    || r.name.to_lowercase().contains(&raw)
                    || r.muscle_groups.iter().any(|g| normalize(g).contains(&key))
            })
            .filter(|r| seen.insert(normalize(&r.name)))
            .cloned()
            .collect::<Vec<_>>();

        results.sort_by_key(|r| r.name.to_lowercase());
        results
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{Provenance, SourceError, SourceRecord};

    fn record(name: &str, muscle_groups: &[&str]) -> ExerciseRecord {
        ExerciseRecord {
            muscle_groups: muscle_groups.iter().map(ToString::to_string).collect(),
            ..ExerciseRecord::new(name, Provenance::Primary)
        }
    }

    fn names(records: &[ExerciseRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    fn index() -> ExerciseIndex {
        ExerciseIndex::build([
            ExerciseRecord {
                alternate_name: Some("Bench Press".to_string()),
                keywords: BTreeSet::from(["banca plana".to_string()]),
                ..record("Press de Banca", &["Pecho", "Triceps"])
            },
            record("Aperturas", &["Chest"]),
            record("Flexiones", &["Pectorales"]),
            record("Cruce de poleas", &["Pecho"]),
            record("Fondos en paralelas", &["Torax", "Brazos"]),
            record("Sentadilla", &["Piernas"]),
            record("Dominadas", &["Espalda"]),
            record("Press de banca", &["Upper Chest"]),
            record("  ", &["Pecho"]),
        ])
    }

    #[test]
    fn test_build_skips_blank_names() {
        assert_eq!(index().len(), 8);
        assert!(!index().is_empty());
        assert!(ExerciseIndex::build(Vec::new()).is_empty());
    }

    #[rstest]
    #[case("press de banca", Some("Press de Banca"))]
    #[case("Press de Banca", Some("Press de Banca"))]
    #[case("bench press", Some("Press de Banca"))]
    #[case("Banca Plana", Some("Press de Banca"))]
    #[case("dominadas", Some("Dominadas"))]
    #[case("remo", None)]
    #[case("", None)]
    fn test_by_normalized_key(#[case] key: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            index().by_normalized_key(key).map(|r| r.name),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn test_by_muscle_group_synonyms_return_same_records() {
        let index = index();
        let chest = index.by_muscle_group("Chest");
        assert_eq!(chest, index.by_muscle_group("Pecho"));
        assert_eq!(chest, index.by_muscle_group("pectorales"));
        assert_eq!(
            names(&chest),
            vec![
                "Aperturas",
                "Cruce de poleas",
                "Flexiones",
                "Fondos en paralelas",
                "Press de Banca",
            ]
        );
    }

    #[test]
    fn test_by_muscle_group_substring_fallback() {
        let mut records = vec![
            record("Sentadilla", &["Piernas"]),
            record("Prensa", &["Legs"]),
            record("Curl femoral", &["Hamstrings"]),
            record("Elevación de piernas", &["Core"]),
            record("Piernas en banco", &[]),
            record("Tijeras de piernas", &["Abs"]),
            record("Estiramiento de piernas", &["Estiramiento"]),
        ];
        records.extend((0..43).map(|i| record(&format!("Ejercicio {i}"), &["Brazos"])));
        let index = ExerciseIndex::build(records);
        assert_eq!(index.len(), 50);

        let result = index.by_muscle_group("Piernas");

        assert_eq!(
            names(&result),
            vec![
                "Curl femoral",
                "Elevación de piernas",
                "Estiramiento de piernas",
                "Piernas en banco",
                "Prensa",
                "Sentadilla",
                "Tijeras de piernas",
            ]
        );
        assert!(
            result
                .iter()
                .all(|r| index.records().iter().any(|i| i.name == r.name))
        );
    }

    #[test]
    fn test_by_muscle_group_no_substring_fallback_above_threshold() {
        let index = ExerciseIndex::build([
            record("Sentadilla", &["Piernas"]),
            record("Prensa", &["Legs"]),
            record("Curl femoral", &["Hamstrings"]),
            record("Zancadas", &["Quads"]),
            record("Extensión de cuádriceps", &["Quadriceps"]),
            record("Elevación de piernas", &["Core"]),
        ]);
        assert_eq!(index.by_muscle_group("Legs").len(), SUBSTRING_FALLBACK_THRESHOLD);
    }

    #[test]
    fn test_by_muscle_group_deduplicates_by_name() {
        assert_eq!(
            names(&index().by_muscle_group("Upper Chest")),
            vec![
                "Aperturas",
                "Cruce de poleas",
                "Flexiones",
                "Fondos en paralelas",
                "Press de Banca",
            ]
        );
    }

    #[test]
    fn test_by_muscle_group_unknown_label() {
        let index = ExerciseIndex::build([
            record("Press Pallof", &["Serrato"]),
            record("Serrato en polea", &[]),
            record("Remo", &["Espalda"]),
        ]);
        assert_eq!(
            names(&index.by_muscle_group("serrato")),
            vec!["Press Pallof", "Serrato en polea"]
        );
        assert!(index.by_muscle_group("").is_empty());
        assert!(index.by_muscle_group("Glúteos").is_empty());
    }

    #[rstest]
    #[case("banca", vec!["Press de Banca"])]
    #[case("PRESS", vec!["Press de Banca"])]
    #[case("espalda", vec!["Dominadas"])]
    #[case("pec", vec!["Cruce de poleas", "Flexiones", "Press de Banca"])]
    #[case("", vec![])]
    fn test_search(#[case] query: &str, #[case] expected: Vec<&str>) {
        assert_eq!(names(&index().search(query)), expected);
    }

    struct FailingSource;

    impl ExerciseSource for FailingSource {
        fn find_by_name(&self, _: &str) -> Result<Option<SourceRecord>, SourceError> {
            Ok(None)
        }

        fn all_records(&self) -> Result<Vec<SourceRecord>, SourceError> {
            Err(SourceError::Unavailable("database locked".to_string()))
        }
    }

    #[test]
    fn test_from_source_failure_yields_empty_index() {
        assert!(ExerciseIndex::from_source(&FailingSource).is_empty());
    }
}
