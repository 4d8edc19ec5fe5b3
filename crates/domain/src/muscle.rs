use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::LazyLock,
};

use crate::normalize::normalize;

/// Canonical muscle group labels and their known synonyms in Spanish and English.
const MUSCLE_GROUPS: [(&str, &[&str]); 16] = [
    ("Pecho", &["Pectorales", "Torax", "Chest", "Upper Chest"]),
    (
        "Espalda",
        &["Back", "Dorsales", "Lat", "Lats", "Latissimus dorsi"],
    ),
    (
        "Piernas",
        &[
            "Legs",
            "Lower Body",
            "Quadriceps",
            "Quads",
            "Isquiotibiales",
            "Hamstrings",
            "Femoral",
        ],
    ),
    ("Core", &["Abdominales", "Abs", "Abdomen", "Midsection"]),
    ("Hombros", &["Deltoides", "Shoulders", "Delts"]),
    (
        "Brazos",
        &["Arms", "Biceps", "Triceps", "Antebrazos", "Forearms"],
    ),
    ("Gluteos", &["Glutes", "Gluteus"]),
    (
        "Pantorrillas",
        &["Pantorrilla", "Gemelos", "Calf", "Calves"],
    ),
    ("Cuerpo Completo", &["Full Body", "Total Body"]),
    ("Cardio", &["Aerobico", "Resistencia"]),
    ("Trapecios", &["Traps", "Trapecio"]),
    ("Lumbar", &["Espalda baja", "Lower Back"]),
    ("Cuello", &["Neck"]),
    ("Movilidad", &["Mobility"]),
    ("Calentamiento", &["Warm Up", "Warmup"]),
    ("Estiramiento", &["Stretching", "Stretch"]),
];

static REGISTRY: LazyLock<MuscleGroupRegistry> =
    LazyLock::new(|| MuscleGroupRegistry::new(&MUSCLE_GROUPS));

/// The process-wide registry, built on first use.
#[must_use]
pub fn registry() -> &'static MuscleGroupRegistry {
    &REGISTRY
}

pub struct MuscleGroupRegistry {
    canonical_by_synonym: HashMap<String, &'static str>,
    synonyms_by_canonical: BTreeMap<&'static str, BTreeSet<&'static str>>,
}

impl MuscleGroupRegistry {
    fn new(table: &[(&'static str, &'static [&'static str])]) -> Self {
        let mut canonical_by_synonym = HashMap::new();
        let mut synonyms_by_canonical: BTreeMap<&'static str, BTreeSet<&'static str>> =
            BTreeMap::new();

        for (canonical, synonyms) in table {
            let key = normalize(canonical);
            if key.is_empty() {
                continue;
            }

            let registered = synonyms_by_canonical.entry(*canonical).or_default();
            registered.insert(*canonical);
            canonical_by_synonym.insert(key, *canonical);

            for synonym in *synonyms {
                let key = normalize(synonym);
                if key.is_empty() {
                    continue;
                }
                canonical_by_synonym.insert(key, *canonical);
                registered.insert(*synonym);
            }
        }

        Self {
            canonical_by_synonym,
            synonyms_by_canonical,
        }
    }

    #[must_use]
    pub fn canonical_of(&self, label: &str) -> Option<&'static str> {
        let key = normalize(label);
        if key.is_empty() {
            return None;
        }
        self.canonical_by_synonym.get(&key).copied()
    }

    /// All registered synonyms of the group `label` belongs to, including the canonical label.
    #[must_use]
    pub fn synonyms_of(&self, label: &str) -> BTreeSet<&'static str> {
        self.canonical_of(label)
            .and_then(|canonical| self.synonyms_by_canonical.get(canonical))
            .cloned()
            .unwrap_or_default()
    }

    /// Labels without a known canonical form are compared by their normalized text.
    #[must_use]
    pub fn same_group(&self, a: &str, b: &str) -> bool {
        let a = self.canonical_of(a).map_or_else(|| normalize(a), normalize);
        let b = self.canonical_of(b).map_or_else(|| normalize(b), normalize);
        !a.is_empty() && a == b
    }

    pub fn canonical_labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.synonyms_by_canonical.keys().copied()
    }
}
