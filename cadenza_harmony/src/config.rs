// Data-driven harmony configuration.
//
// Every tunable policy table the engine consults lives in `HarmonyConfig`:
// per-genre voice-leading limits, the reharmonization scoring tables
// (technique appropriateness per genre, technique complexity, per-genre axis
// weights), tension weights, and per-genre groove profiles for
// humanization. Editing the JSON changes behavior without recompiling.
//
// A config file only needs the entries it overrides: deserializing layers
// each table's entries over `HarmonyConfig::default()`, so genres and
// techniques the file leaves out keep their built-in values. Lookups for a
// genre missing from every table fall back to the gospel entry, then to a
// neutral built-in value.
//
// See also: `voice_leading.rs` (consumes `VoiceLeadingPolicy`), `reharm.rs`
// (consumes the scoring tables and defines `Technique`), `tension.rs`
// (`TensionWeights`), `humanize.rs` (`GrooveProfile`).

use crate::error::Result;
use crate::humanize::GrooveProfile;
use crate::reharm::Technique;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Stylistic context for policy lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Gospel,
    Jazz,
    NeoSoul,
    Blues,
    Classical,
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Genre::Gospel,
        Genre::Jazz,
        Genre::NeoSoul,
        Genre::Blues,
        Genre::Classical,
    ];

    /// Exact-ish lookup: case-insensitive, ignoring spaces, hyphens and
    /// underscores. `None` for anything else.
    pub fn from_name(name: &str) -> Option<Genre> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "gospel" => Some(Genre::Gospel),
            "jazz" => Some(Genre::Jazz),
            "neosoul" | "rnb" => Some(Genre::NeoSoul),
            "blues" => Some(Genre::Blues),
            "classical" => Some(Genre::Classical),
            _ => None,
        }
    }

    /// Like `from_name`, but unknown genres resolve to gospel.
    pub fn parse(name: &str) -> Genre {
        Genre::from_name(name).unwrap_or_else(|| {
            log::debug!("unknown genre {name:?}, using gospel policy");
            Genre::Gospel
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Genre::Gospel => "gospel",
            Genre::Jazz => "jazz",
            Genre::NeoSoul => "neo_soul",
            Genre::Blues => "blues",
            Genre::Classical => "classical",
        }
    }
}

// ---------------------------------------------------------------------------
// Policy groups
// ---------------------------------------------------------------------------

/// Limits on how far voices may travel between consecutive chords.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceLeadingPolicy {
    /// Largest single-voice displacement (semitones) a candidate may have.
    pub max_movement: u8,
    /// Whether candidates may be shifted an octave up or down.
    pub allow_wide_voicings: bool,
}

impl VoiceLeadingPolicy {
    pub fn gospel() -> Self {
        VoiceLeadingPolicy { max_movement: 10, allow_wide_voicings: true }
    }

    pub fn jazz() -> Self {
        VoiceLeadingPolicy { max_movement: 12, allow_wide_voicings: true }
    }

    pub fn classical() -> Self {
        VoiceLeadingPolicy { max_movement: 7, allow_wide_voicings: false }
    }
}

impl Default for VoiceLeadingPolicy {
    fn default() -> Self {
        VoiceLeadingPolicy::gospel()
    }
}

/// Relative weight of each scoring axis in a reharmonization's composite
/// score. Weights are used as given; they need not sum to one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub voice_leading: f64,
    pub harmonic_function: f64,
    /// Common-tone retention between original and replacement.
    pub parsimony: f64,
    pub genre: f64,
    pub complexity: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            voice_leading: 0.35,
            harmonic_function: 0.25,
            parsimony: 0.20,
            genre: 0.15,
            complexity: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReharmTables {
    /// Technique appropriateness per genre, 0-1.
    pub appropriateness: BTreeMap<Genre, BTreeMap<Technique, f64>>,
    /// Score for a technique missing from a genre's table.
    pub default_appropriateness: f64,
    /// Accessibility of each technique, 0-1 (simpler scores higher).
    pub complexity: BTreeMap<Technique, f64>,
    pub default_complexity: f64,
    /// Per-genre axis weights.
    pub weights: BTreeMap<Genre, ScoreWeights>,
}

impl Default for ReharmTables {
    fn default() -> Self {
        use Technique::*;
        let table = |entries: &[(Technique, f64)]| entries.iter().copied().collect::<BTreeMap<_, _>>();

        let mut appropriateness = BTreeMap::new();
        appropriateness.insert(
            Genre::Jazz,
            table(&[
                (ModalInterchange, 0.9),
                (DiatonicSubstitution, 0.8),
                (TritoneSubstitution, 1.0),
                (ChromaticApproach, 0.9),
                (DiminishedPassing, 0.9),
            ]),
        );
        appropriateness.insert(
            Genre::Gospel,
            table(&[
                (ModalInterchange, 0.7),
                (DiatonicSubstitution, 0.9),
                (ChromaticApproach, 1.0),
                (DiminishedPassing, 0.9),
                (Backdoor, 0.8),
            ]),
        );
        appropriateness.insert(
            Genre::Classical,
            table(&[
                (ModalInterchange, 1.0),
                (DiatonicSubstitution, 1.0),
                (SecondaryDominant, 0.9),
            ]),
        );
        appropriateness.insert(Genre::NeoSoul, table(&[(ModalInterchange, 0.9)]));
        appropriateness.insert(
            Genre::Blues,
            table(&[
                (DiatonicSubstitution, 0.8),
                (ChromaticApproach, 0.9),
                (DiminishedPassing, 0.8),
            ]),
        );

        let complexity = table(&[
            (DiatonicSubstitution, 1.0),
            (ModalInterchange, 0.8),
            (TritoneSubstitution, 0.7),
            (ChromaticApproach, 0.8),
            (DiminishedPassing, 0.7),
        ]);

        let w = |voice_leading, harmonic_function, parsimony, genre| ScoreWeights {
            voice_leading,
            harmonic_function,
            parsimony,
            genre,
            complexity: 0.05,
        };
        let mut weights = BTreeMap::new();
        weights.insert(Genre::Jazz, w(0.30, 0.25, 0.25, 0.15));
        weights.insert(Genre::Gospel, w(0.40, 0.30, 0.15, 0.10));
        weights.insert(Genre::Classical, w(0.40, 0.35, 0.15, 0.05));
        weights.insert(Genre::NeoSoul, w(0.25, 0.20, 0.30, 0.20));
        weights.insert(Genre::Blues, w(0.35, 0.25, 0.15, 0.20));

        ReharmTables {
            appropriateness,
            default_appropriateness: 0.5,
            complexity,
            default_complexity: 0.5,
            weights,
        }
    }
}

/// Weights of the per-chord tension factors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensionWeights {
    pub quality: f64,
    pub root_distance: f64,
    pub dissonance: f64,
    pub motion: f64,
    /// Added when any chord tone falls outside the key's scale.
    pub non_diatonic_penalty: f64,
}

impl Default for TensionWeights {
    fn default() -> Self {
        TensionWeights {
            quality: 0.35,
            root_distance: 0.35,
            dissonance: 0.2,
            motion: 0.1,
            non_diatonic_penalty: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HarmonyConfig {
    pub voice_leading: BTreeMap<Genre, VoiceLeadingPolicy>,
    pub reharm: ReharmTables,
    pub tension: TensionWeights,
    pub grooves: BTreeMap<Genre, GrooveProfile>,
}

impl Default for HarmonyConfig {
    fn default() -> Self {
        let mut voice_leading = BTreeMap::new();
        voice_leading.insert(Genre::Gospel, VoiceLeadingPolicy::gospel());
        voice_leading.insert(Genre::Jazz, VoiceLeadingPolicy::jazz());
        voice_leading.insert(Genre::NeoSoul, VoiceLeadingPolicy::jazz());
        voice_leading.insert(Genre::Blues, VoiceLeadingPolicy::gospel());
        voice_leading.insert(Genre::Classical, VoiceLeadingPolicy::classical());

        let mut grooves = BTreeMap::new();
        grooves.insert(Genre::Gospel, GrooveProfile::gospel());
        grooves.insert(Genre::Jazz, GrooveProfile::jazz());
        grooves.insert(Genre::NeoSoul, GrooveProfile::neo_soul());
        grooves.insert(Genre::Blues, GrooveProfile::blues());
        grooves.insert(Genre::Classical, GrooveProfile::classical());

        HarmonyConfig {
            voice_leading,
            reharm: ReharmTables::default(),
            tension: TensionWeights::default(),
            grooves,
        }
    }
}

/// On-disk shape of a config file. Every entry is optional.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    voice_leading: BTreeMap<Genre, VoiceLeadingPolicy>,
    reharm: ReharmFile,
    tension: Option<TensionWeights>,
    grooves: BTreeMap<Genre, GrooveProfile>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ReharmFile {
    appropriateness: BTreeMap<Genre, BTreeMap<Technique, f64>>,
    default_appropriateness: Option<f64>,
    complexity: BTreeMap<Technique, f64>,
    default_complexity: Option<f64>,
    weights: BTreeMap<Genre, ScoreWeights>,
}

impl ConfigFile {
    /// Overlay this file's entries on `base`. Per-genre appropriateness
    /// tables merge technique by technique.
    fn layer_over(self, mut base: HarmonyConfig) -> HarmonyConfig {
        base.voice_leading.extend(self.voice_leading);
        base.grooves.extend(self.grooves);
        if let Some(tension) = self.tension {
            base.tension = tension;
        }

        let reharm = &mut base.reharm;
        for (genre, table) in self.reharm.appropriateness {
            reharm.appropriateness.entry(genre).or_default().extend(table);
        }
        reharm.complexity.extend(self.reharm.complexity);
        reharm.weights.extend(self.reharm.weights);
        if let Some(v) = self.reharm.default_appropriateness {
            reharm.default_appropriateness = v;
        }
        if let Some(v) = self.reharm.default_complexity {
            reharm.default_complexity = v;
        }
        base
    }
}

impl<'de> Deserialize<'de> for HarmonyConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let file = ConfigFile::deserialize(deserializer)?;
        Ok(file.layer_over(HarmonyConfig::default()))
    }
}

static DEFAULT_CONFIG: Lazy<HarmonyConfig> = Lazy::new(HarmonyConfig::default);

impl HarmonyConfig {
    /// Shared built-in defaults.
    pub fn builtin() -> &'static HarmonyConfig {
        &DEFAULT_CONFIG
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = HarmonyConfig::from_json(&text)?;
        log::info!("loaded harmony config from {}", path.display());
        Ok(config)
    }

    fn genre_entry<'a, T>(table: &'a BTreeMap<Genre, T>, genre: Genre) -> Option<&'a T> {
        table.get(&genre).or_else(|| table.get(&Genre::Gospel))
    }

    pub fn voice_leading_policy(&self, genre: Genre) -> VoiceLeadingPolicy {
        HarmonyConfig::genre_entry(&self.voice_leading, genre)
            .copied()
            .unwrap_or_default()
    }

    pub fn appropriateness(&self, genre: Genre, technique: Technique) -> f64 {
        self.reharm
            .appropriateness
            .get(&genre)
            .and_then(|t| t.get(&technique))
            .copied()
            .unwrap_or(self.reharm.default_appropriateness)
    }

    pub fn complexity(&self, technique: Technique) -> f64 {
        self.reharm
            .complexity
            .get(&technique)
            .copied()
            .unwrap_or(self.reharm.default_complexity)
    }

    pub fn score_weights(&self, genre: Genre) -> ScoreWeights {
        HarmonyConfig::genre_entry(&self.reharm.weights, genre)
            .copied()
            .unwrap_or_default()
    }

    pub fn groove(&self, genre: Genre) -> GrooveProfile {
        HarmonyConfig::genre_entry(&self.grooves, genre)
            .cloned()
            .unwrap_or_else(GrooveProfile::gospel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = HarmonyConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored: HarmonyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.voice_leading, restored.voice_leading);
        assert_eq!(restored.voice_leading_policy(Genre::Classical).max_movement, 7);
        assert_eq!(config.reharm.weights.len(), restored.reharm.weights.len());
        assert_eq!(
            restored.appropriateness(Genre::Gospel, Technique::ChromaticApproach),
            1.0
        );
        assert_eq!(config.grooves.len(), restored.grooves.len());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "voice_leading": {
                "classical": { "max_movement": 5, "allow_wide_voicings": false }
            },
            "tension": { "non_diatonic_penalty": 0.25 }
        }"#;
        let config = HarmonyConfig::from_json(json).unwrap();
        assert_eq!(config.voice_leading_policy(Genre::Classical).max_movement, 5);
        // Genres the file leaves out keep their built-in entries.
        assert_eq!(config.voice_leading_policy(Genre::Jazz), VoiceLeadingPolicy::jazz());
        assert_eq!(config.voice_leading_policy(Genre::Jazz).max_movement, 12);
        assert_eq!(config.voice_leading_policy(Genre::Gospel), VoiceLeadingPolicy::gospel());
        assert_eq!(config.grooves, HarmonyConfig::default().grooves);
        assert_eq!(config.tension.non_diatonic_penalty, 0.25);
        assert_eq!(config.tension.quality, 0.35);
        assert_eq!(config.appropriateness(Genre::Jazz, Technique::TritoneSubstitution), 1.0);
    }

    #[test]
    fn test_partial_reharm_tables_merge_per_technique() {
        let json = r#"{
            "reharm": {
                "appropriateness": { "jazz": { "backdoor": 0.95 } },
                "default_complexity": 0.4
            }
        }"#;
        let config = HarmonyConfig::from_json(json).unwrap();
        assert_eq!(config.appropriateness(Genre::Jazz, Technique::Backdoor), 0.95);
        assert_eq!(config.appropriateness(Genre::Jazz, Technique::TritoneSubstitution), 1.0);
        assert_eq!(config.appropriateness(Genre::Gospel, Technique::ChromaticApproach), 1.0);
        assert_eq!(config.complexity(Technique::Backdoor), 0.4);
        assert_eq!(config.complexity(Technique::DiatonicSubstitution), 1.0);
        assert_eq!(config.reharm.default_appropriateness, 0.5);
        assert_eq!(config.reharm.weights, HarmonyConfig::default().reharm.weights);
        assert_eq!(HarmonyConfig::from_json("{}").unwrap(), HarmonyConfig::default());
    }

    #[test]
    fn test_genre_names_and_fallback() {
        assert_eq!(Genre::parse("Neo-Soul"), Genre::NeoSoul);
        assert_eq!(Genre::parse("JAZZ"), Genre::Jazz);
        assert_eq!(Genre::parse("polka"), Genre::Gospel);
        assert_eq!(Genre::from_name("polka"), None);
        for g in Genre::ALL {
            assert_eq!(Genre::from_name(g.name()), Some(g));
        }
    }

    #[test]
    fn test_missing_technique_uses_default_score() {
        let config = HarmonyConfig::builtin();
        assert_eq!(config.appropriateness(Genre::NeoSoul, Technique::Backdoor), 0.5);
        assert_eq!(config.complexity(Technique::Backdoor), 0.5);
        assert_eq!(config.complexity(Technique::DiatonicSubstitution), 1.0);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = HarmonyConfig::load("/nonexistent/harmony.json").unwrap_err();
        assert!(matches!(err, crate::error::HarmonyError::Io(_)));
    }
}
