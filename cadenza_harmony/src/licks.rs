// Annotated lick corpus.
//
// A `LickPattern` is a short melodic fragment: semitone offsets from the
// chord root, a parallel rhythm in beats, and tags (style, difficulty,
// harmonic contexts, phrase type, characteristics). The built-in corpus is
// compiled in from `data/licks.json` and parsed once on first access;
// `LickCorpus::load` reads the same format from disk.
//
// Besides lookups, this module tags interval sequences automatically
// (`detect_characteristics`) and scores their complexity, so generated licks
// can be described with the same vocabulary as the hand-annotated ones.

use crate::error::{HarmonyError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const BUILTIN_JSON: &str = include_str!("../data/licks.json");

static BUILTIN: Lazy<LickCorpus> = Lazy::new(|| match LickCorpus::from_json(BUILTIN_JSON) {
    Ok(corpus) => {
        log::debug!("loaded built-in lick corpus: {} patterns", corpus.len());
        corpus
    }
    Err(e) => {
        log::warn!("built-in lick corpus failed to parse: {e}");
        LickCorpus::default()
    }
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// One annotated melodic fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LickPattern {
    pub name: String,
    pub style: String,
    /// Semitone offsets from the chord root, one per note.
    pub intervals: Vec<i8>,
    /// Note durations in beats, parallel to `intervals`.
    #[serde(default)]
    pub rhythm: Vec<f64>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub harmonic_context: Vec<String>,
    #[serde(default)]
    pub phrase_type: String,
    #[serde(default)]
    pub characteristics: Vec<String>,
}

impl LickPattern {
    /// Total length in beats.
    pub fn duration(&self) -> f64 {
        self.rhythm.iter().sum()
    }

    pub fn fits_context(&self, context: &str) -> bool {
        self.harmonic_context.iter().any(|c| c.eq_ignore_ascii_case(context))
    }

    pub fn has_characteristic(&self, tag: &str) -> bool {
        self.characteristics.iter().any(|c| c.eq_ignore_ascii_case(tag))
    }

    /// Characteristics derived from the notes themselves, independent of
    /// the hand-written tags.
    pub fn detected_characteristics(&self) -> Vec<Characteristic> {
        detect_characteristics(&self.intervals, &self.rhythm)
    }

    pub fn complexity(&self) -> LickComplexity {
        complexity(&self.intervals, &self.rhythm)
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// Filter for `LickCorpus::search`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LickQuery {
    pub style: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub harmonic_context: Option<String>,
    pub phrase_type: Option<String>,
    /// Every listed tag must be present.
    pub characteristics: Vec<String>,
}

impl LickQuery {
    pub fn matches(&self, pattern: &LickPattern) -> bool {
        let same = |want: &Option<String>, have: &str| {
            want.as_deref().is_none_or(|w| have.eq_ignore_ascii_case(w))
        };
        if !same(&self.style, &pattern.style) || !same(&self.phrase_type, &pattern.phrase_type) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != pattern.difficulty) {
            return false;
        }
        if self
            .harmonic_context
            .as_deref()
            .is_some_and(|c| !pattern.fits_context(c))
        {
            return false;
        }
        self.characteristics.iter().all(|t| pattern.has_characteristic(t))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LickCorpus {
    pub patterns: Vec<LickPattern>,
}

/// Pattern counts broken down by tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub by_style: BTreeMap<String, usize>,
    pub by_difficulty: BTreeMap<Difficulty, usize>,
    pub by_phrase_type: BTreeMap<String, usize>,
    pub average_length: f64,
}

impl LickCorpus {
    pub fn new(patterns: Vec<LickPattern>) -> Self {
        LickCorpus { patterns }
    }

    /// The corpus compiled into the library.
    pub fn builtin() -> &'static LickCorpus {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let corpus = Self::from_json(&data)?;
        log::info!("loaded {} lick patterns from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Distinct style names, sorted.
    pub fn styles(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.patterns.iter().map(|p| p.style.as_str()).collect();
        set.into_iter().collect()
    }

    pub fn by_style(&self, style: &str) -> Vec<&LickPattern> {
        self.patterns
            .iter()
            .filter(|p| p.style.eq_ignore_ascii_case(style))
            .collect()
    }

    /// Like `by_style`, but an unknown style is an error.
    pub fn require_style(&self, style: &str) -> Result<Vec<&LickPattern>> {
        let patterns = self.by_style(style);
        if patterns.is_empty() {
            return Err(HarmonyError::EmptyCorpus(style.to_string()));
        }
        Ok(patterns)
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&LickPattern> {
        self.patterns.iter().filter(|p| p.difficulty == difficulty).collect()
    }

    pub fn by_harmonic_context(&self, context: &str) -> Vec<&LickPattern> {
        self.patterns.iter().filter(|p| p.fits_context(context)).collect()
    }

    pub fn by_phrase_type(&self, phrase_type: &str) -> Vec<&LickPattern> {
        self.patterns
            .iter()
            .filter(|p| p.phrase_type.eq_ignore_ascii_case(phrase_type))
            .collect()
    }

    pub fn by_name(&self, name: &str) -> Option<&LickPattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    pub fn search(&self, query: &LickQuery) -> Vec<&LickPattern> {
        self.patterns.iter().filter(|p| query.matches(p)).collect()
    }

    pub fn stats(&self) -> CorpusStats {
        let mut stats = CorpusStats {
            total: self.patterns.len(),
            ..CorpusStats::default()
        };
        for p in &self.patterns {
            *stats.by_style.entry(p.style.clone()).or_default() += 1;
            *stats.by_difficulty.entry(p.difficulty).or_default() += 1;
            *stats.by_phrase_type.entry(p.phrase_type.clone()).or_default() += 1;
        }
        if !self.patterns.is_empty() {
            let notes: usize = self.patterns.iter().map(|p| p.intervals.len()).sum();
            stats.average_length = notes as f64 / self.patterns.len() as f64;
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Characteristic detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    Chromatic,
    Arpeggio,
    Scalar,
    Ascending,
    Descending,
    BlueNotes,
    WideLeaps,
    Syncopation,
    Triplet,
}

impl Characteristic {
    pub fn name(self) -> &'static str {
        match self {
            Characteristic::Chromatic => "chromatic",
            Characteristic::Arpeggio => "arpeggio",
            Characteristic::Scalar => "scalar",
            Characteristic::Ascending => "ascending",
            Characteristic::Descending => "descending",
            Characteristic::BlueNotes => "blue_notes",
            Characteristic::WideLeaps => "wide_leaps",
            Characteristic::Syncopation => "syncopation",
            Characteristic::Triplet => "triplet",
        }
    }
}

/// Pitch classes of the minor third, flat fifth and minor seventh.
const BLUE_NOTE_PCS: [i8; 3] = [3, 6, 10];

/// Leaps wider than a perfect fifth.
const WIDE_LEAP: i8 = 8;

fn steps(intervals: &[i8]) -> Vec<i8> {
    intervals.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Tag an offset sequence by its melodic and rhythmic surface.
///
/// Ratios are taken over the number of notes, so a two-note fragment with a
/// single half step counts as chromatic only when that step is at least
/// 30% of the notes.
pub fn detect_characteristics(intervals: &[i8], rhythm: &[f64]) -> Vec<Characteristic> {
    let mut out = Vec::new();
    let n = intervals.len();
    if n == 0 {
        return out;
    }
    let steps = steps(intervals);
    let count = |pred: &dyn Fn(i8) -> bool| steps.iter().filter(|&&s| pred(s)).count() as f64;

    if count(&|s| s.abs() == 1) >= 0.3 * n as f64 {
        out.push(Characteristic::Chromatic);
    }
    if n >= 3 && count(&|s| matches!(s.abs(), 3 | 4 | 5 | 7)) >= 0.5 * n as f64 {
        out.push(Characteristic::Arpeggio);
    }
    if !steps.is_empty() && count(&|s| s != 0 && s.abs() <= 2) >= 0.6 * n as f64 {
        out.push(Characteristic::Scalar);
    }

    let ups = count(&|s| s > 0);
    let downs = count(&|s| s < 0);
    if ups > 0.0 && ups >= 2.0 * downs {
        out.push(Characteristic::Ascending);
    } else if downs > 0.0 && downs >= 2.0 * ups {
        out.push(Characteristic::Descending);
    }

    if intervals.iter().any(|i| BLUE_NOTE_PCS.contains(&i.rem_euclid(12))) {
        out.push(Characteristic::BlueNotes);
    }
    if steps.iter().any(|s| s.abs() >= WIDE_LEAP) {
        out.push(Characteristic::WideLeaps);
    }

    if has_syncopation(rhythm) {
        out.push(Characteristic::Syncopation);
    }
    if rhythm.iter().any(|&d| is_triplet(d)) {
        out.push(Characteristic::Triplet);
    }
    out
}

/// A note starting off the eighth-note grid, or a long note starting on an
/// off-beat eighth.
fn has_syncopation(rhythm: &[f64]) -> bool {
    let mut onset = 0.0;
    for &d in rhythm {
        let frac = onset - f64::floor(onset);
        let off_eighth = (frac * 2.0 - f64::round(frac * 2.0)).abs() > 1e-6;
        let tied_upbeat = (frac - 0.5).abs() < 1e-6 && d >= 1.0;
        if (off_eighth && !is_triplet(d)) || tied_upbeat {
            return true;
        }
        onset += d;
    }
    false
}

fn is_triplet(duration: f64) -> bool {
    [1.0 / 3.0, 2.0 / 3.0, 1.0 / 6.0]
        .iter()
        .any(|t| (duration - t).abs() < 0.02)
}

/// How hard a fragment is to play, from its surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LickComplexity {
    /// Distance from the lowest to the highest offset.
    pub range: u8,
    pub unique_pitches: usize,
    /// Share of half-step moves.
    pub chromatic_density: f64,
    pub direction_changes: usize,
    pub unique_durations: usize,
    /// Weighted 0-1 summary of the above.
    pub score: f64,
}

pub fn complexity(intervals: &[i8], rhythm: &[f64]) -> LickComplexity {
    let steps = steps(intervals);
    let range = match (intervals.iter().min(), intervals.iter().max()) {
        (Some(lo), Some(hi)) => (hi - lo).unsigned_abs(),
        _ => 0,
    };
    let unique_pitches = intervals.iter().collect::<BTreeSet<_>>().len();
    let chromatic_density = if steps.is_empty() {
        0.0
    } else {
        steps.iter().filter(|s| s.abs() == 1).count() as f64 / steps.len() as f64
    };
    let directions: Vec<i8> = steps.iter().map(|s| s.signum()).filter(|&s| s != 0).collect();
    let direction_changes = directions.windows(2).filter(|w| w[0] != w[1]).count();
    let unique_durations = rhythm
        .iter()
        .map(|d| (d * 1000.0).round() as i64)
        .collect::<BTreeSet<_>>()
        .len();

    let range_part = (f64::from(range) / 24.0).min(1.0);
    let pitch_part = (unique_pitches as f64 / 10.0).min(1.0);
    let turn_part = if steps.len() > 1 {
        direction_changes as f64 / (steps.len() - 1) as f64
    } else {
        0.0
    };
    let rhythm_part = (unique_durations.saturating_sub(1) as f64 / 3.0).min(1.0);
    let score = 0.25 * range_part
        + 0.2 * pitch_part
        + 0.2 * chromatic_density
        + 0.2 * turn_part
        + 0.15 * rhythm_part;

    LickComplexity {
        range,
        unique_pitches,
        chromatic_density,
        direction_changes,
        unique_durations,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_corpus_styles() {
        let corpus = LickCorpus::builtin();
        assert_eq!(corpus.len(), 125);
        assert_eq!(
            corpus.styles(),
            vec!["bebop", "blues", "classical", "gospel", "modern_jazz", "neo_soul"]
        );
        assert_eq!(corpus.by_style("bebop").len(), 35);
        assert_eq!(corpus.by_style("BEBOP").len(), 35);
        assert!(corpus.patterns.iter().all(|p| p.intervals.len() == p.rhythm.len()));
    }

    #[test]
    fn test_require_style_unknown() {
        let err = LickCorpus::builtin().require_style("polka").unwrap_err();
        assert!(matches!(err, HarmonyError::EmptyCorpus(s) if s == "polka"));
    }

    #[test]
    fn test_queries() {
        let corpus = LickCorpus::builtin();
        let p = corpus.by_name("bebop_enclosure_below_above").unwrap();
        assert_eq!(p.intervals, vec![0, -1, 1, 0]);
        assert_eq!(p.duration(), 1.5);
        assert!(p.fits_context("MAJ7"));

        let query = LickQuery {
            style: Some("bebop".into()),
            difficulty: Some(Difficulty::Beginner),
            characteristics: vec!["enclosure".into()],
            ..LickQuery::default()
        };
        let hits = corpus.search(&query);
        assert!(hits.iter().any(|p| p.name == "bebop_enclosure_above_below"));
        assert!(hits.iter().all(|p| p.style == "bebop" && p.difficulty == Difficulty::Beginner));
        assert_eq!(corpus.by_difficulty(Difficulty::Advanced).len(), 43);
        assert!(!corpus.by_phrase_type("approach").is_empty());
        assert!(!corpus.by_harmonic_context("dom7").is_empty());
    }

    #[test]
    fn test_stats() {
        let stats = LickCorpus::builtin().stats();
        assert_eq!(stats.total, 125);
        assert_eq!(stats.by_style["gospel"], 25);
        assert_eq!(stats.by_difficulty[&Difficulty::Beginner], 25);
        assert!(stats.average_length > 3.0);
    }

    #[test]
    fn test_from_json_minimal_pattern() {
        let json = r#"{"patterns":[{"name":"x","style":"blues","intervals":[0,3,5],"difficulty":"beginner"}]}"#;
        let corpus = LickCorpus::from_json(json).unwrap();
        assert!(corpus.patterns[0].rhythm.is_empty());
        assert!(LickCorpus::from_json("{").is_err());
    }

    #[test]
    fn test_detect_chromatic_ascending() {
        let tags = detect_characteristics(&[0, 1, 2, 3, 4, 5, 6, 7], &[0.5; 8]);
        assert!(tags.contains(&Characteristic::Chromatic));
        assert!(tags.contains(&Characteristic::Scalar));
        assert!(tags.contains(&Characteristic::Ascending));
        assert!(tags.contains(&Characteristic::BlueNotes));
        assert!(!tags.contains(&Characteristic::Syncopation));
    }

    #[test]
    fn test_detect_arpeggio_and_leaps() {
        let tags = detect_characteristics(&[0, 4, 7, 12, 7, 4, 0], &[]);
        assert!(tags.contains(&Characteristic::Arpeggio));
        assert!(!tags.contains(&Characteristic::Ascending));
        assert!(!tags.contains(&Characteristic::WideLeaps));
        let tags = detect_characteristics(&[0, 12, 0], &[]);
        assert!(tags.contains(&Characteristic::WideLeaps));
    }

    #[test]
    fn test_detect_rhythm() {
        let third = 1.0 / 3.0;
        let tags = detect_characteristics(&[0, 2, 4], &[third, third, third]);
        assert!(tags.contains(&Characteristic::Triplet));
        assert!(!tags.contains(&Characteristic::Syncopation));
        let tags = detect_characteristics(&[0, 2, 4], &[0.5, 1.5, 1.0]);
        assert!(tags.contains(&Characteristic::Syncopation));
        assert!(detect_characteristics(&[], &[]).is_empty());
    }

    #[test]
    fn test_complexity() {
        let simple = complexity(&[0, 2, 4, 5], &[1.0; 4]);
        assert_eq!(simple.range, 5);
        assert_eq!(simple.direction_changes, 0);
        assert_eq!(simple.unique_durations, 1);
        let busy = complexity(&[0, 13, 1, 14, -1, 12], &[0.25, 0.5, 0.25, 1.0, 0.75, 0.5]);
        assert!(busy.score > simple.score);
        assert_eq!(complexity(&[], &[]).score, 0.0);
    }
}
