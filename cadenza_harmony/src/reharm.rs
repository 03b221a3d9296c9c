// Reharmonization: substitution candidates and their scoring.
//
// Candidate generators work on one chord (tritone substitution, diatonic
// and modal-interchange substitutes) or on a pair of neighbours (passing
// and approach chords, backdoor resolution). Each suggestion carries a
// `level` from 1 (plain) to 5 (adventurous); callers cap it to control how
// far a reharmonization strays.
//
// `reharmonize_progression` runs every applicable generator at every
// position, scores each suggestion on five axes, de-duplicates, and returns
// the candidates best first per position. The axes:
// - voice leading: smoothness of the voiced transition from the previous
//   chord and into the next one, voiced with the genre's policy;
// - harmonic function: whether the replacement keeps the original's role;
// - parsimony: common tones kept from the chord it replaces or approaches;
// - genre: technique appropriateness for the genre (config table);
// - complexity: technique accessibility (config table).
// The composite is the weighted sum with the genre's `ScoreWeights`.
//
// Generators are gated the same way at every position: modal interchange
// needs level 2 or more, passing and approach chords level 3 or more.

use crate::chord::ChordSymbol;
use crate::config::{Genre, HarmonyConfig, VoiceLeadingPolicy};
use crate::function::{self, HarmonicFunction};
use crate::key::{self, Key};
use crate::pitch::{KeyMode, PitchClass, interval, transpose};
use crate::voice_leading;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reharmonization technique. Keys the config's appropriateness and
/// complexity tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    TritoneSubstitution,
    DiatonicSubstitution,
    ChromaticApproach,
    DiminishedPassing,
    SecondaryDominant,
    Backdoor,
    ModalInterchange,
}

impl Technique {
    pub const ALL: [Technique; 7] = [
        Technique::TritoneSubstitution,
        Technique::DiatonicSubstitution,
        Technique::ChromaticApproach,
        Technique::DiminishedPassing,
        Technique::SecondaryDominant,
        Technique::Backdoor,
        Technique::ModalInterchange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Technique::TritoneSubstitution => "tritone_substitution",
            Technique::DiatonicSubstitution => "diatonic_substitution",
            Technique::ChromaticApproach => "chromatic_approach",
            Technique::DiminishedPassing => "diminished_passing",
            Technique::SecondaryDominant => "secondary_dominant",
            Technique::Backdoor => "backdoor",
            Technique::ModalInterchange => "modal_interchange",
        }
    }

    /// Dominant substitutes resolve the same way as the chord they replace.
    fn preserves_function(self) -> bool {
        matches!(self, Technique::TritoneSubstitution | Technique::Backdoor)
    }
}

/// Where a suggested chord goes relative to the position it was made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Replaces the chord at the position.
    Replace,
    /// Goes between the chord at the position and the next one.
    InsertAfter,
}

/// One unscored suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub original: ChordSymbol,
    pub replacement: ChordSymbol,
    pub technique: Technique,
    pub placement: Placement,
    /// 1 (plain) to 5 (adventurous).
    pub level: u8,
    pub explanation: String,
}

fn make(root: PitchClass, quality: &str, prefer_sharps: bool) -> Option<ChordSymbol> {
    let mut chord = ChordSymbol::new(root, quality).ok()?;
    chord.prefer_sharps = prefer_sharps;
    Some(chord)
}

fn suggest(
    original: &ChordSymbol,
    replacement: Option<ChordSymbol>,
    technique: Technique,
    placement: Placement,
    level: u8,
    explanation: impl Into<String>,
) -> Option<Suggestion> {
    Some(Suggestion {
        original: original.clone(),
        replacement: replacement?,
        technique,
        placement,
        level,
        explanation: explanation.into(),
    })
}

// ---------------------------------------------------------------------------
// Single-chord substitutions
// ---------------------------------------------------------------------------

/// The dominant a tritone away, with the same quality and flat spelling.
/// Only dominant-family chords have one.
pub fn tritone_sub(chord: &ChordSymbol) -> Option<Suggestion> {
    if !chord.is_dominant() {
        return None;
    }
    let mut sub = chord.transpose(6).flat_spelling();
    sub.bass = None;
    let explanation = format!("{} and {} share the same tritone", chord.name(), sub.name());
    suggest(chord, Some(sub), Technique::TritoneSubstitution, Placement::Replace, 3, explanation)
}

/// (interval from tonic, quality, level, explanation)
type SubRule = (u8, &'static str, u8, &'static str);

fn diatonic_rules(mode: KeyMode, degree: u8) -> &'static [SubRule] {
    match (mode, degree) {
        (KeyMode::Major, 0) => &[
            (9, "m7", 1, "vi is the relative-minor tonic substitute"),
            (4, "m7", 2, "iii is the mediant tonic substitute"),
        ],
        (KeyMode::Major, 5) => &[(2, "m7", 1, "ii is the usual subdominant substitute")],
        (KeyMode::Major, 2) => &[(5, "maj7", 1, "IV is the usual subdominant substitute")],
        (KeyMode::Major, 7) => &[(11, "m7b5", 2, "vii shares dominant function with V")],
        (KeyMode::Minor, 0) => &[(3, "maj7", 1, "III is the relative-major tonic substitute")],
        (KeyMode::Minor, 5) => &[(2, "m7b5", 1, "ii half-diminished is the minor-key predominant")],
        (KeyMode::Minor, 7) => &[(11, "dim7", 2, "the leading-tone diminished shares dominant function")],
        _ => &[],
    }
}

/// Same-function chords of the key sharing at least two tones with `chord`.
pub fn diatonic_substitutes(chord: &ChordSymbol, key: &Key) -> Vec<Suggestion> {
    let degree = interval(key.tonic, chord.root);
    let sharps = key.prefer_sharps();
    diatonic_rules(key.mode, degree)
        .iter()
        .filter_map(|&(iv, quality, level, why)| {
            let sub = make(transpose(key.tonic, iv as i32), quality, sharps);
            suggest(chord, sub, Technique::DiatonicSubstitution, Placement::Replace, level, why)
        })
        .filter(|s| s.replacement.common_tones(chord) >= 2)
        .collect()
}

/// (degree the borrowed chord stands in for, borrowed interval, quality, explanation)
type BorrowRule = (u8, u8, &'static str, &'static str);

const MAJOR_KEY_BORROWINGS: [BorrowRule; 8] = [
    (0, 3, "maj7", "bIII from the parallel minor"),
    (4, 3, "maj7", "bIII from the parallel minor"),
    (5, 8, "maj7", "bVI from the parallel minor"),
    (9, 8, "maj7", "bVI from the parallel minor"),
    (7, 10, "7", "bVII7 from mixolydian"),
    (11, 10, "7", "bVII7 from mixolydian"),
    (5, 5, "m7", "minor iv darkens the predominant"),
    (2, 5, "m7", "minor iv darkens the predominant"),
];

const MINOR_KEY_BORROWINGS: [BorrowRule; 2] = [
    (0, 0, "maj7", "major tonic from the parallel major"),
    (5, 5, "7", "dorian IV7 from the parallel major"),
];

/// Parallel-mode chords standing in for `chord`'s degree.
pub fn modal_interchange(chord: &ChordSymbol, key: &Key) -> Vec<Suggestion> {
    let degree = interval(key.tonic, chord.root);
    let rules: &[BorrowRule] = match key.mode {
        KeyMode::Major => &MAJOR_KEY_BORROWINGS,
        KeyMode::Minor => &MINOR_KEY_BORROWINGS,
    };
    rules
        .iter()
        .filter(|r| r.0 == degree)
        .filter_map(|&(_, iv, quality, why)| {
            let sub = make(transpose(key.tonic, iv as i32), quality, false);
            suggest(chord, sub, Technique::ModalInterchange, Placement::Replace, 2, why)
        })
        .filter(|s| s.replacement != *chord)
        .collect()
}

// ---------------------------------------------------------------------------
// Pair techniques
// ---------------------------------------------------------------------------

/// Chords to insert between `from` and `to`: a dominant a half step below
/// `to`, a diminished seventh a half step above `from` when the roots rise
/// a whole step, and the secondary dominant of `to`.
pub fn passing_chords(from: &ChordSymbol, to: &ChordSymbol) -> Vec<Suggestion> {
    let motion = interval(from.root, to.root);
    if motion == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();

    let approach_root = transpose(to.root, -1);
    if approach_root != from.root {
        let approach = make(approach_root, "7", false);
        out.extend(suggest(
            from,
            approach,
            Technique::ChromaticApproach,
            Placement::InsertAfter,
            3,
            format!("chromatic approach a half step below {}", to.name()),
        ));
    }

    if motion == 2 {
        let passing = make(transpose(from.root, 1), "dim7", true);
        out.extend(suggest(
            from,
            passing,
            Technique::DiminishedPassing,
            Placement::InsertAfter,
            3,
            "chromatic diminished passing chord",
        ));
    }

    let secondary_root = transpose(to.root, 7);
    if secondary_root != from.root {
        let secondary = make(secondary_root, "7", from.prefer_sharps);
        out.extend(suggest(
            from,
            secondary,
            Technique::SecondaryDominant,
            Placement::InsertAfter,
            2,
            format!("secondary dominant of {}", to.name()),
        ));
    }
    out
}

/// bVII7 of `next` in place of a dominant that resolves up a fourth to it.
pub fn backdoor_substitution(chord: &ChordSymbol, next: &ChordSymbol) -> Option<Suggestion> {
    if !chord.is_dominant() || interval(chord.root, next.root) != 5 {
        return None;
    }
    let sub = make(transpose(next.root, -2), "7", false);
    let explanation = format!("backdoor resolution into {}", next.name());
    suggest(chord, sub, Technique::Backdoor, Placement::Replace, 4, explanation)
}

/// Every suggestion at position `index` up to `max_level`.
pub fn suggestions_at(chords: &[ChordSymbol], index: usize, key: &Key, max_level: u8) -> Vec<Suggestion> {
    let Some(chord) = chords.get(index) else {
        return Vec::new();
    };
    let next = chords.get(index + 1);
    let mut out: Vec<Suggestion> = Vec::new();

    out.extend(tritone_sub(chord));
    out.extend(diatonic_substitutes(chord, key));
    if max_level >= 2 {
        out.extend(modal_interchange(chord, key));
    }
    if let Some(next) = next {
        out.extend(backdoor_substitution(chord, next));
        if max_level >= 3 {
            out.extend(passing_chords(chord, next));
        }
    }
    out.retain(|s| s.level <= max_level);
    out
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Per-axis scores, each 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub voice_leading: f64,
    pub harmonic_function: f64,
    pub parsimony: f64,
    pub genre: f64,
    pub complexity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReharmonizationCandidate {
    /// Position the suggestion was made for.
    pub index: usize,
    pub suggestion: Suggestion,
    pub scores: ScoreBreakdown,
    /// Weighted sum of `scores`.
    pub score: f64,
}

const SCORING_OCTAVE: i32 = 4;

fn voiced(chord: &ChordSymbol, previous: Option<&[u8]>, policy: &VoiceLeadingPolicy) -> Option<Vec<u8>> {
    voice_leading::chord_voicing(chord, previous, SCORING_OCTAVE, policy).ok()
}

/// Mean smoothness of prev -> new and new -> next, each voiced with the
/// optimizer. Without neighbours, the smoothness of original -> new.
fn voice_leading_score(
    previous: Option<&ChordSymbol>,
    new: &ChordSymbol,
    next: Option<&ChordSymbol>,
    original: &ChordSymbol,
    policy: &VoiceLeadingPolicy,
) -> f64 {
    let prev_voicing = previous.and_then(|p| voiced(p, None, policy));
    let Some(new_voicing) = voiced(new, prev_voicing.as_deref(), policy) else {
        return 0.5;
    };
    let mut scores = Vec::new();
    if let Some(pv) = &prev_voicing {
        scores.push(voice_leading::compare_voicings(pv, &new_voicing).smoothness);
    }
    if let Some(nv) = next.and_then(|n| voiced(n, Some(&new_voicing), policy)) {
        scores.push(voice_leading::compare_voicings(&new_voicing, &nv).smoothness);
    }
    if scores.is_empty() {
        return voice_leading::analyze_voice_leading(original, new).smoothness;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn function_relation(from: HarmonicFunction, to: HarmonicFunction) -> f64 {
    use HarmonicFunction::*;
    if from == to {
        return 1.0;
    }
    match (from, to) {
        (Tonic, Subdominant)
        | (Subdominant, Tonic)
        | (Subdominant, Dominant)
        | (Dominant, Subdominant)
        | (Dominant, SecondaryDominant)
        | (SecondaryDominant, Dominant) => 0.7,
        _ => 0.4,
    }
}

/// An inserted chord is judged by whether it resolves into what follows:
/// up a fourth or a half step.
fn resolution_score(inserted: &ChordSymbol, next: Option<&ChordSymbol>) -> f64 {
    match next.map(|n| interval(inserted.root, n.root)) {
        Some(5) | Some(1) => 1.0,
        Some(_) => 0.4,
        None => 0.5,
    }
}

fn parsimony(a: &ChordSymbol, b: &ChordSymbol) -> f64 {
    let size = a.notes().len().max(b.notes().len());
    if size == 0 {
        return 0.0;
    }
    a.common_tones(b) as f64 / size as f64
}

/// Score one suggestion in context.
pub fn score_suggestion(
    chords: &[ChordSymbol],
    index: usize,
    suggestion: Suggestion,
    key: &Key,
    genre: Genre,
    config: &HarmonyConfig,
) -> ReharmonizationCandidate {
    let policy = config.voice_leading_policy(genre);
    let new = &suggestion.replacement;
    let (previous, next, reference) = match suggestion.placement {
        Placement::Replace => (
            index.checked_sub(1).and_then(|i| chords.get(i)),
            chords.get(index + 1),
            &suggestion.original,
        ),
        // Sits between `index` and `index + 1`; parsimony is measured
        // against the chord it approaches.
        Placement::InsertAfter => (
            chords.get(index),
            chords.get(index + 1),
            chords.get(index + 1).unwrap_or(&suggestion.original),
        ),
    };

    let harmonic_function = match suggestion.placement {
        Placement::Replace if suggestion.technique.preserves_function() => 1.0,
        Placement::Replace => function_relation(
            function::analyze_chord_function(&suggestion.original, key).function,
            function::analyze_chord_function(new, key).function,
        ),
        Placement::InsertAfter => resolution_score(new, next),
    };

    let scores = ScoreBreakdown {
        voice_leading: voice_leading_score(previous, new, next, &suggestion.original, &policy),
        harmonic_function,
        parsimony: parsimony(reference, new),
        genre: config.appropriateness(genre, suggestion.technique),
        complexity: config.complexity(suggestion.technique),
    };
    let w = config.score_weights(genre);
    let score = w.voice_leading * scores.voice_leading
        + w.harmonic_function * scores.harmonic_function
        + w.parsimony * scores.parsimony
        + w.genre * scores.genre
        + w.complexity * scores.complexity;

    ReharmonizationCandidate { index, suggestion, scores, score }
}

// ---------------------------------------------------------------------------
// Progression pass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reharmonization {
    pub key: Key,
    pub genre: Genre,
    pub max_level: u8,
    pub original: Vec<ChordSymbol>,
    /// Sorted by position, best score first within a position.
    pub candidates: Vec<ReharmonizationCandidate>,
}

impl Reharmonization {
    /// Candidates made for position `index`, best first.
    pub fn at(&self, index: usize) -> impl Iterator<Item = &ReharmonizationCandidate> {
        self.candidates.iter().filter(move |c| c.index == index)
    }

    /// Highest-scoring candidate per (position, placement) at or above
    /// `min_score`.
    pub fn best_choices(&self, min_score: f64) -> Vec<&ReharmonizationCandidate> {
        let mut best: BTreeMap<(usize, Placement), &ReharmonizationCandidate> = BTreeMap::new();
        for c in self.candidates.iter().filter(|c| c.score >= min_score) {
            let slot = best.entry((c.index, c.suggestion.placement)).or_insert(c);
            if c.score > slot.score {
                *slot = c;
            }
        }
        best.into_values().collect()
    }

    /// The progression with the best choices at or above `min_score` applied.
    pub fn apply_best(&self, min_score: f64) -> Vec<ChordSymbol> {
        apply(&self.original, &self.best_choices(min_score))
    }
}

/// Equal up to spelling.
fn same_chord(a: &ChordSymbol, b: &ChordSymbol) -> bool {
    a.root == b.root && a.quality == b.quality && a.bass == b.bass
}

/// Run every technique at every position, score, de-duplicate and sort.
///
/// `key` is estimated when absent; `None` only for an empty progression.
/// Suggestions above `max_level` are dropped.
pub fn reharmonize_progression(
    chords: &[ChordSymbol],
    key: Option<Key>,
    genre: Genre,
    max_level: u8,
    config: &HarmonyConfig,
) -> Option<Reharmonization> {
    let key = key.or_else(|| key::estimate_key(chords).map(|e| e.key))?;

    let mut candidates: Vec<ReharmonizationCandidate> = Vec::new();
    for index in 0..chords.len() {
        for s in suggestions_at(chords, index, &key, max_level) {
            let scored = score_suggestion(chords, index, s, &key, genre, config);
            let duplicate = candidates.iter_mut().find(|c| {
                c.index == index
                    && c.suggestion.placement == scored.suggestion.placement
                    && same_chord(&c.suggestion.replacement, &scored.suggestion.replacement)
            });
            match duplicate {
                Some(existing) if existing.score >= scored.score => {}
                Some(existing) => *existing = scored,
                None => candidates.push(scored),
            }
        }
    }
    candidates.sort_by(|a, b| a.index.cmp(&b.index).then(b.score.total_cmp(&a.score)));
    log::debug!(
        "reharmonized {} chords in {key} for {}: {} candidates",
        chords.len(),
        genre.name(),
        candidates.len()
    );

    Some(Reharmonization {
        key,
        genre,
        max_level,
        original: chords.to_vec(),
        candidates,
    })
}

/// Apply chosen candidates: a `Replace` swaps the chord at its position
/// (first one wins), `InsertAfter` chords follow their position in the
/// order given.
pub fn apply(chords: &[ChordSymbol], chosen: &[&ReharmonizationCandidate]) -> Vec<ChordSymbol> {
    let mut out = Vec::with_capacity(chords.len() + chosen.len());
    for (i, chord) in chords.iter().enumerate() {
        let replacement = chosen
            .iter()
            .find(|c| c.index == i && c.suggestion.placement == Placement::Replace);
        out.push(replacement.map_or_else(|| chord.clone(), |c| c.suggestion.replacement.clone()));
        out.extend(
            chosen
                .iter()
                .filter(|c| c.index == i && c.suggestion.placement == Placement::InsertAfter)
                .map(|c| c.suggestion.replacement.clone()),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::parse_progression;

    fn c(s: &str) -> ChordSymbol {
        ChordSymbol::parse(s).unwrap()
    }

    fn names(suggestions: &[Suggestion]) -> Vec<String> {
        suggestions.iter().map(|s| s.replacement.name()).collect()
    }

    #[test]
    fn test_tritone_sub_dominants_only() {
        let sub = tritone_sub(&c("G7")).unwrap();
        assert_eq!(sub.replacement.name(), "Db7");
        assert_eq!(sub.replacement.root, 1);
        assert_eq!(sub.level, 3);
        assert_eq!(tritone_sub(&c("G9")).unwrap().replacement.name(), "Db9");
        assert!(tritone_sub(&c("Cmaj7")).is_none());
        assert!(tritone_sub(&c("Dm7")).is_none());
    }

    #[test]
    fn test_diatonic_substitutes_major() {
        let key = Key::major(0);
        assert_eq!(names(&diatonic_substitutes(&c("C"), &key)), vec!["Am7", "Em7"]);
        assert_eq!(names(&diatonic_substitutes(&c("F"), &key)), vec!["Dm7"]);
        assert_eq!(names(&diatonic_substitutes(&c("Dm"), &key)), vec!["Fmaj7"]);
        assert_eq!(names(&diatonic_substitutes(&c("G7"), &key)), vec!["Bm7b5"]);
        assert!(diatonic_substitutes(&c("E"), &key).is_empty());
    }

    #[test]
    fn test_diatonic_substitutes_minor() {
        let key = Key::minor(9);
        assert_eq!(names(&diatonic_substitutes(&c("Am"), &key)), vec!["Cmaj7"]);
        assert_eq!(names(&diatonic_substitutes(&c("E7"), &key)), vec!["G#dim7"]);
    }

    #[test]
    fn test_every_diatonic_substitute_shares_two_tones() {
        for key in [Key::major(0), Key::major(7), Key::minor(2)] {
            for chord in parse_progression(&["C", "Dm", "F", "G7", "Am", "Bb", "E7"]).unwrap() {
                for s in diatonic_substitutes(&chord, &key) {
                    assert!(s.replacement.common_tones(&chord) >= 2, "{} -> {}", chord, s.replacement);
                }
            }
        }
    }

    #[test]
    fn test_modal_interchange() {
        let key = Key::major(0);
        let subs = modal_interchange(&c("F"), &key);
        assert_eq!(names(&subs), vec!["Abmaj7", "Fm7"]);
        assert!(subs.iter().all(|s| s.level == 2));
        assert_eq!(names(&modal_interchange(&c("G7"), &key)), vec!["Bb7"]);
        assert_eq!(names(&modal_interchange(&c("Am"), &Key::minor(9))), vec!["Amaj7"]);
    }

    #[test]
    fn test_passing_chords_on_whole_step() {
        let subs = passing_chords(&c("C"), &c("Dm7"));
        assert_eq!(names(&subs), vec!["Db7", "C#dim7", "A7"]);
        assert!(subs.iter().all(|s| s.placement == Placement::InsertAfter));
        assert_eq!(subs[1].technique, Technique::DiminishedPassing);
    }

    #[test]
    fn test_passing_chords_skip_degenerate() {
        // From a fourth below, the secondary dominant is the first chord itself.
        let subs = passing_chords(&c("G7"), &c("C"));
        assert_eq!(names(&subs), vec!["B7"]);
        assert!(passing_chords(&c("C"), &c("Cm")).is_empty());
    }

    #[test]
    fn test_backdoor() {
        let sub = backdoor_substitution(&c("G7"), &c("Cmaj7")).unwrap();
        assert_eq!(sub.replacement.name(), "Bb7");
        assert_eq!(sub.level, 4);
        assert!(backdoor_substitution(&c("G7"), &c("Am")).is_none());
        assert!(backdoor_substitution(&c("Gmaj7"), &c("C")).is_none());
    }

    #[test]
    fn test_level_gating() {
        let chords = parse_progression(&["Dm7", "G7", "Cmaj7"]).unwrap();
        let key = Key::major(0);
        let plain = suggestions_at(&chords, 1, &key, 1);
        assert!(plain.iter().all(|s| s.level <= 1));
        assert!(!plain.iter().any(|s| s.technique == Technique::TritoneSubstitution));
        let all = suggestions_at(&chords, 1, &key, 5);
        assert!(all.iter().any(|s| s.technique == Technique::TritoneSubstitution));
        assert!(all.iter().any(|s| s.technique == Technique::Backdoor));
        assert!(all.iter().any(|s| s.technique == Technique::ChromaticApproach));
        assert!(suggestions_at(&chords, 7, &key, 5).is_empty());
    }

    #[test]
    fn test_reharmonize_progression() {
        let chords = parse_progression(&["Dm7", "G7", "Cmaj7"]).unwrap();
        let config = HarmonyConfig::default();
        let r = reharmonize_progression(&chords, None, Genre::Jazz, 5, &config).unwrap();
        assert_eq!(r.key, Key::major(0));
        let at_dominant: Vec<_> = r.at(1).collect();
        assert!(at_dominant.iter().any(|c| c.suggestion.replacement.name() == "Db7"));
        for pair in at_dominant.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        let weights = config.score_weights(Genre::Jazz);
        let max = weights.voice_leading + weights.harmonic_function + weights.parsimony + weights.genre + weights.complexity;
        for c in &r.candidates {
            assert!(c.score >= 0.0 && c.score <= max + 1e-9);
            assert!(c.suggestion.level <= 5);
        }
        let mut seen = std::collections::HashSet::new();
        for c in &r.candidates {
            assert!(seen.insert((c.index, c.suggestion.placement, c.suggestion.replacement.name())));
        }
    }

    #[test]
    fn test_tritone_sub_keeps_function_score() {
        let chords = parse_progression(&["Dm7", "G7", "Cmaj7"]).unwrap();
        let config = HarmonyConfig::default();
        let key = Key::major(0);
        let sub = tritone_sub(&chords[1]).unwrap();
        let scored = score_suggestion(&chords, 1, sub, &key, Genre::Jazz, &config);
        assert_eq!(scored.scores.harmonic_function, 1.0);
        assert_eq!(scored.scores.genre, 1.0);
        assert!(scored.scores.voice_leading > 0.0);
    }

    #[test]
    fn test_empty_progression() {
        assert!(reharmonize_progression(&[], None, Genre::Jazz, 5, &HarmonyConfig::default()).is_none());
    }

    #[test]
    fn test_apply() {
        let chords = parse_progression(&["Dm7", "G7", "Cmaj7"]).unwrap();
        let key = Key::major(0);
        let config = HarmonyConfig::default();
        let tritone = score_suggestion(&chords, 1, tritone_sub(&chords[1]).unwrap(), &key, Genre::Jazz, &config);
        let approach = passing_chords(&chords[0], &chords[1]).remove(0);
        let approach = score_suggestion(&chords, 0, approach, &key, Genre::Jazz, &config);
        let out = apply(&chords, &[&tritone, &approach]);
        let names: Vec<String> = out.iter().map(ChordSymbol::name).collect();
        assert_eq!(names, vec!["Dm7", "Gb7", "Db7", "Cmaj7"]);
    }

    #[test]
    fn test_apply_best_keeps_length_without_choices() {
        let chords = parse_progression(&["C", "F", "G7", "C"]).unwrap();
        let r = reharmonize_progression(&chords, Some(Key::major(0)), Genre::Gospel, 5, &HarmonyConfig::default()).unwrap();
        assert_eq!(r.apply_best(f64::INFINITY), chords);
        assert!(r.apply_best(0.0).len() >= chords.len());
    }
}
