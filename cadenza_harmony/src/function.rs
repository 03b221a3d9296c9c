// Harmonic function analysis.
//
// Maps each chord to a function tag and roman numeral relative to a key.
// Lookup order for a single chord:
// 1. Secondary dominant: a non-diatonic dominant-family chord whose root
//    lies a fifth above a diatonic, non-diminished degree other than the
//    tonic ("V/ii", "V/V", ...).
// 2. Diatonic table entry for the root's interval from the tonic, when the
//    quality family fits (or is unspecified, at reduced confidence).
// 3. Borrowed chords from the parallel mode, plus the Neapolitan.
// 4. Chromatic fallback with an accidental-bearing numeral.
//
// `analyze_functions` runs that per chord and summarizes the progression:
// function counts, diatonic ratio, secondary-dominant count, and a coarse
// harmonic-rhythm label from the T/S/D flow.

use crate::chord::{ChordSymbol, QualityFamily};
use crate::key::{self, Key, KeyEstimate};
use crate::pitch::{self, KeyMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicFunction {
    Tonic,
    Subdominant,
    Dominant,
    SecondaryDominant,
    Borrowed,
    Chromatic,
}

impl HarmonicFunction {
    pub fn tag(self) -> &'static str {
        match self {
            HarmonicFunction::Tonic => "T",
            HarmonicFunction::Subdominant => "S",
            HarmonicFunction::Dominant => "D",
            HarmonicFunction::SecondaryDominant => "V/x",
            HarmonicFunction::Borrowed => "borrowed",
            HarmonicFunction::Chromatic => "chromatic",
        }
    }
}

/// Which quality families a table entry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Major,
    Minor,
    DominantOrMajor,
    Diminished,
}

impl Expect {
    fn accepts(self, family: QualityFamily) -> bool {
        match self {
            Expect::Major => family == QualityFamily::Major,
            Expect::Minor => family == QualityFamily::Minor,
            Expect::DominantOrMajor => {
                matches!(family, QualityFamily::Major | QualityFamily::Dominant)
            }
            Expect::Diminished => matches!(
                family,
                QualityFamily::Diminished | QualityFamily::HalfDiminished
            ),
        }
    }
}

struct Degree {
    interval: u8,
    roman: &'static str,
    function: HarmonicFunction,
    expect: Expect,
}

const fn degree(interval: u8, roman: &'static str, function: HarmonicFunction, expect: Expect) -> Degree {
    Degree {
        interval,
        roman,
        function,
        expect,
    }
}

const MAJOR_DEGREES: [Degree; 7] = [
    degree(0, "I", HarmonicFunction::Tonic, Expect::Major),
    degree(2, "ii", HarmonicFunction::Subdominant, Expect::Minor),
    degree(4, "iii", HarmonicFunction::Tonic, Expect::Minor),
    degree(5, "IV", HarmonicFunction::Subdominant, Expect::Major),
    degree(7, "V", HarmonicFunction::Dominant, Expect::DominantOrMajor),
    degree(9, "vi", HarmonicFunction::Tonic, Expect::Minor),
    degree(11, "vii°", HarmonicFunction::Dominant, Expect::Diminished),
];

const MINOR_DEGREES: [Degree; 7] = [
    degree(0, "i", HarmonicFunction::Tonic, Expect::Minor),
    degree(2, "ii°", HarmonicFunction::Subdominant, Expect::Diminished),
    degree(3, "III", HarmonicFunction::Tonic, Expect::Major),
    degree(5, "iv", HarmonicFunction::Subdominant, Expect::Minor),
    degree(7, "V", HarmonicFunction::Dominant, Expect::DominantOrMajor),
    degree(8, "VI", HarmonicFunction::Subdominant, Expect::Major),
    degree(10, "VII", HarmonicFunction::Dominant, Expect::DominantOrMajor),
];

fn degrees(mode: KeyMode) -> &'static [Degree; 7] {
    match mode {
        KeyMode::Major => &MAJOR_DEGREES,
        KeyMode::Minor => &MINOR_DEGREES,
    }
}

/// Borrowed chords: (interval, numeral, source, family the chord must have).
/// `None` accepts any family.
type Borrowing = (u8, &'static str, &'static str, Option<Expect>);

const MAJOR_BORROWINGS: [Borrowing; 5] = [
    (1, "♭II", "Neapolitan", None),
    (3, "♭III", "parallel minor", None),
    (5, "iv", "parallel minor", Some(Expect::Minor)),
    (8, "♭VI", "parallel minor", None),
    (10, "♭VII", "parallel minor/Mixolydian", None),
];

const MINOR_BORROWINGS: [Borrowing; 3] = [
    (0, "I", "parallel major (Picardy third)", Some(Expect::Major)),
    (1, "♭II", "Neapolitan", None),
    (5, "IV", "parallel major/Dorian", Some(Expect::Major)),
];

const CHROMATIC_NUMERALS: [&str; 12] = [
    "I", "♭II", "II", "♭III", "III", "IV", "♯IV", "V", "♭VI", "VI", "♭VII", "VII",
];

/// Confidence of a match made without knowing the chord's quality.
const UNSPECIFIED_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicFunctionResult {
    pub chord: ChordSymbol,
    pub roman: String,
    pub function: HarmonicFunction,
    pub detail: String,
    pub diatonic: bool,
    /// Numeral of the degree a secondary dominant resolves to.
    pub applied_to: Option<String>,
    pub confidence: f64,
}

fn secondary_target(chord: &ChordSymbol, key: &Key) -> Option<&'static str> {
    if !chord.is_dominant() || key.is_diatonic(chord) {
        return None;
    }
    let target = pitch::interval(key.tonic, pitch::transpose(chord.root, 5));
    degrees(key.mode)
        .iter()
        .find(|d| d.interval == target && d.interval != 0 && d.expect != Expect::Diminished)
        .map(|d| d.roman)
}

fn chromatic_numeral(interval: u8, family: QualityFamily) -> String {
    let numeral = CHROMATIC_NUMERALS[(interval % 12) as usize];
    if family.is_minor_like() {
        numeral.to_lowercase()
    } else {
        numeral.to_string()
    }
}

/// Function of a single chord in `key`.
pub fn analyze_chord_function(chord: &ChordSymbol, key: &Key) -> HarmonicFunctionResult {
    let interval = pitch::interval(key.tonic, chord.root);
    let family = chord.family();
    let result = |roman: String, function: HarmonicFunction, detail: String, diatonic: bool| {
        HarmonicFunctionResult {
            chord: chord.clone(),
            roman,
            function,
            detail,
            diatonic,
            applied_to: None,
            confidence: 1.0,
        }
    };

    if let Some(target) = secondary_target(chord, key) {
        let mut r = result(
            format!("V/{target}"),
            HarmonicFunction::SecondaryDominant,
            format!("secondary dominant to {target}"),
            false,
        );
        r.applied_to = Some(target.to_string());
        return r;
    }

    if let Some(d) = degrees(key.mode).iter().find(|d| d.interval == interval) {
        if family == QualityFamily::Unspecified {
            let mut r = result(
                d.roman.to_string(),
                d.function,
                format!("{} function (quality unspecified)", d.function.tag()),
                true,
            );
            r.confidence = UNSPECIFIED_CONFIDENCE;
            return r;
        }
        if d.expect.accepts(family) {
            return result(
                d.roman.to_string(),
                d.function,
                format!("{} function", d.function.tag()),
                true,
            );
        }
    }

    let borrowings: &[Borrowing] = match key.mode {
        KeyMode::Major => &MAJOR_BORROWINGS,
        KeyMode::Minor => &MINOR_BORROWINGS,
    };
    let borrowed = borrowings
        .iter()
        .find(|(iv, _, _, expect)| *iv == interval && expect.is_none_or(|e| e.accepts(family)));
    if let Some((_, roman, source, _)) = borrowed {
        return result(
            roman.to_string(),
            HarmonicFunction::Borrowed,
            format!("borrowed from {source}"),
            false,
        );
    }

    let mut r = result(
        chromatic_numeral(interval, family),
        HarmonicFunction::Chromatic,
        "chromatic chord".to_string(),
        false,
    );
    if family == QualityFamily::Unspecified {
        r.confidence = UNSPECIFIED_CONFIDENCE;
    }
    r
}

// ---------------------------------------------------------------------------
// Progression summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicRhythm {
    ClassicalCadence,
    SimpleResolution,
    Cadential,
    PlagalMotion,
    Resolving,
    BuildingTension,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionAnalysis {
    pub key: Key,
    /// Set when the key was estimated rather than supplied.
    pub key_estimate: Option<KeyEstimate>,
    pub chords: Vec<HarmonicFunctionResult>,
    pub distribution: BTreeMap<HarmonicFunction, usize>,
    /// Fraction of chords that are diatonic, 0-1.
    pub diatonic_ratio: f64,
    pub secondary_dominants: usize,
    pub sequence: Vec<HarmonicFunction>,
    pub rhythm: HarmonicRhythm,
}

/// Label the T/S/D flow. The last four functions (or all of them, if
/// fewer) are matched against fixed shapes first; otherwise the label comes
/// from which transitions occur anywhere in the sequence.
pub fn classify_rhythm(sequence: &[HarmonicFunction]) -> HarmonicRhythm {
    use HarmonicFunction::{Dominant as D, Subdominant as S, Tonic as T};
    let tail = &sequence[sequence.len().saturating_sub(4)..];
    match tail {
        [T, S, D, T] => return HarmonicRhythm::ClassicalCadence,
        [T, D, T] => return HarmonicRhythm::SimpleResolution,
        [S, D, T] => return HarmonicRhythm::Cadential,
        [T, S, T] => return HarmonicRhythm::PlagalMotion,
        _ => {}
    }
    let has = |a: HarmonicFunction, b: HarmonicFunction| {
        sequence.windows(2).any(|w| w[0] == a && w[1] == b)
    };
    if has(D, T) {
        HarmonicRhythm::Resolving
    } else if has(S, D) {
        HarmonicRhythm::BuildingTension
    } else {
        HarmonicRhythm::Static
    }
}

/// Analyze every chord against `key`, estimating the key when `None`.
/// Returns `None` for an empty progression.
pub fn analyze_functions(chords: &[ChordSymbol], key: Option<Key>) -> Option<FunctionAnalysis> {
    let (key, key_estimate) = match key {
        Some(k) => (k, None),
        None => {
            let est = key::estimate_key(chords)?;
            (est.key, Some(est))
        }
    };
    if chords.is_empty() {
        return None;
    }

    let results: Vec<HarmonicFunctionResult> = chords
        .iter()
        .map(|c| analyze_chord_function(c, &key))
        .collect();
    let mut distribution = BTreeMap::new();
    for r in &results {
        *distribution.entry(r.function).or_insert(0) += 1;
    }
    let diatonic = results.iter().filter(|r| r.diatonic).count();
    let secondary_dominants = results
        .iter()
        .filter(|r| r.function == HarmonicFunction::SecondaryDominant)
        .count();
    let sequence: Vec<HarmonicFunction> = results.iter().map(|r| r.function).collect();

    Some(FunctionAnalysis {
        key,
        key_estimate,
        diatonic_ratio: diatonic as f64 / results.len() as f64,
        secondary_dominants,
        rhythm: classify_rhythm(&sequence),
        sequence,
        distribution,
        chords: results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::parse_progression;

    fn func(symbol: &str, key: &str) -> HarmonicFunctionResult {
        analyze_chord_function(
            &ChordSymbol::parse_lenient(symbol).unwrap(),
            &Key::parse(key).unwrap(),
        )
    }

    #[test]
    fn test_diatonic_functions_in_major() {
        let r = func("Cmaj7", "C");
        assert_eq!((r.roman.as_str(), r.function), ("I", HarmonicFunction::Tonic));
        assert!(r.diatonic);
        assert_eq!(func("Dm7", "C").roman, "ii");
        assert_eq!(func("G7", "C").function, HarmonicFunction::Dominant);
        assert_eq!(func("Bm7b5", "C").roman, "vii°");
        assert_eq!(func("Am", "C").function, HarmonicFunction::Tonic);
    }

    #[test]
    fn test_diatonic_functions_in_minor() {
        assert_eq!(func("Am7", "Am").roman, "i");
        assert_eq!(func("E7", "Am").roman, "V");
        assert_eq!(func("Fmaj7", "Am").function, HarmonicFunction::Subdominant);
        assert_eq!(func("Bm7b5", "Am").roman, "ii°");
    }

    #[test]
    fn test_secondary_dominants() {
        let r = func("D7", "C");
        assert_eq!(r.function, HarmonicFunction::SecondaryDominant);
        assert_eq!(r.roman, "V/V");
        assert_eq!(r.applied_to.as_deref(), Some("V"));
        assert_eq!(func("E7", "C").roman, "V/vi");
        assert_eq!(func("A7", "C").roman, "V/ii");
        // C7 is the tonic made dominant: it points at IV.
        assert_eq!(func("C7", "C").roman, "V/IV");
        // F#7 would target vii°, which cannot be tonicized.
        assert_eq!(func("F#7", "C").function, HarmonicFunction::Chromatic);
    }

    #[test]
    fn test_borrowed_and_chromatic() {
        assert_eq!(func("Ab", "C").roman, "♭VI");
        assert_eq!(func("Bb7", "C").function, HarmonicFunction::Borrowed);
        assert_eq!(func("Fm", "C").roman, "iv");
        assert_eq!(func("Db", "C").detail, "borrowed from Neapolitan");
        assert_eq!(func("A", "Am").detail, "borrowed from parallel major (Picardy third)");
        let r = func("F#m", "C");
        assert_eq!(r.function, HarmonicFunction::Chromatic);
        assert_eq!(r.roman, "♯iv");
    }

    #[test]
    fn test_unknown_quality_degrades() {
        let r = func("Gwobble", "C");
        assert_eq!(r.roman, "V");
        assert!(r.confidence < 1.0);
    }

    #[test]
    fn test_progression_summary() {
        let chords = parse_progression(&["C", "F", "G7", "C"]).unwrap();
        let a = analyze_functions(&chords, None).unwrap();
        assert_eq!(a.key, Key::major(0));
        assert!(a.key_estimate.is_some());
        assert_eq!(a.rhythm, HarmonicRhythm::ClassicalCadence);
        assert!((a.diatonic_ratio - 1.0).abs() < 1e-9);
        assert_eq!(a.distribution[&HarmonicFunction::Tonic], 2);

        let chords = parse_progression(&["C", "A7", "Dm7", "G7", "C"]).unwrap();
        let a = analyze_functions(&chords, Some(Key::major(0))).unwrap();
        assert_eq!(a.secondary_dominants, 1);
        // The last four are V/x S D T, which is not a fixed shape.
        assert_eq!(a.rhythm, HarmonicRhythm::Resolving);

        let chords = parse_progression(&["Dm7", "G7", "C"]).unwrap();
        let a = analyze_functions(&chords, Some(Key::major(0))).unwrap();
        assert_eq!(a.rhythm, HarmonicRhythm::Cadential);
        assert!(analyze_functions(&[], None).is_none());
    }

    #[test]
    fn test_rhythm_from_transitions() {
        use HarmonicFunction::*;
        assert_eq!(
            classify_rhythm(&[Tonic, Dominant, Tonic, Tonic, Subdominant]),
            HarmonicRhythm::Resolving
        );
        assert_eq!(
            classify_rhythm(&[Subdominant, Dominant, Subdominant, Tonic, Tonic]),
            HarmonicRhythm::BuildingTension
        );
        assert_eq!(classify_rhythm(&[Tonic, Tonic]), HarmonicRhythm::Static);
    }
}
