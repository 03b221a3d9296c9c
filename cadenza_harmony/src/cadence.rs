// Cadence detection.
//
// Each consecutive pair of chords is compared with a fixed pattern table.
// A pattern names the roots of both chords as intervals from the tonic and,
// for each chord, which quality families it accepts. Matching is two-pass:
// the first pattern whose roots and qualities both agree wins with `Strong`
// strength; failing that, the first pattern whose roots agree is reported
// as `Weak`. A chord with an unspecified quality satisfies any quality
// requirement but caps the strength at `Moderate`.
//
// Positional rules on top of the table:
// - A half cadence needs V that is not immediately resolved to the tonic.
// - An authentic cadence whose tonic is inverted is imperfect, as is vii°→I.
// - A tonic 6/4 directly before an authentic cadence extends its range.
// - A progression that ends on V gets a closing half cadence if the pair
//   table did not already produce one.
//
// When no key is given it is estimated with `key::estimate_key`.

use crate::chord::{ChordSymbol, QualityFamily};
use crate::key::{self, Key, KeyEstimate};
use crate::pitch::{self, KeyMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceType {
    PerfectAuthentic,
    ImperfectAuthentic,
    Plagal,
    MinorPlagal,
    Deceptive,
    Half,
    PhrygianHalf,
    Backdoor,
}

impl CadenceType {
    pub fn name(self) -> &'static str {
        match self {
            CadenceType::PerfectAuthentic => "perfect authentic",
            CadenceType::ImperfectAuthentic => "imperfect authentic",
            CadenceType::Plagal => "plagal",
            CadenceType::MinorPlagal => "minor plagal",
            CadenceType::Deceptive => "deceptive",
            CadenceType::Half => "half",
            CadenceType::PhrygianHalf => "Phrygian half",
            CadenceType::Backdoor => "backdoor",
        }
    }

    /// Whether the cadence lands on the tonic.
    pub fn resolves_to_tonic(self) -> bool {
        matches!(
            self,
            CadenceType::PerfectAuthentic
                | CadenceType::ImperfectAuthentic
                | CadenceType::Plagal
                | CadenceType::MinorPlagal
                | CadenceType::Backdoor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    pub fn confidence(self) -> f64 {
        match self {
            Strength::Strong => 0.9,
            Strength::Moderate => 0.7,
            Strength::Weak => 0.5,
        }
    }
}

/// Quality requirement for one chord of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    Any,
    /// Dominant seventh family or a plain major triad.
    DominantLike,
    Dominant,
    Major,
    Minor,
    Diminished,
    /// Major in a major key, minor in a minor key.
    KeyQuality,
}

impl Want {
    fn accepts(self, family: QualityFamily, mode: KeyMode) -> bool {
        match self {
            Want::Any => true,
            Want::DominantLike => matches!(family, QualityFamily::Dominant | QualityFamily::Major),
            Want::Dominant => family == QualityFamily::Dominant,
            Want::Major => family == QualityFamily::Major,
            Want::Minor => family == QualityFamily::Minor,
            Want::Diminished => matches!(
                family,
                QualityFamily::Diminished | QualityFamily::HalfDiminished
            ),
            Want::KeyQuality => match mode {
                KeyMode::Major => family == QualityFamily::Major,
                KeyMode::Minor => family == QualityFamily::Minor,
            },
        }
    }
}

struct Pattern {
    cadence: CadenceType,
    /// Root of each chord above the tonic; `None` is any root.
    roots: [Option<u8>; 2],
    wants: [Want; 2],
    /// Restrict to one mode.
    mode: Option<KeyMode>,
}

const fn pattern(
    cadence: CadenceType,
    roots: [Option<u8>; 2],
    wants: [Want; 2],
    mode: Option<KeyMode>,
) -> Pattern {
    Pattern {
        cadence,
        roots,
        wants,
        mode,
    }
}

const PATTERNS: [Pattern; 9] = [
    pattern(
        CadenceType::PerfectAuthentic,
        [Some(7), Some(0)],
        [Want::DominantLike, Want::KeyQuality],
        None,
    ),
    pattern(
        CadenceType::ImperfectAuthentic,
        [Some(11), Some(0)],
        [Want::Diminished, Want::KeyQuality],
        None,
    ),
    pattern(
        CadenceType::Plagal,
        [Some(5), Some(0)],
        [Want::KeyQuality, Want::KeyQuality],
        None,
    ),
    pattern(
        CadenceType::MinorPlagal,
        [Some(5), Some(0)],
        [Want::Minor, Want::Major],
        Some(KeyMode::Major),
    ),
    pattern(
        CadenceType::Deceptive,
        [Some(7), Some(9)],
        [Want::DominantLike, Want::Minor],
        Some(KeyMode::Major),
    ),
    pattern(
        CadenceType::Deceptive,
        [Some(7), Some(8)],
        [Want::DominantLike, Want::Major],
        Some(KeyMode::Minor),
    ),
    pattern(
        CadenceType::Backdoor,
        [Some(10), Some(0)],
        [Want::Dominant, Want::KeyQuality],
        None,
    ),
    pattern(
        CadenceType::Half,
        [None, Some(7)],
        [Want::Any, Want::DominantLike],
        None,
    ),
    pattern(
        CadenceType::Half,
        [None, Some(7)],
        [Want::Any, Want::Any],
        None,
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceMatch {
    pub cadence: CadenceType,
    /// Index of the first chord of the cadence.
    pub start: usize,
    /// Index of the arrival chord.
    pub end: usize,
    pub strength: Strength,
    pub confidence: f64,
    pub key: Key,
    pub chords: Vec<ChordSymbol>,
}

fn root_matches(want: Option<u8>, chord: &ChordSymbol, key: &Key) -> bool {
    want.is_none_or(|iv| pitch::interval(key.tonic, chord.root) == iv)
}

fn is_root_position(chord: &ChordSymbol) -> bool {
    chord.bass.is_none_or(|b| b == chord.root)
}

/// Match one pair against the table. Returns the cadence and strength.
fn match_pair(first: &ChordSymbol, second: &ChordSymbol, key: &Key) -> Option<(CadenceType, Strength)> {
    let candidates: Vec<&Pattern> = PATTERNS
        .iter()
        .filter(|p| p.mode.is_none_or(|m| m == key.mode))
        .filter(|p| root_matches(p.roots[0], first, key) && root_matches(p.roots[1], second, key))
        .collect();

    let unspecified = first.family() == QualityFamily::Unspecified
        || second.family() == QualityFamily::Unspecified;
    let quality_ok = |p: &Pattern, chord: &ChordSymbol, i: usize| {
        chord.family() == QualityFamily::Unspecified || p.wants[i].accepts(chord.family(), key.mode)
    };

    let strong = candidates
        .iter()
        .find(|p| quality_ok(p, first, 0) && quality_ok(p, second, 1));
    if let Some(p) = strong {
        let strength = if unspecified {
            Strength::Moderate
        } else {
            Strength::Strong
        };
        return Some((p.cadence, strength));
    }
    candidates.first().map(|p| (p.cadence, Strength::Weak))
}

/// The bass of the earlier chord sits on the lowered sixth degree and the
/// later chord is V.
fn is_phrygian_half(first: &ChordSymbol, second: &ChordSymbol, key: &Key) -> bool {
    pitch::interval(key.tonic, first.bass_note()) == 8
        && matches!(first.family(), QualityFamily::Minor | QualityFamily::Major)
        && pitch::interval(key.tonic, second.root) == 7
        && Want::DominantLike.accepts(second.family(), key.mode)
}

fn is_tonic_six_four(chord: &ChordSymbol, key: &Key) -> bool {
    chord.root == key.tonic && chord.bass.is_some_and(|b| pitch::interval(key.tonic, b) == 7)
}

/// Find every cadence in `chords` relative to `key`.
pub fn detect_cadences(chords: &[ChordSymbol], key: &Key) -> Vec<CadenceMatch> {
    let mut found = Vec::new();
    let make = |cadence: CadenceType, start: usize, end: usize, strength: Strength| CadenceMatch {
        cadence,
        start,
        end,
        strength,
        confidence: strength.confidence(),
        key: *key,
        chords: chords[start..=end].to_vec(),
    };

    for i in 0..chords.len().saturating_sub(1) {
        let (first, second) = (&chords[i], &chords[i + 1]);

        if is_phrygian_half(first, second, key) {
            found.push(make(CadenceType::PhrygianHalf, i, i + 1, Strength::Strong));
            continue;
        }

        let Some((mut cadence, strength)) = match_pair(first, second, key) else {
            continue;
        };
        if cadence == CadenceType::Half {
            let resolved = chords
                .get(i + 2)
                .is_some_and(|next| pitch::interval(key.tonic, next.root) == 0);
            if resolved {
                continue;
            }
        }
        let mut start = i;
        if cadence == CadenceType::PerfectAuthentic {
            if !is_root_position(second) || !is_root_position(first) {
                cadence = CadenceType::ImperfectAuthentic;
            }
            if i > 0 && is_tonic_six_four(&chords[i - 1], key) {
                start = i - 1;
            }
        }
        found.push(make(cadence, start, i + 1, strength));
    }

    if let Some(last) = chords.last() {
        let end = chords.len() - 1;
        let ends_on_five = pitch::interval(key.tonic, last.root) == 7
            && Want::DominantLike.accepts(last.family(), key.mode);
        let already = found.iter().any(|c| c.end == end);
        if ends_on_five && !already {
            found.push(make(CadenceType::Half, end.saturating_sub(1), end, Strength::Moderate));
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closure {
    Closed,
    MostlyClosed,
    Open,
    Suspended,
    Ambiguous,
}

/// How final a passage sounds, judged by its last cadence.
pub fn closure(cadences: &[CadenceMatch]) -> Closure {
    let Some(last) = cadences.last() else {
        return Closure::Open;
    };
    match last.cadence {
        CadenceType::PerfectAuthentic if last.strength == Strength::Strong => Closure::Closed,
        CadenceType::PerfectAuthentic | CadenceType::ImperfectAuthentic => Closure::MostlyClosed,
        CadenceType::Plagal | CadenceType::MinorPlagal => Closure::Closed,
        CadenceType::Half | CadenceType::PhrygianHalf => Closure::Open,
        CadenceType::Deceptive => Closure::Suspended,
        CadenceType::Backdoor => Closure::Ambiguous,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceAnalysis {
    pub key: Key,
    pub key_estimate: Option<KeyEstimate>,
    pub cadences: Vec<CadenceMatch>,
    pub final_cadence: Option<CadenceType>,
    pub closure: Closure,
}

/// Detect cadences, estimating the key when `None`. Returns `None` for an
/// empty progression.
pub fn analyze_cadences(chords: &[ChordSymbol], key: Option<Key>) -> Option<CadenceAnalysis> {
    if chords.is_empty() {
        return None;
    }
    let (key, key_estimate) = match key {
        Some(k) => (k, None),
        None => {
            let est = key::estimate_key(chords)?;
            (est.key, Some(est))
        }
    };
    let cadences = detect_cadences(chords, &key);
    log::debug!("{} cadences in {} chords ({key})", cadences.len(), chords.len());
    Some(CadenceAnalysis {
        key,
        key_estimate,
        final_cadence: cadences.last().map(|c| c.cadence),
        closure: closure(&cadences),
        cadences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::parse_progression;

    fn detect(symbols: &[&str], key: &str) -> Vec<CadenceMatch> {
        detect_cadences(&parse_progression(symbols).unwrap(), &Key::parse(key).unwrap())
    }

    #[test]
    fn test_basic_cadences() {
        let c = detect(&["G7", "Cmaj7"], "C");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].cadence, CadenceType::PerfectAuthentic);
        assert_eq!(c[0].strength, Strength::Strong);
        assert_eq!((c[0].start, c[0].end), (0, 1));

        assert_eq!(detect(&["F", "C"], "C")[0].cadence, CadenceType::Plagal);
        assert_eq!(detect(&["G7", "Am7"], "C")[0].cadence, CadenceType::Deceptive);
        assert_eq!(detect(&["Fm", "C"], "C")[0].cadence, CadenceType::MinorPlagal);
        assert_eq!(detect(&["Bb7", "C"], "C")[0].cadence, CadenceType::Backdoor);
    }

    #[test]
    fn test_minor_key_cadences() {
        assert_eq!(detect(&["E7", "Am"], "Am")[0].cadence, CadenceType::PerfectAuthentic);
        assert_eq!(detect(&["Dm", "Am"], "Am")[0].cadence, CadenceType::Plagal);
        assert_eq!(detect(&["E7", "F"], "Am")[0].cadence, CadenceType::Deceptive);
        assert_eq!(detect(&["Dm7", "E7"], "Am")[0].cadence, CadenceType::Half);
        // VI to V puts the lowered sixth in the bass.
        assert_eq!(detect(&["Fmaj7", "E7"], "Am")[0].cadence, CadenceType::PhrygianHalf);
    }

    #[test]
    fn test_imperfect_authentic() {
        assert_eq!(detect(&["G7", "C/E"], "C")[0].cadence, CadenceType::ImperfectAuthentic);
        assert_eq!(detect(&["Bdim", "C"], "C")[0].cadence, CadenceType::ImperfectAuthentic);
    }

    #[test]
    fn test_half_cadence_only_when_unresolved() {
        let c = detect(&["Dm7", "G7", "C"], "C");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].cadence, CadenceType::PerfectAuthentic);

        let c = detect(&["C", "Am", "Dm7", "G7"], "C");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].cadence, CadenceType::Half);
        assert_eq!((c[0].start, c[0].end), (2, 3));
    }

    #[test]
    fn test_phrygian_half_and_six_four() {
        let c = detect(&["Fm/Ab", "G"], "Cm");
        assert_eq!(c[0].cadence, CadenceType::PhrygianHalf);

        let c = detect(&["F", "C/G", "G7", "C"], "C");
        let pac = c
            .iter()
            .find(|m| m.cadence == CadenceType::PerfectAuthentic)
            .unwrap();
        assert_eq!((pac.start, pac.end), (1, 3));
    }

    #[test]
    fn test_weak_and_unspecified_matches() {
        // Roots fit an authentic cadence but the arrival is minor in C.
        let c = detect(&["G7", "Cm"], "C");
        assert_eq!(c[0].strength, Strength::Weak);
        let c = detect(&["G7", "Cwhatever"], "C");
        assert_eq!(c[0].cadence, CadenceType::PerfectAuthentic);
        assert_eq!(c[0].strength, Strength::Moderate);
        assert!((c[0].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_analysis_and_closure() {
        let chords = parse_progression(&["Dm7", "G7", "Cmaj7"]).unwrap();
        let a = analyze_cadences(&chords, None).unwrap();
        assert_eq!(a.key, Key::major(0));
        assert_eq!(a.final_cadence, Some(CadenceType::PerfectAuthentic));
        assert_eq!(a.closure, Closure::Closed);

        let chords = parse_progression(&["C", "G7", "Am"]).unwrap();
        let a = analyze_cadences(&chords, Some(Key::major(0))).unwrap();
        assert_eq!(a.closure, Closure::Suspended);

        let a = analyze_cadences(&parse_progression(&["C", "C"]).unwrap(), None).unwrap();
        assert!(a.cadences.is_empty());
        assert_eq!(a.closure, Closure::Open);
        assert!(analyze_cadences(&[], None).is_none());
    }
}
