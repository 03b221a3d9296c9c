// Harmonic tension.
//
// A chord's tension in a key blends four factors, each 0-1:
// - quality: a fixed rating per chord quality (triads low, sevenths
//   higher, altered dominants highest);
// - root distance: a fixed rating of the root's interval above the tonic;
// - dissonance: the mean roughness of every pair of chord tones;
// - motion: chromatic or tritone root motion from the previous chord.
// The weights come from `TensionWeights`; a chord with any tone outside the
// key adds the non-diatonic penalty. The sum is capped at 1.
//
// The curve over a progression is classified by where its maximum falls
// (first third falling, last third rising, otherwise arch; flat when too
// short or too even), and counts resolutions: drops of at least 0.1 onto a
// near-zero value.

use crate::chord::{ChordQuality, ChordSymbol, QualityFamily};
use crate::config::TensionWeights;
use crate::key::{self, Key};
use crate::pitch::{self, interval};
use serde::{Deserialize, Serialize};

/// Below this a point counts as resolved.
const RESOLVED: f64 = 0.2;
/// Smallest drop onto a resolved point that counts as a resolution.
const RESOLUTION_DROP: f64 = 0.1;
/// A curve whose range is below this is flat.
const FLAT_RANGE: f64 = 0.1;

fn quality_tension(quality: &ChordQuality) -> f64 {
    match quality.symbol() {
        "" => 0.1,
        "m" => 0.15,
        "maj7" => 0.2,
        "m7" => 0.25,
        "7" => 0.4,
        "m7b5" => 0.5,
        "dim" => 0.55,
        "dim7" => 0.6,
        "aug" => 0.5,
        "7b9" | "7#9" => 0.7,
        "7alt" => 0.8,
        "7#5" | "7b5" => 0.6,
        "sus4" => 0.35,
        "sus2" => 0.3,
        _ => family_tension(quality.family()),
    }
}

fn family_tension(family: QualityFamily) -> f64 {
    match family {
        QualityFamily::Major => 0.2,
        QualityFamily::Minor => 0.25,
        QualityFamily::Dominant => 0.45,
        QualityFamily::HalfDiminished => 0.5,
        QualityFamily::Diminished => 0.55,
        QualityFamily::Augmented => 0.5,
        QualityFamily::Suspended => 0.35,
        QualityFamily::Power => 0.05,
        QualityFamily::Other | QualityFamily::Unspecified => 0.4,
    }
}

/// Tension of a root `i` semitones above the tonic.
const INTERVAL_TENSION: [f64; 12] = [0.0, 0.8, 0.4, 0.3, 0.35, 0.2, 0.9, 0.5, 0.4, 0.25, 0.45, 0.7];

fn pair_roughness(iv: u8) -> f64 {
    match iv {
        1 | 11 => 0.8,
        6 => 0.6,
        2 | 10 => 0.3,
        _ => 0.1,
    }
}

/// Mean roughness over all pairs of chord tones. An unknown quality,
/// which carries no tones beyond the root, rates 0.3.
pub fn dissonance(chord: &ChordSymbol) -> f64 {
    if !chord.quality.is_known() {
        return 0.3;
    }
    let notes = chord.notes();
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for (i, &a) in notes.iter().enumerate() {
        for &b in &notes[i + 1..] {
            sum += pair_roughness(interval(a, b));
            pairs += 1;
        }
    }
    if pairs == 0 { 0.0 } else { sum / pairs as f64 }
}

fn motion_tension(previous: Option<&ChordSymbol>, chord: &ChordSymbol) -> f64 {
    match previous.map(|p| interval(p.root, chord.root)) {
        Some(1) | Some(11) => 0.2,
        Some(6) => 0.3,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionPoint {
    pub index: usize,
    pub chord: ChordSymbol,
    /// Combined tension, 0-1.
    pub value: f64,
    pub quality: f64,
    pub root_distance: f64,
    pub dissonance: f64,
    pub motion: f64,
    pub non_diatonic: bool,
    /// Root's interval above the tonic.
    pub degree: u8,
    /// Root's distance from the tonic around the circle of fifths, 0-6.
    pub key_distance: u8,
}

/// Tension of `chord` in `key`, entered from `previous`.
pub fn chord_tension(
    chord: &ChordSymbol,
    key: &Key,
    previous: Option<&ChordSymbol>,
    weights: &TensionWeights,
) -> TensionPoint {
    let degree = interval(key.tonic, chord.root);
    let quality = quality_tension(&chord.quality);
    let root_distance = INTERVAL_TENSION[degree as usize];
    let dissonance = dissonance(chord);
    let motion = motion_tension(previous, chord);
    let non_diatonic = !key.is_diatonic(chord);

    let mut value = weights.quality * quality
        + weights.root_distance * root_distance
        + weights.dissonance * dissonance
        + weights.motion * motion;
    if non_diatonic {
        value += weights.non_diatonic_penalty;
    }

    TensionPoint {
        index: 0,
        chord: chord.clone(),
        value: value.clamp(0.0, 1.0),
        quality,
        root_distance,
        dissonance,
        motion,
        non_diatonic,
        degree,
        key_distance: pitch::fifths_distance(key.tonic, chord.root),
    }
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionShape {
    Rising,
    Falling,
    Arch,
    Flat,
}

/// Coarse reading of an average tension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionBand {
    Relaxed,
    Stable,
    Balanced,
    Tense,
    VeryTense,
}

impl TensionBand {
    pub fn of(value: f64) -> Self {
        if value < 0.25 {
            TensionBand::Relaxed
        } else if value < 0.4 {
            TensionBand::Stable
        } else if value < 0.55 {
            TensionBand::Balanced
        } else if value < 0.7 {
            TensionBand::Tense
        } else {
            TensionBand::VeryTense
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            TensionBand::Relaxed => "very stable, consonant",
            TensionBand::Stable => "moderately stable",
            TensionBand::Balanced => "balanced tension and release",
            TensionBand::Tense => "tension-forward, dramatic",
            TensionBand::VeryTense => "highly dissonant, unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionCurve {
    pub key: Key,
    pub points: Vec<TensionPoint>,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// First point holding the maximum.
    pub climax: usize,
    /// Indices of resolution points.
    pub resolutions: Vec<usize>,
    pub shape: TensionShape,
    pub band: TensionBand,
}

impl TensionCurve {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Shape from the position of the first maximum.
pub fn classify_shape(values: &[f64]) -> TensionShape {
    let n = values.len();
    if n < 3 {
        return TensionShape::Flat;
    }
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let min = values.iter().copied().fold(f64::MAX, f64::min);
    if max - min < FLAT_RANGE {
        return TensionShape::Flat;
    }
    let climax = values.iter().position(|&v| v == max).unwrap_or(0);
    if climax * 3 >= 2 * n {
        TensionShape::Rising
    } else if climax * 3 < n {
        TensionShape::Falling
    } else {
        TensionShape::Arch
    }
}

/// Indices where the curve drops onto a resolved value.
pub fn find_resolutions(values: &[f64]) -> Vec<usize> {
    values
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[1] < RESOLVED && w[0] - w[1] >= RESOLUTION_DROP)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Tension curve of a progression. The key is estimated when absent;
/// `None` for an empty progression.
pub fn analyze_tension(chords: &[ChordSymbol], key: Option<Key>, weights: &TensionWeights) -> Option<TensionCurve> {
    let key = key.or_else(|| key::estimate_key(chords).map(|e| e.key))?;
    let points: Vec<TensionPoint> = chords
        .iter()
        .enumerate()
        .map(|(i, chord)| {
            let previous = i.checked_sub(1).and_then(|p| chords.get(p));
            TensionPoint { index: i, ..chord_tension(chord, &key, previous, weights) }
        })
        .collect();

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let average = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let min = values.iter().copied().fold(f64::MAX, f64::min);
    let climax = values.iter().position(|&v| v == max).unwrap_or(0);

    Some(TensionCurve {
        key,
        shape: classify_shape(&values),
        resolutions: find_resolutions(&values),
        band: TensionBand::of(average),
        points,
        average,
        min,
        max,
        climax,
    })
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ReduceTension,
    AddResolution,
    NoResolution,
    IncreaseInterest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: &'static str,
}

/// Threshold rules on average, shape and resolution count, high priority
/// first.
pub fn recommendations(curve: &TensionCurve) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if curve.average > 0.6 {
        out.push(Recommendation {
            kind: RecommendationKind::ReduceTension,
            priority: Priority::High,
            message: "add resolution points on tonic or dominant chords",
        });
    }
    if curve.shape == TensionShape::Rising {
        out.push(Recommendation {
            kind: RecommendationKind::AddResolution,
            priority: Priority::Medium,
            message: "tension builds to the end; close with V-I or IV-I",
        });
    }
    if curve.resolutions.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::NoResolution,
            priority: Priority::High,
            message: "no clear resolution points; add an authentic or plagal cadence",
        });
    }
    if curve.average < 0.25 {
        out.push(Recommendation {
            kind: RecommendationKind::IncreaseInterest,
            priority: Priority::Low,
            message: "very consonant; try secondary dominants or borrowed chords",
        });
    }
    out.sort_by_key(|r| r.priority);
    out
}
