// Voicing analysis: describe how a set of sounding notes realizes a chord.
//
// Given MIDI notes and a chord symbol this reports the shape of the voicing
// (close, open, drop, rootless, shell, quartal, cluster, spread), which
// chord tones and extensions are present, the inversion implied by the bass,
// a 0-1 complexity score, and an estimated hand span.
//
// Shape classification is a fixed cascade over the gaps between adjacent
// notes and the overall width. The first rule that fires wins, so a
// rootless cluster reports `Cluster`.

use crate::chord::ChordSymbol;
use crate::pitch::{self, PitchClass};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicingShape {
    Close,
    Open,
    Drop2,
    Drop3,
    Drop24,
    Rootless,
    Shell,
    Quartal,
    Cluster,
    Spread,
}

impl VoicingShape {
    /// Base complexity before note count, extensions and width.
    pub fn base_complexity(self) -> f64 {
        match self {
            VoicingShape::Close => 0.1,
            VoicingShape::Shell => 0.2,
            VoicingShape::Open => 0.3,
            VoicingShape::Rootless => 0.5,
            VoicingShape::Drop2 => 0.6,
            VoicingShape::Drop3 => 0.7,
            VoicingShape::Drop24 => 0.8,
            VoicingShape::Quartal => 0.7,
            VoicingShape::Spread => 0.6,
            VoicingShape::Cluster => 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extension {
    Ninth,
    Eleventh,
    Thirteenth,
    FlatNinth,
    SharpNinth,
    SharpEleventh,
}

impl Extension {
    pub fn label(self) -> &'static str {
        match self {
            Extension::Ninth => "9",
            Extension::Eleventh => "11",
            Extension::Thirteenth => "13",
            Extension::FlatNinth => "b9",
            Extension::SharpNinth => "#9",
            Extension::SharpEleventh => "#11",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChordTones {
    pub has_root: bool,
    pub has_third: bool,
    pub has_seventh: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicingAnalysis {
    pub chord: ChordSymbol,
    pub shape: VoicingShape,
    /// Sorted, de-duplicated MIDI notes.
    pub notes: Vec<u8>,
    pub note_names: Vec<String>,
    /// Gaps between adjacent notes.
    pub intervals: Vec<u8>,
    pub width: u8,
    pub inversion: u8,
    pub tones: ChordTones,
    pub extensions: Vec<Extension>,
    pub complexity: f64,
    pub hand_span_inches: f64,
}

/// A sounding note with onset and release times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub pitch: u8,
    pub start: f64,
    pub end: f64,
}

/// Pitches of the notes that overlap `[start, end]`, allowing `window`
/// seconds of slack on either side. Sorted and de-duplicated.
pub fn notes_in_window(notes: &[TimedNote], start: f64, end: f64, window: f64) -> Vec<u8> {
    let mut pitches: Vec<u8> = notes
        .iter()
        .filter(|n| {
            (n.start >= start - window && n.start <= end)
                || (n.end >= start && n.end <= end + window)
                || (n.start <= start && n.end >= end)
        })
        .map(|n| n.pitch)
        .collect();
    pitches.sort_unstable();
    pitches.dedup();
    pitches
}

pub fn classify_shape(intervals: &[u8], width: u8, has_root: bool) -> VoicingShape {
    if intervals.is_empty() {
        return VoicingShape::Close;
    }
    if intervals.iter().all(|&i| i == 5 || i == 6) {
        return VoicingShape::Quartal;
    }
    if intervals.iter().filter(|&&i| i <= 2).count() >= 2 {
        return VoicingShape::Cluster;
    }
    if !has_root {
        return VoicingShape::Rootless;
    }
    if intervals.len() == 2 && width <= 14 {
        return VoicingShape::Shell;
    }
    if width <= 12 {
        return VoicingShape::Close;
    }
    if width > 24 {
        return VoicingShape::Spread;
    }
    if intervals.len() >= 3 {
        if intervals[1] > 7 || intervals[2] > 7 {
            if intervals.len() >= 4 && intervals[3] > 7 {
                return VoicingShape::Drop24;
            }
            return VoicingShape::Drop2;
        }
        if intervals[0] > 7 {
            return VoicingShape::Drop3;
        }
    }
    VoicingShape::Open
}

/// Chord tones and extensions present among `pitch_classes`, measured from
/// `root`.
///
/// The sharp ninth shares its pitch class with the minor third, so it is
/// only reported when no third is present. Since `has_third` already counts
/// the minor third, that condition can never hold and `#9` is never
/// reported.
pub fn identify_tones(pitch_classes: &[PitchClass], root: PitchClass) -> (ChordTones, Vec<Extension>) {
    let has = |offset: i32| pitch_classes.contains(&pitch::transpose(root, offset));
    let tones = ChordTones {
        has_root: has(0),
        has_third: has(3) || has(4),
        has_seventh: has(10) || has(11),
    };
    let mut extensions = Vec::new();
    if has(2) {
        extensions.push(Extension::Ninth);
    }
    if has(5) {
        extensions.push(Extension::Eleventh);
    }
    if has(9) {
        extensions.push(Extension::Thirteenth);
    }
    if has(1) {
        extensions.push(Extension::FlatNinth);
    }
    if has(3) && !tones.has_third {
        extensions.push(Extension::SharpNinth);
    }
    if has(6) {
        extensions.push(Extension::SharpEleventh);
    }
    (tones, extensions)
}

pub fn complexity_score(shape: VoicingShape, note_count: usize, extensions: usize, width: u8) -> f64 {
    let mut score = shape.base_complexity();
    if note_count >= 6 {
        score += 0.2;
    } else if note_count >= 5 {
        score += 0.1;
    }
    score += extensions as f64 * 0.1;
    if width > 24 {
        score += 0.1;
    }
    score.min(1.0)
}

/// One octave spans roughly 6.5 inches on a standard keyboard.
pub fn estimate_hand_span(width: u8) -> f64 {
    width as f64 / 12.0 * 6.5
}

/// Inversion implied by the bass: 0 for the root, 1 for a third, 2 for a
/// fifth, otherwise 1.
fn bass_inversion(bass: PitchClass, root: PitchClass) -> u8 {
    match pitch::interval(root, bass) {
        0 => 0,
        3 | 4 => 1,
        7 => 2,
        _ => 1,
    }
}

/// Analyze a voicing of `chord`. Returns `None` for fewer than two distinct
/// notes.
pub fn analyze_voicing(notes: &[u8], chord: &ChordSymbol) -> Option<VoicingAnalysis> {
    let mut sorted = notes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() < 2 {
        return None;
    }
    let intervals: Vec<u8> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    let width = sorted[sorted.len() - 1] - sorted[0];
    let pcs: Vec<PitchClass> = sorted.iter().map(|&n| n % 12).collect();
    let (tones, extensions) = identify_tones(&pcs, chord.root);
    let shape = classify_shape(&intervals, width, tones.has_root);
    let prefer_sharps = chord.prefer_sharps;

    Some(VoicingAnalysis {
        chord: chord.clone(),
        shape,
        note_names: sorted
            .iter()
            .map(|&n| pitch::midi_to_name(n, prefer_sharps))
            .collect(),
        inversion: bass_inversion(sorted[0] % 12, chord.root),
        complexity: complexity_score(shape, sorted.len(), extensions.len(), width),
        hand_span_inches: estimate_hand_span(width),
        notes: sorted,
        intervals,
        width,
        tones,
        extensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(s: &str) -> ChordSymbol {
        ChordSymbol::parse(s).unwrap()
    }

    #[test]
    fn test_close_voicing() {
        let a = analyze_voicing(&[60, 64, 67, 71], &chord("Cmaj7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Close);
        assert_eq!(a.intervals, vec![4, 3, 4]);
        assert_eq!(a.width, 11);
        assert_eq!(a.inversion, 0);
        assert!(a.tones.has_root && a.tones.has_third && a.tones.has_seventh);
        assert!(a.extensions.is_empty());
        assert!((a.complexity - 0.1).abs() < 1e-9);
        assert_eq!(a.note_names[0], "C4");
    }

    #[test]
    fn test_drop2_voicing() {
        // G3 C4 E4 B4: no gap wider than a fifth, so plain open.
        let a = analyze_voicing(&[55, 60, 64, 71], &chord("Cmaj7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Open);
        assert_eq!(a.inversion, 2);
        // C3 G3 E4 B4: second gap 9 -> drop-2.
        let a = analyze_voicing(&[48, 55, 64, 71], &chord("Cmaj7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Drop2);
    }

    #[test]
    fn test_rootless_and_shell() {
        let a = analyze_voicing(&[52, 55, 59, 62], &chord("Cmaj7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Rootless);
        assert_eq!(a.extensions, vec![Extension::Ninth]);
        assert_eq!(a.inversion, 1);
        let a = analyze_voicing(&[48, 52, 58], &chord("C7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Shell);
    }

    #[test]
    fn test_quartal_and_cluster() {
        let a = analyze_voicing(&[50, 55, 60, 65], &chord("Dm7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Quartal);
        let a = analyze_voicing(&[60, 61, 62, 67], &chord("C")).unwrap();
        assert_eq!(a.shape, VoicingShape::Cluster);
        assert!((a.complexity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_spread_and_hand_span() {
        let a = analyze_voicing(&[36, 52, 67, 71], &chord("Cmaj7")).unwrap();
        assert_eq!(a.shape, VoicingShape::Spread);
        assert!((a.hand_span_inches - 35.0 / 12.0 * 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_sharp_nine_never_reported() {
        // C7#9 voiced with both thirds.
        let (tones, ext) = identify_tones(&[0, 4, 7, 10, 3], 0);
        assert!(tones.has_third);
        assert!(!ext.contains(&Extension::SharpNinth));
        // Minor third alone still counts as the third.
        let (_, ext) = identify_tones(&[0, 3, 7, 10], 0);
        assert!(!ext.contains(&Extension::SharpNinth));
    }

    #[test]
    fn test_single_note_is_not_a_voicing() {
        assert!(analyze_voicing(&[60, 60], &chord("C")).is_none());
    }

    #[test]
    fn test_notes_in_window() {
        let notes = [
            TimedNote { pitch: 64, start: 0.0, end: 1.0 },
            TimedNote { pitch: 60, start: 0.05, end: 1.0 },
            TimedNote { pitch: 67, start: 2.0, end: 3.0 },
            TimedNote { pitch: 60, start: 0.1, end: 0.9 },
        ];
        assert_eq!(notes_in_window(&notes, 0.0, 1.0, 0.2), vec![60, 64]);
    }
}
