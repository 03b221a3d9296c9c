// Scale catalog and scale instances.
//
// Every scale is an immutable, root-relative, strictly increasing interval
// set with a category and a list of aliases. The catalog is a `const`
// table; the name/alias index over it is built once on first use and never
// mutated, so lookups are safe from any number of threads.
//
// Lookup is forgiving about spelling: case-insensitive, with spaces and
// hyphens treated as underscores ("Harmonic Minor", "harmonic-minor" and
// "harmonic_minor" all resolve).
//
// `ScaleInstance` pairs a catalog scale with a tonic and answers the
// questions the analyzers and generators ask: is this pitch in the scale,
// which degree is it, what is the nearest scale tone.

use crate::error::{HarmonyError, Result};
use crate::pitch::{self, PitchClass};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScaleCategory {
    /// The seven diatonic modes.
    Mode,
    /// Harmonic and melodic minor.
    Minor,
    Blues,
    Pentatonic,
    /// Whole-tone and the two octatonic orderings.
    Symmetric,
    /// Melodic-minor modes used over altered and lydian-dominant chords.
    Jazz,
    Bebop,
    Exotic,
}

/// One catalog entry.
#[derive(Debug, PartialEq, Eq)]
pub struct ScaleType {
    pub name: &'static str,
    pub intervals: &'static [u8],
    pub category: ScaleCategory,
    pub aliases: &'static [&'static str],
}

impl ScaleType {
    /// Pitch-class membership mask, root at index 0.
    pub fn pitch_classes(&self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for &interval in self.intervals {
            pcs[(interval % 12) as usize] = true;
        }
        pcs
    }
}

const SCALES: &[ScaleType] = &[
    // Modes
    ScaleType { name: "ionian", intervals: &[0, 2, 4, 5, 7, 9, 11], category: ScaleCategory::Mode, aliases: &["major"] },
    ScaleType { name: "dorian", intervals: &[0, 2, 3, 5, 7, 9, 10], category: ScaleCategory::Mode, aliases: &[] },
    ScaleType { name: "phrygian", intervals: &[0, 1, 3, 5, 7, 8, 10], category: ScaleCategory::Mode, aliases: &[] },
    ScaleType { name: "lydian", intervals: &[0, 2, 4, 6, 7, 9, 11], category: ScaleCategory::Mode, aliases: &[] },
    ScaleType { name: "mixolydian", intervals: &[0, 2, 4, 5, 7, 9, 10], category: ScaleCategory::Mode, aliases: &[] },
    ScaleType { name: "aeolian", intervals: &[0, 2, 3, 5, 7, 8, 10], category: ScaleCategory::Mode, aliases: &["natural_minor", "minor"] },
    ScaleType { name: "locrian", intervals: &[0, 1, 3, 5, 6, 8, 10], category: ScaleCategory::Mode, aliases: &[] },
    // Minor
    ScaleType { name: "harmonic_minor", intervals: &[0, 2, 3, 5, 7, 8, 11], category: ScaleCategory::Minor, aliases: &[] },
    ScaleType { name: "melodic_minor", intervals: &[0, 2, 3, 5, 7, 9, 11], category: ScaleCategory::Minor, aliases: &["jazz_minor"] },
    // Blues
    ScaleType { name: "blues", intervals: &[0, 3, 5, 6, 7, 10], category: ScaleCategory::Blues, aliases: &["minor_blues"] },
    ScaleType { name: "major_blues", intervals: &[0, 2, 3, 4, 7, 9], category: ScaleCategory::Blues, aliases: &[] },
    // Pentatonic
    ScaleType { name: "pentatonic_major", intervals: &[0, 2, 4, 7, 9], category: ScaleCategory::Pentatonic, aliases: &["major_pentatonic"] },
    ScaleType { name: "pentatonic_minor", intervals: &[0, 3, 5, 7, 10], category: ScaleCategory::Pentatonic, aliases: &["minor_pentatonic"] },
    // Symmetric
    ScaleType { name: "whole_tone", intervals: &[0, 2, 4, 6, 8, 10], category: ScaleCategory::Symmetric, aliases: &[] },
    ScaleType { name: "diminished_wh", intervals: &[0, 2, 3, 5, 6, 8, 9, 11], category: ScaleCategory::Symmetric, aliases: &["whole_half_diminished"] },
    ScaleType { name: "diminished_hw", intervals: &[0, 1, 3, 4, 6, 7, 9, 10], category: ScaleCategory::Symmetric, aliases: &["half_whole_diminished", "dominant_diminished"] },
    // Jazz
    ScaleType { name: "altered", intervals: &[0, 1, 3, 4, 6, 8, 10], category: ScaleCategory::Jazz, aliases: &["super_locrian"] },
    ScaleType { name: "lydian_dominant", intervals: &[0, 2, 4, 6, 7, 9, 10], category: ScaleCategory::Jazz, aliases: &["overtone"] },
    // Bebop
    ScaleType { name: "bebop_dominant", intervals: &[0, 2, 4, 5, 7, 9, 10, 11], category: ScaleCategory::Bebop, aliases: &[] },
    ScaleType { name: "bebop_major", intervals: &[0, 2, 4, 5, 7, 8, 9, 11], category: ScaleCategory::Bebop, aliases: &[] },
    ScaleType { name: "bebop_minor", intervals: &[0, 2, 3, 5, 7, 8, 9, 10], category: ScaleCategory::Bebop, aliases: &[] },
    // Exotic
    ScaleType { name: "phrygian_dominant", intervals: &[0, 1, 4, 5, 7, 8, 10], category: ScaleCategory::Exotic, aliases: &["spanish_phrygian"] },
    ScaleType { name: "hungarian_minor", intervals: &[0, 2, 3, 6, 7, 8, 11], category: ScaleCategory::Exotic, aliases: &[] },
    ScaleType { name: "double_harmonic_major", intervals: &[0, 1, 4, 5, 7, 8, 11], category: ScaleCategory::Exotic, aliases: &["byzantine"] },
    ScaleType { name: "hirajoshi", intervals: &[0, 2, 3, 7, 8], category: ScaleCategory::Exotic, aliases: &[] },
    ScaleType { name: "iwato", intervals: &[0, 1, 5, 6, 10], category: ScaleCategory::Exotic, aliases: &[] },
    ScaleType { name: "yo", intervals: &[0, 2, 5, 7, 9], category: ScaleCategory::Exotic, aliases: &[] },
];

/// Normalized name/alias → index into `SCALES`.
static SCALE_INDEX: Lazy<BTreeMap<String, usize>> = Lazy::new(|| {
    let mut index = BTreeMap::new();
    for (i, scale) in SCALES.iter().enumerate() {
        index.insert(scale.name.to_string(), i);
        for alias in scale.aliases {
            index.insert(alias.to_string(), i);
        }
    }
    index
});

fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Look up a scale by name or alias.
pub fn scale(name: &str) -> Result<&'static ScaleType> {
    SCALE_INDEX
        .get(&normalize_name(name))
        .map(|&i| &SCALES[i])
        .ok_or_else(|| HarmonyError::UnknownScale(name.to_string()))
}

pub fn all_scales() -> &'static [ScaleType] {
    SCALES
}

pub fn scales_in_category(category: ScaleCategory) -> Vec<&'static ScaleType> {
    SCALES.iter().filter(|s| s.category == category).collect()
}

/// Pitch classes of a scale built on `root`, in scale order.
pub fn scale_notes(root: &str, name: &str) -> Result<Vec<PitchClass>> {
    let tonic = pitch::note_to_semitone(root)?;
    Ok(ScaleInstance::new(tonic, name)?.notes())
}

/// Every (tonic, scale) pair whose pitch-class set contains all of `pcs`.
/// Ordered by scale size (smallest, most specific first), then catalog order.
pub fn scales_containing(pcs: &[PitchClass]) -> Vec<ScaleInstance> {
    let mut found = Vec::new();
    for scale in SCALES {
        for tonic in 0..12u8 {
            let inst = ScaleInstance { scale, tonic };
            if pcs.iter().all(|&pc| inst.contains_pc(pc)) {
                found.push(inst);
            }
        }
    }
    found.sort_by_key(|inst| inst.scale.intervals.len());
    found
}

// ---------------------------------------------------------------------------
// Scale instances
// ---------------------------------------------------------------------------

/// A catalog scale rooted on a specific tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleInstance {
    pub scale: &'static ScaleType,
    pub tonic: PitchClass,
}

impl ScaleInstance {
    pub fn new(tonic: PitchClass, name: &str) -> Result<Self> {
        Ok(ScaleInstance {
            scale: scale(name)?,
            tonic: tonic % 12,
        })
    }

    /// Pitch classes in scale order starting from the tonic.
    pub fn notes(&self) -> Vec<PitchClass> {
        self.scale
            .intervals
            .iter()
            .map(|&iv| pitch::transpose(self.tonic, iv as i32))
            .collect()
    }

    pub fn note_names(&self, prefer_sharps: bool) -> Vec<&'static str> {
        self.notes()
            .into_iter()
            .map(|pc| pitch::semitone_to_note(pc as i32, prefer_sharps))
            .collect()
    }

    pub fn contains_pc(&self, pc: PitchClass) -> bool {
        let rel = pitch::interval(self.tonic, pc % 12);
        self.scale.pitch_classes()[rel as usize]
    }

    /// Whether a MIDI pitch belongs to the scale.
    pub fn contains(&self, pitch: u8) -> bool {
        self.contains_pc(pitch % 12)
    }

    /// All in-scale MIDI pitches in `[low, high]`.
    pub fn pitches_in_range(&self, low: u8, high: u8) -> Vec<u8> {
        (low..=high).filter(|&p| self.contains(p)).collect()
    }

    /// Zero-based scale degree of a MIDI pitch, or `None` when out of scale.
    pub fn degree_of(&self, pitch: u8) -> Option<usize> {
        let rel = pitch::interval(self.tonic, pitch % 12);
        self.scale.intervals.iter().position(|&iv| iv == rel)
    }

    /// MIDI pitch of a (possibly multi-octave) degree above the tonic in `octave`.
    pub fn degree_to_midi(&self, degree: usize, octave: i32) -> Result<u8> {
        let len = self.scale.intervals.len();
        let interval = self.scale.intervals[degree % len] as i32;
        let extra_octaves = (degree / len) as i32;
        let base = pitch::Note::new(self.tonic as i32, octave).midi_number();
        pitch::midi_from_i32(base + interval + 12 * extra_octaves)
    }

    /// Nearest in-scale pitch. Ties resolve downward.
    pub fn snap(&self, pitch: u8) -> u8 {
        if self.contains(pitch) {
            return pitch;
        }
        for offset in 1u8..=6 {
            if pitch >= offset && self.contains(pitch - offset) {
                return pitch - offset;
            }
            if pitch as u16 + offset as u16 <= 127 && self.contains(pitch + offset) {
                return pitch + offset;
            }
        }
        pitch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_intervals_strictly_increasing() {
        for s in all_scales() {
            assert_eq!(s.intervals[0], 0, "{} must start on the root", s.name);
            assert!(
                s.intervals.windows(2).all(|w| w[0] < w[1]),
                "{} intervals not increasing",
                s.name
            );
        }
    }

    #[test]
    fn test_lookup_normalizes_names() {
        assert_eq!(scale("Harmonic Minor").unwrap().name, "harmonic_minor");
        assert_eq!(scale("harmonic-minor").unwrap().name, "harmonic_minor");
        assert_eq!(scale("MAJOR").unwrap().name, "ionian");
        assert_eq!(scale("super locrian").unwrap().name, "altered");
        assert!(matches!(scale("zyxian"), Err(HarmonyError::UnknownScale(_))));
    }

    #[test]
    fn test_scale_notes() {
        assert_eq!(scale_notes("D", "dorian").unwrap(), vec![2, 4, 5, 7, 9, 11, 0]);
        assert_eq!(scale_notes("A", "blues").unwrap(), vec![9, 0, 2, 3, 4, 7]);
        let names = ScaleInstance::new(5, "major").unwrap().note_names(false);
        assert_eq!(names, vec!["F", "G", "A", "Bb", "C", "D", "E"]);
    }

    #[test]
    fn test_d_dorian_membership_and_degrees() {
        let d = ScaleInstance::new(2, "dorian").unwrap();
        for p in [62, 64, 65, 67, 69, 71, 72] {
            assert!(d.contains(p), "{p} should be in D dorian");
        }
        assert!(!d.contains(63));
        assert!(!d.contains(66));
        assert_eq!(d.degree_of(62), Some(0));
        assert_eq!(d.degree_of(69), Some(4));
        assert_eq!(d.degree_of(63), None);
        assert_eq!(d.degree_to_midi(0, 4).unwrap(), 62);
        assert_eq!(d.degree_to_midi(7, 4).unwrap(), 74);
        assert_eq!(d.pitches_in_range(60, 64), vec![60, 62, 64]);
    }

    #[test]
    fn test_snap_prefers_lower_neighbour() {
        let d = ScaleInstance::new(2, "dorian").unwrap();
        assert_eq!(d.snap(62), 62);
        assert_eq!(d.snap(63), 62);
        assert_eq!(d.snap(66), 65);
    }

    #[test]
    fn test_categories() {
        let pent = scales_in_category(ScaleCategory::Pentatonic);
        assert_eq!(pent.len(), 2);
        assert!(scales_in_category(ScaleCategory::Mode).len() == 7);
    }

    #[test]
    fn test_scales_containing_dominant_chord() {
        // G7 tones: G B D F
        let found = scales_containing(&[7, 11, 2, 5]);
        assert!(
            found
                .iter()
                .any(|s| s.tonic == 7 && s.scale.name == "mixolydian")
        );
        assert!(found.iter().any(|s| s.tonic == 0 && s.scale.name == "ionian"));
        assert!(
            !found
                .iter()
                .any(|s| s.scale.name == "pentatonic_major")
        );
        // Smaller scales sort first.
        let sizes: Vec<usize> = found.iter().map(|s| s.scale.intervals.len()).collect();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    }
}
