// Keys and key estimation.
//
// A `Key` is a tonic pitch class plus a major/minor mode. Diatonic
// membership uses the natural scale of the mode; minor keys additionally
// accept the raised leading tone so V and vii° in minor count as diatonic.
//
// `estimate_key` guesses the key of a chord sequence without ground truth,
// using a fixed cascade:
// 1. A dominant-family chord whose root falls a fifth (rises a fourth) to
//    the next chord: the target is the tonic. A resolution onto the final
//    chord's root beats an earlier one, so secondary dominants along the
//    way do not win.
// 2. The final chord's root, if it occurs at least half as often as the
//    most frequent root.
// 3. The most frequent root (earliest first appearance on ties).
// The mode comes from the quality of the chosen tonic chord. Each step
// carries a lower confidence than the one before it.

use crate::chord::{ChordSymbol, QualityFamily};
use crate::error::{HarmonyError, Result};
use crate::pitch::{self, KeyMode, KeySignature, PitchClass};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
pub const NATURAL_MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Major-key tonics conventionally spelled with sharps (C counts as sharp).
const SHARP_MAJOR_TONICS: [PitchClass; 6] = [0, 7, 2, 9, 4, 11];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub tonic: PitchClass,
    pub mode: KeyMode,
}

impl Key {
    pub fn new(tonic: PitchClass, mode: KeyMode) -> Self {
        Key {
            tonic: tonic % 12,
            mode,
        }
    }

    pub fn major(tonic: PitchClass) -> Self {
        Key::new(tonic, KeyMode::Major)
    }

    pub fn minor(tonic: PitchClass) -> Self {
        Key::new(tonic, KeyMode::Minor)
    }

    /// Parse "C", "Bb major", "F#m", "A minor", "ebm". A trailing "m",
    /// "min" or "minor" selects minor; "M", "maj", "major" or nothing
    /// selects major.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || HarmonyError::InvalidKey(text.to_string());
        let trimmed = text.trim();
        let mut chars = trimmed.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() => {}
            _ => return Err(invalid()),
        }
        let mut split = trimmed.len();
        for (i, c) in chars {
            if !matches!(c, '#' | 'b' | '♯' | '♭') {
                split = i;
                break;
            }
        }
        let (tonic_name, rest) = trimmed.split_at(split);
        let tonic = pitch::note_to_semitone(tonic_name).map_err(|_| invalid())?;
        let rest = rest.trim();
        let mode = match rest {
            "M" => KeyMode::Major,
            _ => match rest.to_ascii_lowercase().as_str() {
                "" | "maj" | "major" => KeyMode::Major,
                "m" | "min" | "minor" => KeyMode::Minor,
                _ => return Err(invalid()),
            },
        };
        Ok(Key::new(tonic, mode))
    }

    /// Root-relative offsets of the natural scale.
    pub fn scale(&self) -> &'static [u8; 7] {
        match self.mode {
            KeyMode::Major => &MAJOR_SCALE,
            KeyMode::Minor => &NATURAL_MINOR_SCALE,
        }
    }

    pub fn scale_pcs(&self) -> Vec<PitchClass> {
        self.scale()
            .iter()
            .map(|&o| pitch::transpose(self.tonic, o as i32))
            .collect()
    }

    /// Zero-based scale degree of a pitch class in the natural scale.
    pub fn degree_of(&self, pc: PitchClass) -> Option<usize> {
        let offset = pitch::interval(self.tonic, pc);
        self.scale().iter().position(|&o| o == offset)
    }

    /// Natural-scale membership, plus the leading tone in minor.
    pub fn is_diatonic_pc(&self, pc: PitchClass) -> bool {
        self.degree_of(pc).is_some()
            || (self.mode == KeyMode::Minor && pitch::interval(self.tonic, pc) == 11)
    }

    /// Whether every tone of the chord belongs to the key.
    pub fn is_diatonic(&self, chord: &ChordSymbol) -> bool {
        chord.notes().iter().all(|&pc| self.is_diatonic_pc(pc))
    }

    pub fn relative(&self) -> Key {
        match self.mode {
            KeyMode::Major => Key::minor(pitch::transpose(self.tonic, 9)),
            KeyMode::Minor => Key::major(pitch::transpose(self.tonic, 3)),
        }
    }

    pub fn parallel(&self) -> Key {
        match self.mode {
            KeyMode::Major => Key::minor(self.tonic),
            KeyMode::Minor => Key::major(self.tonic),
        }
    }

    pub fn dominant(&self) -> Key {
        Key::new(pitch::transpose(self.tonic, 7), self.mode)
    }

    pub fn subdominant(&self) -> Key {
        Key::new(pitch::transpose(self.tonic, 5), self.mode)
    }

    pub fn prefer_sharps(&self) -> bool {
        let major = match self.mode {
            KeyMode::Major => self.tonic,
            KeyMode::Minor => pitch::transpose(self.tonic, 3),
        };
        SHARP_MAJOR_TONICS.contains(&major)
    }

    pub fn tonic_name(&self) -> &'static str {
        pitch::semitone_to_note(self.tonic as i32, self.prefer_sharps())
    }

    pub fn signature(&self) -> Result<KeySignature> {
        pitch::key_signature(self.tonic_name(), self.mode)
    }

    /// Steps around the circle of fifths between the two tonics, after
    /// mapping minor keys onto their relative majors.
    pub fn fifths_distance(&self, other: &Key) -> u8 {
        let a = self.relative_major_tonic();
        let b = other.relative_major_tonic();
        pitch::fifths_distance(a, b)
    }

    fn relative_major_tonic(&self) -> PitchClass {
        match self.mode {
            KeyMode::Major => self.tonic,
            KeyMode::Minor => pitch::transpose(self.tonic, 3),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            KeyMode::Major => "major",
            KeyMode::Minor => "minor",
        };
        write!(f, "{} {}", self.tonic_name(), mode)
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEvidence {
    DominantResolution,
    FinalChord,
    MostFrequentRoot,
}

impl KeyEvidence {
    pub fn confidence(self) -> f64 {
        match self {
            KeyEvidence::DominantResolution => 0.8,
            KeyEvidence::FinalChord => 0.6,
            KeyEvidence::MostFrequentRoot => 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    pub key: Key,
    pub confidence: f64,
    pub evidence: KeyEvidence,
}

fn mode_of(chord: &ChordSymbol) -> KeyMode {
    match chord.family() {
        QualityFamily::Minor | QualityFamily::HalfDiminished | QualityFamily::Diminished => {
            KeyMode::Minor
        }
        _ => KeyMode::Major,
    }
}

fn estimate(chord: &ChordSymbol, evidence: KeyEvidence) -> KeyEstimate {
    KeyEstimate {
        key: Key::new(chord.root, mode_of(chord)),
        confidence: evidence.confidence(),
        evidence,
    }
}

/// Estimate the key of a chord sequence. `None` only for an empty sequence.
pub fn estimate_key(chords: &[ChordSymbol]) -> Option<KeyEstimate> {
    let last = chords.last()?;

    let resolutions: Vec<&ChordSymbol> = chords
        .windows(2)
        .filter(|pair| pair[0].is_dominant() && pitch::interval(pair[0].root, pair[1].root) == 5)
        .map(|pair| &pair[1])
        .collect();
    let target = resolutions
        .iter()
        .find(|c| c.root == last.root)
        .or_else(|| resolutions.first());
    if let Some(target) = target {
        return Some(estimate(target, KeyEvidence::DominantResolution));
    }

    let mut counts = [0usize; 12];
    for c in chords {
        counts[c.root as usize] += 1;
    }
    let top = counts.iter().copied().max().unwrap_or(0);
    if counts[last.root as usize] * 2 >= top {
        return Some(estimate(last, KeyEvidence::FinalChord));
    }

    // Earliest chord whose root has the top count.
    let frequent = chords
        .iter()
        .find(|c| counts[c.root as usize] == top)
        .unwrap_or(last);
    log::debug!("key estimate fell back to most frequent root {}", frequent.name());
    Some(estimate(frequent, KeyEvidence::MostFrequentRoot))
}
