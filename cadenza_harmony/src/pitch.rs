// Pitch algebra: the mod-12 foundation every other module builds on.
//
// Pitch classes are plain `u8` values in [0, 12); every arithmetic helper
// normalizes into that range with `rem_euclid`, so callers may pass any
// signed offset. Note names accept sharps, flats and double accidentals
// (ASCII `#`/`b`/`x` or the Unicode signs), with an optional trailing
// octave that is ignored when only the pitch class is wanted.
//
// Provides:
// - Name ↔ pitch-class conversion (`note_to_semitone`, `semitone_to_note`)
// - Ascending intervals, interval names, transposition, enharmonic checks
// - `Note` (pitch class + octave) with exact MIDI round-trips:
//   `midi = 12 * (octave + 1) + pitch_class`
// - Circle-of-fifths positions/distances and key-signature lookup
// - MIDI ↔ frequency conversion (A4 = 440 Hz)
//
// Parsing is the only fallible operation; it fails closed with
// `HarmonyError::InvalidNoteName`.

use crate::error::{HarmonyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pitch class, 0 (C) through 11 (B).
pub type PitchClass = u8;

pub const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

const INTERVAL_SHORT_NAMES: [&str; 13] = [
    "P1", "m2", "M2", "m3", "M3", "P4", "TT", "P5", "m6", "M6", "m7", "M7", "P8",
];

const INTERVAL_FULL_NAMES: [&str; 13] = [
    "Perfect Unison",
    "Minor Second",
    "Major Second",
    "Minor Third",
    "Major Third",
    "Perfect Fourth",
    "Tritone",
    "Perfect Fifth",
    "Minor Sixth",
    "Major Sixth",
    "Minor Seventh",
    "Major Seventh",
    "Perfect Octave",
];

/// Reduce any integer into [0, 12).
pub fn pitch_class(value: i32) -> PitchClass {
    value.rem_euclid(12) as PitchClass
}

/// Parse a note name ("C", "F#", "Bbb", "E♭", "Cx", "G#4") into its pitch class.
///
/// A trailing octave number (optionally negative) is ignored.
pub fn note_to_semitone(name: &str) -> Result<PitchClass> {
    let (body, _) = split_octave(name.trim());
    parse_spelling(body)
        .map(|(letter, offset)| pitch_class(letter as i32 + offset))
        .ok_or_else(|| HarmonyError::InvalidNoteName(name.to_string()))
}

/// Name a pitch class, spelling black keys with sharps or flats.
pub fn semitone_to_note(pc: i32, prefer_sharps: bool) -> &'static str {
    let idx = pitch_class(pc) as usize;
    if prefer_sharps {
        SHARP_NAMES[idx]
    } else {
        FLAT_NAMES[idx]
    }
}

/// Ascending distance in semitones from `from` up to `to`, in [0, 12).
pub fn interval(from: PitchClass, to: PitchClass) -> u8 {
    pitch_class(to as i32 - from as i32)
}

/// Ascending interval between two note names.
pub fn interval_between(from: &str, to: &str) -> Result<u8> {
    Ok(interval(note_to_semitone(from)?, note_to_semitone(to)?))
}

/// Short interval name ("m3", "TT", "P5"). Nonzero multiples of an octave are "P8";
/// other compound intervals reduce to their simple form.
pub fn interval_name(semitones: i32) -> &'static str {
    INTERVAL_SHORT_NAMES[interval_table_index(semitones)]
}

/// Long interval name ("Minor Third", "Tritone").
pub fn interval_full_name(semitones: i32) -> &'static str {
    INTERVAL_FULL_NAMES[interval_table_index(semitones)]
}

fn interval_table_index(semitones: i32) -> usize {
    let s = semitones.unsigned_abs() as usize;
    if s > 0 && s % 12 == 0 { 12 } else { s % 12 }
}

/// Transpose a pitch class by any signed number of semitones.
pub fn transpose(pc: PitchClass, semitones: i32) -> PitchClass {
    pitch_class(pc as i32 + semitones)
}

/// Transpose a note name, respelling the result.
pub fn transpose_note(name: &str, semitones: i32, prefer_sharps: bool) -> Result<&'static str> {
    let pc = note_to_semitone(name)?;
    Ok(semitone_to_note(transpose(pc, semitones) as i32, prefer_sharps))
}

/// Whether two spellings name the same pitch class (C# / Db, B# / C).
pub fn is_enharmonic(a: &str, b: &str) -> Result<bool> {
    Ok(note_to_semitone(a)? == note_to_semitone(b)?)
}

/// Whether a name is spelled with flats (used to keep derived chords in
/// the caller's spelling).
pub fn is_flat_spelling(name: &str) -> bool {
    let (body, _) = split_octave(name.trim());
    body.chars().skip(1).any(|c| c == 'b' || c == '♭' || c == '𝄫')
}

/// Split "G#4" into ("G#", Some(4)); "C-1" into ("C", Some(-1)).
fn split_octave(s: &str) -> (&str, Option<i32>) {
    let body = s.trim_end_matches(|c: char| c.is_ascii_digit());
    if body.len() == s.len() {
        return (s, None);
    }
    let digits = &s[body.len()..];
    let (body, negative) = match body.strip_suffix('-') {
        Some(b) => (b, true),
        None => (body, false),
    };
    let octave = digits.parse::<i32>().ok().map(|o| if negative { -o } else { o });
    (body, octave)
}

/// Letter pitch class plus accidental offset, or `None` for a bad spelling.
fn parse_spelling(body: &str) -> Option<(u8, i32)> {
    let mut chars = body.chars();
    let letter = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let offset = match chars.as_str() {
        "" => 0,
        "#" | "♯" => 1,
        "##" | "♯♯" | "x" | "𝄪" => 2,
        "b" | "♭" => -1,
        "bb" | "♭♭" | "𝄫" => -2,
        _ => return None,
    };
    Some((letter, offset))
}

// ---------------------------------------------------------------------------
// Notes and MIDI
// ---------------------------------------------------------------------------

/// A pitch class in a specific octave. Octave 4 holds middle C (MIDI 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
}

impl Note {
    pub fn new(pitch_class: i32, octave: i32) -> Self {
        Note {
            pitch_class: self::pitch_class(pitch_class),
            octave,
        }
    }

    /// Parse "C#4", "Bb-1", "E5". The octave is required.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (body, octave) = split_octave(trimmed);
        let octave = octave.ok_or_else(|| HarmonyError::InvalidNoteName(s.to_string()))?;
        let (letter, offset) =
            parse_spelling(body).ok_or_else(|| HarmonyError::InvalidNoteName(s.to_string()))?;
        // Spelling across the octave boundary keeps the written octave's
        // register: B#3 sounds as C4, Cb4 as B3.
        let absolute = 12 * (octave + 1) + letter as i32 + offset;
        Ok(Note::from_absolute(absolute))
    }

    fn from_absolute(absolute: i32) -> Self {
        Note {
            pitch_class: pitch_class(absolute),
            octave: absolute.div_euclid(12) - 1,
        }
    }

    /// Unchecked MIDI number (may fall outside 0..=127).
    pub fn midi_number(self) -> i32 {
        12 * (self.octave + 1) + self.pitch_class as i32
    }

    /// MIDI note number, failing when the note is outside the MIDI range.
    pub fn to_midi(self) -> Result<u8> {
        midi_from_i32(self.midi_number())
    }

    pub fn from_midi(midi: u8) -> Self {
        Note::from_absolute(midi as i32)
    }

    /// Transpose, carrying into neighbouring octaves.
    pub fn transpose(self, semitones: i32) -> Self {
        Note::from_absolute(self.midi_number() + semitones)
    }

    /// "C#4" or "Db4".
    pub fn name(self, prefer_sharps: bool) -> String {
        format!(
            "{}{}",
            semitone_to_note(self.pitch_class as i32, prefer_sharps),
            self.octave
        )
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name(true))
    }
}

/// MIDI number for a note name in an octave: `12 * (octave + 1) + pc`.
pub fn note_to_midi(name: &str, octave: i32) -> Result<u8> {
    let pc = note_to_semitone(name)?;
    Note::new(pc as i32, octave).to_midi()
}

pub fn midi_to_note(midi: u8) -> Note {
    Note::from_midi(midi)
}

/// "C4" style name for a MIDI number.
pub fn midi_to_name(midi: u8, prefer_sharps: bool) -> String {
    Note::from_midi(midi).name(prefer_sharps)
}

/// Range-check a computed MIDI value.
pub fn midi_from_i32(value: i32) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|&m| m <= 127)
        .ok_or(HarmonyError::MidiOutOfRange(value))
}

/// Equal-tempered frequency in Hz (A4 = MIDI 69 = 440 Hz). Accepts
/// fractional MIDI values for microtonal pitches.
pub fn midi_to_frequency(midi: f64) -> f64 {
    440.0 * 2f64.powf((midi - 69.0) / 12.0)
}

/// Fractional MIDI number for a frequency; `None` for non-positive input.
pub fn frequency_to_midi(freq: f64) -> Option<f64> {
    if freq <= 0.0 || !freq.is_finite() {
        return None;
    }
    Some(69.0 + 12.0 * (freq / 440.0).log2())
}

// ---------------------------------------------------------------------------
// Circle of fifths and key signatures
// ---------------------------------------------------------------------------

/// Signed circle-of-fifths position: sharps positive, flats negative.
/// C# sits at +7; Ab/Eb/Bb/F are -4..-1.
const CIRCLE_POSITIONS: [i8; 12] = [0, 7, 2, -3, 4, -1, 6, 1, -4, 3, -2, 5];

pub fn circle_of_fifths_position(pc: PitchClass) -> i8 {
    CIRCLE_POSITIONS[(pc % 12) as usize]
}

/// Steps around the circle of fifths between two pitch classes, 0..=6.
pub fn fifths_distance(a: PitchClass, b: PitchClass) -> u8 {
    // Multiplying by 7 maps chromatic order onto fifths order.
    let pa = (a as u32 * 7) % 12;
    let pb = (b as u32 * 7) % 12;
    let d = pa.abs_diff(pb);
    d.min(12 - d) as u8
}

/// Major or minor tonality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyMode {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureKind {
    Sharps,
    Flats,
}

/// Number and kind of accidentals in a key signature. C major / A minor is
/// zero sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    pub count: u8,
    pub kind: SignatureKind,
}

const SHARP_ORDER: [&str; 7] = ["F#", "C#", "G#", "D#", "A#", "E#", "B#"];
const FLAT_ORDER: [&str; 7] = ["Bb", "Eb", "Ab", "Db", "Gb", "Cb", "Fb"];

impl KeySignature {
    /// The altered notes in signature order.
    pub fn accidentals(&self) -> Vec<&'static str> {
        let order = match self.kind {
            SignatureKind::Sharps => &SHARP_ORDER,
            SignatureKind::Flats => &FLAT_ORDER,
        };
        order.iter().take(self.count as usize).copied().collect()
    }
}

const MAJOR_SIGNATURES: [(&str, u8, SignatureKind); 15] = [
    ("C", 0, SignatureKind::Sharps),
    ("G", 1, SignatureKind::Sharps),
    ("D", 2, SignatureKind::Sharps),
    ("A", 3, SignatureKind::Sharps),
    ("E", 4, SignatureKind::Sharps),
    ("B", 5, SignatureKind::Sharps),
    ("F#", 6, SignatureKind::Sharps),
    ("C#", 7, SignatureKind::Sharps),
    ("F", 1, SignatureKind::Flats),
    ("Bb", 2, SignatureKind::Flats),
    ("Eb", 3, SignatureKind::Flats),
    ("Ab", 4, SignatureKind::Flats),
    ("Db", 5, SignatureKind::Flats),
    ("Gb", 6, SignatureKind::Flats),
    ("Cb", 7, SignatureKind::Flats),
];

const MINOR_SIGNATURES: [(&str, u8, SignatureKind); 15] = [
    ("A", 0, SignatureKind::Sharps),
    ("E", 1, SignatureKind::Sharps),
    ("B", 2, SignatureKind::Sharps),
    ("F#", 3, SignatureKind::Sharps),
    ("C#", 4, SignatureKind::Sharps),
    ("G#", 5, SignatureKind::Sharps),
    ("D#", 6, SignatureKind::Sharps),
    ("A#", 7, SignatureKind::Sharps),
    ("D", 1, SignatureKind::Flats),
    ("G", 2, SignatureKind::Flats),
    ("C", 3, SignatureKind::Flats),
    ("F", 4, SignatureKind::Flats),
    ("Bb", 5, SignatureKind::Flats),
    ("Eb", 6, SignatureKind::Flats),
    ("Ab", 7, SignatureKind::Flats),
];

/// Signature for the most common spelling of each major key, indexed by
/// tonic pitch class. Used when a theoretical spelling (D# major) is asked for.
const MAJOR_BY_PC: [(u8, SignatureKind); 12] = [
    (0, SignatureKind::Sharps),
    (5, SignatureKind::Flats),
    (2, SignatureKind::Sharps),
    (3, SignatureKind::Flats),
    (4, SignatureKind::Sharps),
    (1, SignatureKind::Flats),
    (6, SignatureKind::Sharps),
    (1, SignatureKind::Sharps),
    (4, SignatureKind::Flats),
    (3, SignatureKind::Sharps),
    (2, SignatureKind::Flats),
    (5, SignatureKind::Sharps),
];

/// Key signature for a tonic spelling and mode.
///
/// Spellings in the standard tables are answered exactly (Gb major has six
/// flats, F# major six sharps). Other valid spellings resolve through their
/// pitch class to the conventional enharmonic key.
pub fn key_signature(tonic: &str, mode: KeyMode) -> Result<KeySignature> {
    let pc = note_to_semitone(tonic)?;
    let spelled = canonical_spelling(tonic);
    let table = match mode {
        KeyMode::Major => &MAJOR_SIGNATURES,
        KeyMode::Minor => &MINOR_SIGNATURES,
    };
    if let Some(&(_, count, kind)) = table.iter().find(|(name, _, _)| *name == spelled) {
        return Ok(KeySignature { count, kind });
    }
    let major_pc = match mode {
        KeyMode::Major => pc,
        KeyMode::Minor => transpose(pc, 3),
    };
    log::debug!("key signature for {tonic:?} {mode:?} resolved enharmonically");
    let (count, kind) = MAJOR_BY_PC[major_pc as usize];
    Ok(KeySignature { count, kind })
}

/// Normalize letter case and Unicode accidentals: "f♯" → "F#".
fn canonical_spelling(name: &str) -> String {
    let (body, _) = split_octave(name.trim());
    let mut out = String::new();
    for (i, c) in body.chars().enumerate() {
        match c {
            '♯' => out.push('#'),
            '♭' => out.push('b'),
            c if i == 0 => out.push(c.to_ascii_uppercase()),
            c => out.push(c),
        }
    }
    out
}
