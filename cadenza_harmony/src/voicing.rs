// Voicing generation.
//
// Two kinds of operation live here. Rotations and drops rearrange an
// existing chord: `inversion` rotates an interval set so a chosen tone is
// the bass, and the drop-2/drop-3/drop-2-4 transforms lower inner voices of
// a close voicing by an octave. Stacks build a sonority from a fixed step
// (fourths, fifths, seconds, or an explicit octave gap) and only borrow the
// root from the chord.
//
// Interval-level functions return root-relative offsets. Placement turns
// offsets into MIDI numbers with `midi = 12 * (octave + 1) + root + offset`
// and fails with `MidiOutOfRange` rather than wrapping.

use crate::chord::{ChordQuality, ChordSymbol};
use crate::error::{HarmonyError, Result};
use crate::pitch::{self, PitchClass};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicingStyle {
    Close,
    /// Close voicing rotated so chord tone `n` is in the bass.
    Inversion(usize),
    Drop2,
    Drop3,
    Drop24,
    /// 3-5-7-9, root omitted.
    RootlessA,
    /// 7-9-3-5, root omitted.
    RootlessB,
    /// Root, third and seventh.
    Shell,
    Quartal,
    Quintal,
    CloseCluster,
    OpenCluster,
    ToneCluster,
    Spread,
    WideSpread,
    SplitBass,
    SoWhat,
    KennyBarron,
    QuartalTertian,
}

/// A realized voicing, lowest note first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voicing {
    pub style: VoicingStyle,
    pub notes: Vec<u8>,
}

impl Voicing {
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        self.notes.iter().map(|&n| n % 12).collect()
    }

    /// Distance from lowest to highest note in semitones.
    pub fn span(&self) -> u8 {
        match (self.notes.iter().min(), self.notes.iter().max()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }

    pub fn names(&self, prefer_sharps: bool) -> Vec<String> {
        self.notes
            .iter()
            .map(|&n| pitch::midi_to_name(n, prefer_sharps))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// MIDI number of `root` in `octave` (C4 = 60).
pub fn root_midi(root: PitchClass, octave: i32) -> i32 {
    pitch::Note::new(root as i32, octave).midi_number()
}

/// Place root-relative offsets above `root` in `octave`.
pub fn place(root: PitchClass, offsets: &[u8], octave: i32) -> Result<Vec<u8>> {
    let base = root_midi(root, octave);
    offsets
        .iter()
        .map(|&off| pitch::midi_from_i32(base + off as i32))
        .collect()
}

/// Root-position close voicing.
pub fn close_voicing(root: PitchClass, intervals: &[u8], octave: i32) -> Result<Vec<u8>> {
    place(root, intervals, octave)
}

// ---------------------------------------------------------------------------
// Rotations
// ---------------------------------------------------------------------------

/// Rotate `intervals` so element `n` becomes the bass at offset 0. Tones
/// that were below it are raised by octaves until they sit above the new
/// bass. The result is sorted ascending.
///
/// For a seventh chord (0, 4, 7, 11) this yields (0, 3, 7, 8), (0, 4, 5, 9)
/// and (0, 1, 5, 8) for inversions 1 to 3.
pub fn inversion(intervals: &[u8], n: usize) -> Result<Vec<u8>> {
    if n >= intervals.len() {
        return Err(HarmonyError::InvalidInversion {
            inversion: n,
            len: intervals.len(),
        });
    }
    let bass = intervals[n] as i32;
    let mut out: Vec<u8> = Vec::with_capacity(intervals.len());
    for &iv in &intervals[n..] {
        out.push((iv as i32 - bass) as u8);
    }
    for &iv in &intervals[..n] {
        let mut v = iv as i32 + 12 - bass;
        while v <= 0 {
            v += 12;
        }
        out.push(v as u8);
    }
    out.sort_unstable();
    Ok(out)
}

pub fn all_inversions(intervals: &[u8]) -> Vec<Vec<u8>> {
    (0..intervals.len())
        .filter_map(|n| inversion(intervals, n).ok())
        .collect()
}

/// Inverted close voicing with the bass tone in `octave`.
pub fn inversion_voicing(root: PitchClass, intervals: &[u8], n: usize, octave: i32) -> Result<Vec<u8>> {
    let offsets = inversion(intervals, n)?;
    let bass_pc = pitch::transpose(root, intervals[n] as i32);
    place(bass_pc, &offsets, octave)
}

// ---------------------------------------------------------------------------
// Drops
// ---------------------------------------------------------------------------

/// Lower the voices at the given positions (counted from the top, 1-based)
/// by an octave. Fewer than four notes are returned unchanged.
fn drop_voices(notes: &[u8], from_top: &[usize]) -> Result<Vec<u8>> {
    let mut sorted = notes.to_vec();
    sorted.sort_unstable();
    if sorted.len() < 4 {
        return Ok(sorted);
    }
    let len = sorted.len();
    for &k in from_top {
        let idx = len - k;
        sorted[idx] = pitch::midi_from_i32(sorted[idx] as i32 - 12)?;
    }
    sorted.sort_unstable();
    Ok(sorted)
}

/// Drop the second voice from the top: (60, 64, 67, 71) → (55, 60, 64, 71).
pub fn drop2(notes: &[u8]) -> Result<Vec<u8>> {
    drop_voices(notes, &[2])
}

pub fn drop3(notes: &[u8]) -> Result<Vec<u8>> {
    drop_voices(notes, &[3])
}

pub fn drop24(notes: &[u8]) -> Result<Vec<u8>> {
    drop_voices(notes, &[2, 4])
}

// ---------------------------------------------------------------------------
// Rootless and shell
// ---------------------------------------------------------------------------

fn find(intervals: &[u8], candidates: &[u8]) -> Option<u8> {
    candidates.iter().copied().find(|c| intervals.contains(c))
}

fn seventh_of(intervals: &[u8]) -> Option<u8> {
    find(intervals, &[10, 11]).or_else(|| {
        // dim7: the diminished seventh sits at 9 alongside a flat fifth.
        (intervals.contains(&3) && intervals.contains(&6) && intervals.contains(&9)).then_some(9)
    })
}

/// Rootless type A offsets: third, fifth, seventh, ninth, ascending.
///
/// A seventh chord with no ninth of its own gets the natural ninth so the
/// voicing keeps four voices.
pub fn rootless_a(intervals: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    if let Some(third) = find(intervals, &[4, 3]) {
        out.push(third);
    }
    if let Some(fifth) = find(intervals, &[7, 6, 8]) {
        out.push(fifth);
    }
    let seventh = seventh_of(intervals);
    if let Some(s) = seventh {
        out.push(s);
    }
    match find(intervals, &[14, 13, 15]) {
        Some(ninth) => out.push(ninth),
        None if seventh.is_some() => out.push(14),
        None => {}
    }
    out.sort_unstable();
    out
}

/// Rootless type B offsets: type A with its lower two voices raised an
/// octave, giving seventh, ninth, third, fifth.
pub fn rootless_b(intervals: &[u8]) -> Vec<u8> {
    let mut a = rootless_a(intervals);
    for v in a.iter_mut().take(2) {
        *v += 12;
    }
    a.sort_unstable();
    a
}

/// Root, third and seventh. Triads give root and third; suspended chords
/// stand in their suspension for the third.
pub fn shell(intervals: &[u8]) -> Vec<u8> {
    let mut out = vec![0];
    if let Some(third) = find(intervals, &[4, 3, 5, 2]) {
        out.push(third);
    }
    if let Some(seventh) = seventh_of(intervals) {
        out.push(seventh);
    }
    out
}

// ---------------------------------------------------------------------------
// Stacks
// ---------------------------------------------------------------------------

fn stack(step: u8, count: usize) -> Vec<u8> {
    (0..count as u8).map(|i| i * step).collect()
}

/// Fourths stacked from the root, 3 to 6 voices.
pub fn quartal(count: usize) -> Vec<u8> {
    stack(5, count.clamp(3, 6))
}

/// Fifths stacked from the root, 3 to 5 voices.
pub fn quintal(count: usize) -> Vec<u8> {
    stack(7, count.clamp(3, 5))
}

/// Adjacent semitones, 3 to 5 voices.
pub fn close_cluster(count: usize) -> Vec<u8> {
    stack(1, count.clamp(3, 5))
}

/// Alternating whole and half steps: 0, 2, 3, 5, 6 ...
pub fn open_cluster(count: usize) -> Vec<u8> {
    let count = count.clamp(3, 6);
    let mut out = vec![0u8];
    let mut current = 0u8;
    for i in 1..count {
        current += if i % 2 == 1 { 2 } else { 1 };
        out.push(current);
    }
    out
}

/// Every semitone from the root up to `span`.
pub fn tone_cluster(span: u8) -> Vec<u8> {
    (0..=span.clamp(2, 12)).collect()
}

/// Miles Davis "So What": three fourths topped by a major third.
pub const SO_WHAT: [u8; 5] = [0, 5, 10, 15, 19];
/// Kenny Barron minor eleventh: fifths in the left hand, fourths in the right.
pub const KENNY_BARRON: [u8; 5] = [0, 3, 5, 10, 14];
/// Two fourths under a tertian top.
pub const QUARTAL_TERTIAN: [u8; 5] = [0, 5, 10, 14, 19];

/// Widen every interval above the bass by `factor`, truncating toward zero.
pub fn spread(notes: &[u8], factor: f64) -> Result<Vec<u8>> {
    let Some((&bass, rest)) = notes.split_first() else {
        return Ok(Vec::new());
    };
    let mut out = vec![bass];
    for &n in rest {
        let widened = ((n as i32 - bass as i32) as f64 * factor) as i32;
        out.push(pitch::midi_from_i32(bass as i32 + widened)?);
    }
    Ok(out)
}

/// Root alone in `bass_octave`, the remaining tones in `upper_octave`.
/// The upper octave is raised to at least two above the bass.
pub fn split_bass(root: PitchClass, intervals: &[u8], bass_octave: i32, upper_octave: i32) -> Result<Vec<u8>> {
    let upper_octave = if upper_octave < bass_octave + 2 {
        log::debug!(
            "split-bass upper octave {upper_octave} too close to bass octave {bass_octave}, raising"
        );
        bass_octave + 2
    } else {
        upper_octave
    };
    let mut out = vec![pitch::midi_from_i32(root_midi(root, bass_octave))?];
    out.extend(place(root, intervals.get(1..).unwrap_or(&[]), upper_octave)?);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Voice a chord in `style` with its root (or bass, for inversions) in
/// `octave`.
pub fn voice_chord(chord: &ChordSymbol, style: VoicingStyle, octave: i32) -> Result<Voicing> {
    let intervals = match &chord.quality {
        ChordQuality::Known(ct) => ct.intervals,
        ChordQuality::Unknown(q) => return Err(HarmonyError::UnknownChordQuality(q.clone())),
    };
    let root = chord.root;
    let n = intervals.len();
    let notes = match style {
        VoicingStyle::Close => close_voicing(root, intervals, octave)?,
        VoicingStyle::Inversion(k) => inversion_voicing(root, intervals, k, octave)?,
        VoicingStyle::Drop2 => drop2(&close_voicing(root, intervals, octave)?)?,
        VoicingStyle::Drop3 => drop3(&close_voicing(root, intervals, octave)?)?,
        VoicingStyle::Drop24 => drop24(&close_voicing(root, intervals, octave)?)?,
        VoicingStyle::RootlessA => place(root, &rootless_a(intervals), octave)?,
        VoicingStyle::RootlessB => place(root, &rootless_b(intervals), octave)?,
        VoicingStyle::Shell => place(root, &shell(intervals), octave)?,
        VoicingStyle::Quartal => place(root, &quartal(n), octave)?,
        VoicingStyle::Quintal => place(root, &quintal(n), octave)?,
        VoicingStyle::CloseCluster => place(root, &close_cluster(n), octave)?,
        VoicingStyle::OpenCluster => place(root, &open_cluster(n), octave)?,
        VoicingStyle::ToneCluster => {
            let top = intervals.iter().copied().max().unwrap_or(0) % 12;
            place(root, &tone_cluster(top), octave)?
        }
        VoicingStyle::Spread => spread(&close_voicing(root, intervals, octave)?, 2.0)?,
        VoicingStyle::WideSpread => spread(&close_voicing(root, intervals, octave)?, 2.5)?,
        VoicingStyle::SplitBass => split_bass(root, intervals, octave - 1, octave + 1)?,
        VoicingStyle::SoWhat => place(root, &SO_WHAT, octave)?,
        VoicingStyle::KennyBarron => place(root, &KENNY_BARRON, octave)?,
        VoicingStyle::QuartalTertian => place(root, &QUARTAL_TERTIAN, octave)?,
    };
    Ok(Voicing { style, notes })
}
