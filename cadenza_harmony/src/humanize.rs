// Performance humanization for rendered notes.
//
// Takes quantized note events (times and durations in beats) and applies a
// genre's groove: gaussian timing jitter, pushed and laid-back beats, swing
// or shuffle on off-beats, duration drift, beat emphasis and a phrase-level
// velocity arc, plus optional ghost notes (left hand) and grace notes (right
// hand). `amount` scales everything: 0 leaves timing, duration and dynamics
// untouched apart from the fixed left-hand softening.
//
// All randomness comes from the caller's `RandomSource`, so a seeded
// generator reproduces a performance exactly.

use crate::config::{Genre, HarmonyConfig};
use crate::error::Result;
use crate::pitch;
use cadenza_prng::RandomSource;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStyle {
    Straight,
    Swing,
    Shuffle,
    BehindBeat,
}

/// Micro-timing and dynamics of a genre. Beats are 0-based within a 4/4 bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrooveProfile {
    pub timing_style: TimingStyle,
    /// Beats that get a velocity boost.
    pub beat_emphasis: Vec<u8>,
    /// Off-beat delay in beats at full amount.
    pub swing_amount: f64,
    pub ghost_note_probability: f64,
    /// Velocity standard deviation is half of this.
    pub velocity_variance: f64,
    /// Beats played slightly early.
    pub push_beats: Vec<u8>,
    /// Beats played slightly late.
    pub lay_back_beats: Vec<u8>,
}

impl GrooveProfile {
    pub fn gospel() -> Self {
        GrooveProfile {
            timing_style: TimingStyle::BehindBeat,
            beat_emphasis: vec![1, 3],
            swing_amount: 0.15,
            ghost_note_probability: 0.15,
            velocity_variance: 12.0,
            push_beats: vec![1],
            lay_back_beats: vec![3],
        }
    }

    pub fn jazz() -> Self {
        GrooveProfile {
            timing_style: TimingStyle::Swing,
            beat_emphasis: vec![1, 3],
            swing_amount: 0.25,
            ghost_note_probability: 0.1,
            velocity_variance: 15.0,
            push_beats: vec![],
            lay_back_beats: vec![2, 3],
        }
    }

    pub fn neo_soul() -> Self {
        GrooveProfile {
            timing_style: TimingStyle::BehindBeat,
            beat_emphasis: vec![1, 3],
            swing_amount: 0.08,
            ghost_note_probability: 0.12,
            velocity_variance: 10.0,
            push_beats: vec![],
            lay_back_beats: vec![0, 1, 2, 3],
        }
    }

    pub fn blues() -> Self {
        GrooveProfile {
            timing_style: TimingStyle::Shuffle,
            beat_emphasis: vec![1, 3],
            swing_amount: 0.3,
            ghost_note_probability: 0.2,
            velocity_variance: 18.0,
            push_beats: vec![],
            lay_back_beats: vec![2, 3],
        }
    }

    pub fn classical() -> Self {
        GrooveProfile {
            timing_style: TimingStyle::Straight,
            beat_emphasis: vec![0],
            swing_amount: 0.0,
            ghost_note_probability: 0.0,
            velocity_variance: 8.0,
            push_beats: vec![],
            lay_back_beats: vec![],
        }
    }
}

impl Default for GrooveProfile {
    fn default() -> Self {
        GrooveProfile::gospel()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Played,
    Ghost,
    Grace,
}

/// A note with beat-based timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub time: f64,
    pub duration: f64,
    pub velocity: u8,
    pub hand: Hand,
    pub kind: NoteKind,
}

impl NoteEvent {
    pub fn new(pitch: u8, time: f64, duration: f64, velocity: u8, hand: Hand) -> Self {
        NoteEvent { pitch, time, duration, velocity, hand, kind: NoteKind::Played }
    }
}

/// Note length used where a lick carries no rhythm.
pub const DEFAULT_STEP: f64 = 0.5;

/// Render root offsets as a monophonic line. Durations come from `rhythm`
/// and fall back to `DEFAULT_STEP` where it runs short; each note starts
/// when the previous one ends. Fails if the line leaves the MIDI range.
pub fn render_offsets(root: u8, offsets: &[i8], rhythm: &[f64], velocity: u8, hand: Hand) -> Result<Vec<NoteEvent>> {
    let mut time = 0.0;
    let mut out = Vec::with_capacity(offsets.len());
    for (i, &offset) in offsets.iter().enumerate() {
        let midi = pitch::midi_from_i32(root as i32 + offset as i32)?;
        let duration = rhythm.get(i).copied().unwrap_or(DEFAULT_STEP);
        out.push(NoteEvent::new(midi, time, duration, velocity, hand));
        time += duration;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Humanizer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Humanizer {
    pub profile: GrooveProfile,
    /// 0 is mechanical, 1 heavily humanized.
    pub amount: f64,
    /// Shape velocities into a build-peak-resolve arc over the passage.
    pub phrase_dynamics: bool,
}

impl Humanizer {
    pub fn new(profile: GrooveProfile) -> Self {
        Humanizer { profile, amount: 0.5, phrase_dynamics: true }
    }

    pub fn for_genre(genre: Genre, config: &HarmonyConfig) -> Self {
        Humanizer::new(config.groove(genre))
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount.clamp(0.0, 1.0);
        self
    }

    pub fn with_phrase_dynamics(mut self, on: bool) -> Self {
        self.phrase_dynamics = on;
        self
    }

    /// Humanize `notes`, adding ghost and grace notes when `amount` is above
    /// 0.3. The result is sorted by time.
    pub fn humanize(&self, notes: &[NoteEvent], rng: &mut impl RandomSource) -> Vec<NoteEvent> {
        if notes.is_empty() {
            return Vec::new();
        }
        let total = notes.iter().map(|n| n.time + n.duration).fold(0.0, f64::max);
        let phrase_length = if self.phrase_dynamics { Some(total) } else { None };

        let mut out: Vec<NoteEvent> = notes
            .iter()
            .map(|n| NoteEvent {
                time: self.timing(n.time, rng),
                duration: self.duration(n.duration, rng),
                velocity: self.velocity(n, phrase_length, rng),
                ..n.clone()
            })
            .collect();

        if self.amount > 0.3 {
            let extra = self.ornaments(&out, rng);
            log::trace!("added {} ghost/grace notes", extra.len());
            out.extend(extra);
        }
        out.sort_by(|a, b| a.time.total_cmp(&b.time));
        out
    }

    fn timing(&self, time: f64, rng: &mut impl RandomSource) -> f64 {
        let amount = self.amount;
        let beat = (time.floor() as i64).rem_euclid(4) as u8;
        let fraction = time - time.floor();

        let mut offset = rng.gaussian(0.0, 0.015) * amount;
        if self.profile.push_beats.contains(&beat) {
            offset -= 0.025 * amount;
        } else if self.profile.lay_back_beats.contains(&beat) {
            offset += 0.03 * amount;
        }

        // The "and" of the beat.
        if fraction > 0.4 && fraction < 0.6 {
            let swing = self.profile.swing_amount * amount;
            match self.profile.timing_style {
                TimingStyle::Shuffle => offset += swing,
                TimingStyle::Swing => offset += swing * 0.67,
                TimingStyle::Straight | TimingStyle::BehindBeat => {}
            }
        }
        (time + offset).max(0.0)
    }

    fn duration(&self, duration: f64, rng: &mut impl RandomSource) -> f64 {
        let amount = self.amount;
        let mut variance = rng.gaussian(0.0, 0.03) * amount;
        if duration < 0.5 {
            variance -= 0.02 * amount;
        } else if duration > 2.0 {
            variance += 0.03 * amount;
        }
        (duration * (1.0 + variance)).max(0.1)
    }

    fn velocity(&self, note: &NoteEvent, phrase_length: Option<f64>, rng: &mut impl RandomSource) -> u8 {
        let amount = self.amount;
        let beat = (note.time.floor() as i64).rem_euclid(4) as u8;

        let emphasis = if self.profile.beat_emphasis.contains(&beat) {
            (12.0 * amount) as i32
        } else {
            0
        };
        let jitter = (rng.gaussian(0.0, self.profile.velocity_variance / 2.0) * amount) as i32;
        let phrase = match phrase_length {
            Some(len) if len > 0.0 => phrase_arc(note.time / len, amount),
            _ => 0,
        };
        let hand = match note.hand {
            Hand::Left => -5,
            Hand::Right => 0,
        };
        (note.velocity as i32 + emphasis + jitter + phrase + hand).clamp(20, 127) as u8
    }

    fn ornaments(&self, notes: &[NoteEvent], rng: &mut impl RandomSource) -> Vec<NoteEvent> {
        let probability = self.profile.ghost_note_probability * self.amount;
        let mut out = Vec::new();
        for note in notes {
            match note.hand {
                Hand::Left if rng.random_bool(probability) => {
                    let time = note.time - rng.range_f64(0.15, 0.25);
                    if time >= 0.0 {
                        out.push(NoteEvent {
                            time,
                            duration: 0.1,
                            velocity: rng.range_u64(25, 41) as u8,
                            kind: NoteKind::Ghost,
                            ..note.clone()
                        });
                    }
                }
                Hand::Right if rng.random_bool(probability * 0.5) => {
                    let step = rng.choose(&[1u8, 2]).copied().unwrap_or(1);
                    let time = note.time - 0.08;
                    if time >= 0.0 && note.pitch >= step {
                        out.push(NoteEvent {
                            pitch: note.pitch - step,
                            time,
                            duration: 0.06,
                            velocity: note.velocity.saturating_sub(20).max(1),
                            kind: NoteKind::Grace,
                            ..note.clone()
                        });
                    }
                }
                _ => {}
            }
        }
        out
    }
}

/// Velocity offset at `position` (0-1) through a phrase: build over the
/// first 30%, peak through 70%, then fall away.
fn phrase_arc(position: f64, amount: f64) -> i32 {
    if position < 0.3 {
        (position / 0.3 * 8.0 * amount) as i32
    } else if position < 0.7 {
        (10.0 * amount) as i32
    } else {
        ((1.0 - (position - 0.7) / 0.3) * 8.0 * amount) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_prng::{ReplayRng, SeededRng};

    fn passage() -> Vec<NoteEvent> {
        (0..16)
            .map(|i| {
                let hand = if i % 2 == 0 { Hand::Left } else { Hand::Right };
                NoteEvent::new(60 + (i % 5) as u8, i as f64 * 0.5, 0.5, 80, hand)
            })
            .collect()
    }

    #[test]
    fn test_zero_amount_is_mechanical() {
        let notes: Vec<NoteEvent> = passage().into_iter().filter(|n| n.hand == Hand::Right).collect();
        let h = Humanizer::new(GrooveProfile::jazz()).with_amount(0.0);
        let out = h.humanize(&notes, &mut SeededRng::new(1));
        assert_eq!(out, notes);
    }

    #[test]
    fn test_left_hand_softened_even_at_zero() {
        let notes = vec![NoteEvent::new(48, 0.0, 1.0, 80, Hand::Left)];
        let out = Humanizer::new(GrooveProfile::classical()).with_amount(0.0).humanize(&notes, &mut SeededRng::new(1));
        assert_eq!(out[0].velocity, 75);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let h = Humanizer::new(GrooveProfile::blues()).with_amount(0.8);
        let a = h.humanize(&passage(), &mut SeededRng::new(42));
        let b = h.humanize(&passage(), &mut SeededRng::new(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_output_bounds_and_order() {
        let h = Humanizer::new(GrooveProfile::gospel()).with_amount(1.0);
        for seed in 0..20 {
            let out = h.humanize(&passage(), &mut SeededRng::new(seed));
            assert!(out.len() >= passage().len());
            for n in &out {
                assert!(n.time >= 0.0);
                assert!(n.duration >= 0.06);
                assert!(n.velocity <= 127);
            }
            for pair in out.windows(2) {
                assert!(pair[0].time <= pair[1].time);
            }
            let played = out.iter().filter(|n| n.kind == NoteKind::Played);
            assert!(played.clone().all(|n| (20..=127).contains(&n.velocity)));
            assert_eq!(played.count(), passage().len());
        }
    }

    #[test]
    fn test_groove_offsets_with_forced_draws() {
        // Every draw is 0.0: gaussians land on their mean and every
        // probability check fires.
        let notes = vec![
            NoteEvent::new(48, 1.0, 1.0, 80, Hand::Left),
            NoteEvent::new(72, 2.0, 1.0, 80, Hand::Right),
        ];
        let h = Humanizer::new(GrooveProfile::gospel()).with_amount(1.0);
        let out = h.humanize(&notes, &mut ReplayRng::new(vec![0.0]));
        assert_eq!(out.len(), 4);

        let ghost = &out[0];
        assert_eq!(ghost.kind, NoteKind::Ghost);
        assert_eq!(ghost.velocity, 25);
        assert!((ghost.time - 0.825).abs() < 1e-9);

        // Beat 2 (index 1) is pushed early.
        let left = &out[1];
        assert_eq!(left.kind, NoteKind::Played);
        assert!((left.time - 0.975).abs() < 1e-9);

        let grace = &out[2];
        assert_eq!(grace.kind, NoteKind::Grace);
        assert_eq!(grace.pitch, 71);
        assert!((grace.time - 1.92).abs() < 1e-9);

        // Two thirds through the phrase sits in the full-intensity plateau.
        let right = &out[3];
        assert_eq!(right.velocity, 90);
        assert_eq!(grace.velocity, 70);
    }

    #[test]
    fn test_swing_delays_off_beats() {
        let notes = vec![NoteEvent::new(60, 0.5, 0.5, 80, Hand::Right)];
        let h = Humanizer::new(GrooveProfile::blues()).with_amount(0.3);
        let out = h.humanize(&notes, &mut ReplayRng::new(vec![0.0]));
        // Shuffle delays by the full swing amount.
        assert!((out[0].time - (0.5 + 0.3 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_render_offsets() {
        let notes = render_offsets(60, &[0, 2, 4, 0], &[0.5, 0.5, 1.0], 90, Hand::Right).unwrap();
        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 62, 64, 60]);
        assert_eq!(notes[3].time, 2.0);
        assert_eq!(notes[3].duration, DEFAULT_STEP);
        assert!(render_offsets(126, &[0, 5], &[], 90, Hand::Right).is_err());
    }

    #[test]
    fn test_profile_json_defaults() {
        let p: GrooveProfile = serde_json::from_str(r#"{"swing_amount": 0.4}"#).unwrap();
        assert_eq!(p.swing_amount, 0.4);
        assert_eq!(p.push_beats, GrooveProfile::gospel().push_beats);
        let h = Humanizer::for_genre(Genre::Jazz, &HarmonyConfig::default());
        assert_eq!(h.profile, GrooveProfile::jazz());
    }
}
