// Voice-leading optimization and analysis.
//
// `find_closest_voicing` chooses how to voice a target chord given the
// previous voicing. Candidates are the target's inversions (each tone in
// turn as bass, lower tones raised an octave), plus each inversion an
// octave up and down when the policy allows wide voicings. A candidate's
// cost is the sum, over its notes, of the distance to the nearest previous
// note. Candidates whose largest single-note distance exceeds the policy's
// `max_movement` are discarded before costs are compared; the cheapest
// survivor wins and ties keep the earlier candidate, so root position wins
// a tie. That is at most `3 * len` candidates.
//
// The analysis half reports how voices move between two chords: signed
// nearest-neighbour movements, motion-type counts, common tones, parallel
// fifths and octaves, and a 0-1 smoothness score.

use crate::chord::ChordSymbol;
use crate::config::{Genre, HarmonyConfig, VoiceLeadingPolicy};
use crate::error::Result;
use crate::pitch::{self, PitchClass};
use crate::voicing;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Sum and maximum of each note's distance to its nearest previous note.
pub fn movement_cost(candidate: &[u8], previous: &[u8]) -> (u32, u8) {
    let mut sum = 0u32;
    let mut max = 0u8;
    for &note in candidate {
        let nearest = previous
            .iter()
            .map(|&p| note.abs_diff(p))
            .min()
            .unwrap_or(0);
        sum += nearest as u32;
        max = max.max(nearest);
    }
    (sum, max)
}

/// The target's inversions in MIDI space, root position first. With
/// `allow_wide` each inversion is followed by its octave-up and octave-down
/// copies. Copies that leave the MIDI range are skipped.
pub fn candidate_voicings(target: &[u8], allow_wide: bool) -> Vec<Vec<u8>> {
    let mut sorted = target.to_vec();
    sorted.sort_unstable();
    let mut out = Vec::with_capacity(sorted.len() * 3);
    for rotation in 0..sorted.len() {
        let mut inv: Vec<i32> = sorted[rotation..]
            .iter()
            .map(|&n| n as i32)
            .chain(sorted[..rotation].iter().map(|&n| n as i32 + 12))
            .collect();
        inv.sort_unstable();
        let shifts: &[i32] = if allow_wide { &[0, 12, -12] } else { &[0] };
        for &shift in shifts {
            let shifted: Option<Vec<u8>> = inv
                .iter()
                .map(|&n| pitch::midi_from_i32(n + shift).ok())
                .collect();
            if let Some(v) = shifted {
                out.push(v);
            }
        }
    }
    out
}

/// Voice `target` (MIDI notes) to move as little as possible from
/// `previous`. Without a previous voicing the target comes back unchanged.
///
/// When every candidate breaks `max_movement` the candidate with the
/// smallest largest-move is returned (ties by total movement).
pub fn find_closest_voicing(target: &[u8], previous: Option<&[u8]>, policy: &VoiceLeadingPolicy) -> Vec<u8> {
    let previous = match previous {
        Some(p) if !p.is_empty() => p,
        _ => return target.to_vec(),
    };
    if target.is_empty() {
        return Vec::new();
    }

    let candidates = candidate_voicings(target, policy.allow_wide_voicings);
    let mut best: Option<(&Vec<u8>, u32)> = None;
    let mut fallback: Option<(&Vec<u8>, u8, u32)> = None;
    for cand in &candidates {
        let (sum, max) = movement_cost(cand, previous);
        if fallback.is_none_or(|(_, fmax, fsum)| (max, sum) < (fmax, fsum)) {
            fallback = Some((cand, max, sum));
        }
        if max > policy.max_movement {
            continue;
        }
        if best.is_none_or(|(_, bsum)| sum < bsum) {
            best = Some((cand, sum));
        }
    }

    match (best, fallback) {
        (Some((v, _)), _) => v.clone(),
        (None, Some((v, max, _))) => {
            log::debug!(
                "no voicing within {} semitones, using one with max move {max}",
                policy.max_movement
            );
            v.clone()
        }
        (None, None) => target.to_vec(),
    }
}

/// `find_closest_voicing` with the policy for `genre` from `config`.
pub fn optimize_voice_leading(target: &[u8], previous: Option<&[u8]>, genre: Genre, config: &HarmonyConfig) -> Vec<u8> {
    find_closest_voicing(target, previous, &config.voice_leading_policy(genre))
}

/// Root-position close voicing of `chord` in `octave`, then voice-led from
/// `previous`. An unknown quality voices the root alone.
pub fn chord_voicing(chord: &ChordSymbol, previous: Option<&[u8]>, octave: i32, policy: &VoiceLeadingPolicy) -> Result<Vec<u8>> {
    let root_position = voicing::close_voicing(chord.root, chord.intervals(), octave)?;
    Ok(find_closest_voicing(&root_position, previous, policy))
}

/// Voice a whole progression, each chord led from the one before.
pub fn voice_progression(chords: &[ChordSymbol], octave: i32, policy: &VoiceLeadingPolicy) -> Result<Vec<Vec<u8>>> {
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(chords.len());
    for chord in chords {
        let prev = out.last().map(Vec::as_slice);
        let next = chord_voicing(chord, prev, octave, policy)?;
        out.push(next);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotionCounts {
    pub parallel: u32,
    pub similar: u32,
    pub contrary: u32,
    pub oblique: u32,
    pub stationary: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothnessRating {
    Excellent,
    Good,
    Moderate,
    Rough,
    VeryRough,
}

impl SmoothnessRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            SmoothnessRating::Excellent
        } else if score >= 0.7 {
            SmoothnessRating::Good
        } else if score >= 0.5 {
            SmoothnessRating::Moderate
        } else if score >= 0.3 {
            SmoothnessRating::Rough
        } else {
            SmoothnessRating::VeryRough
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLeadingReport {
    /// Signed movement of each voice of the first chord to its nearest
    /// tone in the second, in -6..=5.
    pub movements: Vec<i8>,
    pub total_movement: u32,
    pub max_movement: u8,
    pub common_tones: Vec<PitchClass>,
    pub motion: MotionCounts,
    /// Voice index pairs moving in parallel perfect fifths.
    pub parallel_fifths: Vec<(usize, usize)>,
    /// Voice index pairs moving in parallel octaves or unisons.
    pub parallel_octaves: Vec<(usize, usize)>,
    /// 1 for no motion, 0 once the average voice moves a tritone.
    pub smoothness: f64,
}

fn signed_pc_move(from: PitchClass, to: PitchClass) -> i8 {
    ((to as i32 - from as i32 + 6).rem_euclid(12) - 6) as i8
}

fn nearest_moves(from: &[PitchClass], to: &[PitchClass]) -> Vec<i8> {
    from.iter()
        .map(|&a| {
            let mut best: i8 = 12;
            for &b in to {
                let d = signed_pc_move(a, b);
                if d.abs() < best.abs() {
                    best = d;
                }
            }
            if best == 12 { 0 } else { best }
        })
        .collect()
}

fn classify_motions(movements: &[i8]) -> MotionCounts {
    let mut counts = MotionCounts::default();
    for (i, &m1) in movements.iter().enumerate() {
        for &m2 in &movements[i + 1..] {
            if m1 == 0 && m2 == 0 {
                counts.stationary += 1;
            } else if m1 == 0 || m2 == 0 {
                counts.oblique += 1;
            } else if m1 == m2 {
                counts.parallel += 1;
            } else if (m1 > 0) == (m2 > 0) {
                counts.similar += 1;
            } else {
                counts.contrary += 1;
            }
        }
    }
    counts
}

/// Index pairs of voices that keep a perfect fifth (or octave/unison) while
/// both move. Voices are paired by position; extra voices are ignored.
fn parallel_perfects(from: &[i32], to: &[i32]) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let n = from.len().min(to.len());
    let mut fifths = Vec::new();
    let mut octaves = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            if from[i] == to[i] || from[j] == to[j] {
                continue;
            }
            let before = (from[j] - from[i]).rem_euclid(12);
            let after = (to[j] - to[i]).rem_euclid(12);
            if before == 7 && after == 7 {
                fifths.push((i, j));
            } else if before == 0 && after == 0 {
                octaves.push((i, j));
            }
        }
    }
    (fifths, octaves)
}

fn build_report(from_pcs: &[PitchClass], to_pcs: &[PitchClass], from_abs: &[i32], to_abs: &[i32]) -> VoiceLeadingReport {
    let movements = nearest_moves(from_pcs, to_pcs);
    let total_movement: u32 = movements.iter().map(|m| m.unsigned_abs() as u32).sum();
    let max_movement = movements.iter().map(|m| m.unsigned_abs()).max().unwrap_or(0);
    let avg = if movements.is_empty() {
        0.0
    } else {
        total_movement as f64 / movements.len() as f64
    };
    let mut common_tones: Vec<PitchClass> = to_pcs.iter().copied().filter(|pc| from_pcs.contains(pc)).collect();
    common_tones.dedup();
    let (parallel_fifths, parallel_octaves) = parallel_perfects(from_abs, to_abs);
    VoiceLeadingReport {
        motion: classify_motions(&movements),
        movements,
        total_movement,
        max_movement,
        common_tones,
        parallel_fifths,
        parallel_octaves,
        smoothness: (1.0 - avg / 6.0).max(0.0),
    }
}

/// Compare two chords as pitch-class sets in root-position order.
pub fn analyze_voice_leading(from: &ChordSymbol, to: &ChordSymbol) -> VoiceLeadingReport {
    let from_pcs = from.notes();
    let to_pcs = to.notes();
    let from_abs: Vec<i32> = from.intervals().iter().map(|&iv| from.root as i32 + iv as i32).collect();
    let to_abs: Vec<i32> = to.intervals().iter().map(|&iv| to.root as i32 + iv as i32).collect();
    build_report(&from_pcs, &to_pcs, &from_abs, &to_abs)
}

/// Compare two concrete voicings (MIDI notes, voices paired low to high).
pub fn compare_voicings(from: &[u8], to: &[u8]) -> VoiceLeadingReport {
    let mut from = from.to_vec();
    let mut to = to.to_vec();
    from.sort_unstable();
    to.sort_unstable();
    let from_pcs: Vec<PitchClass> = from.iter().map(|&n| n % 12).collect();
    let to_pcs: Vec<PitchClass> = to.iter().map(|&n| n % 12).collect();
    let from_abs: Vec<i32> = from.iter().map(|&n| n as i32).collect();
    let to_abs: Vec<i32> = to.iter().map(|&n| n as i32).collect();
    build_report(&from_pcs, &to_pcs, &from_abs, &to_abs)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionVoiceLeading {
    pub transitions: Vec<VoiceLeadingReport>,
    pub overall_smoothness: f64,
    pub total_violations: usize,
    pub rating: SmoothnessRating,
}

pub fn analyze_progression_voice_leading(chords: &[ChordSymbol]) -> ProgressionVoiceLeading {
    let transitions: Vec<VoiceLeadingReport> = chords
        .windows(2)
        .map(|w| analyze_voice_leading(&w[0], &w[1]))
        .collect();
    let overall_smoothness = if transitions.is_empty() {
        1.0
    } else {
        transitions.iter().map(|t| t.smoothness).sum::<f64>() / transitions.len() as f64
    };
    let total_violations = transitions
        .iter()
        .map(|t| t.parallel_fifths.len() + t.parallel_octaves.len())
        .sum();
    ProgressionVoiceLeading {
        rating: SmoothnessRating::from_score(overall_smoothness),
        transitions,
        overall_smoothness,
        total_violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAJ7: [u8; 4] = [48, 52, 55, 59];

    fn chord(s: &str) -> ChordSymbol {
        ChordSymbol::parse(s).unwrap()
    }

    #[test]
    fn test_fallback_takes_smallest_largest_move() {
        let previous = [36, 40, 43, 47];
        let target = [79, 83, 86, 89];
        // No inversion comes within a fifth; root position moves least.
        let out = find_closest_voicing(&target, Some(&previous), &VoiceLeadingPolicy::classical());
        assert_eq!(out, target.to_vec());
        // With octave shifts the octave-down root position wins, still
        // beyond the jazz limit.
        let out = find_closest_voicing(&target, Some(&previous), &VoiceLeadingPolicy::jazz());
        assert_eq!(out, vec![67, 71, 74, 77]);
        assert_eq!(movement_cost(&out, &previous).1, 30);
    }

    #[test]
    fn test_no_previous_returns_target() {
        let target = [55, 59, 62, 65];
        let policy = VoiceLeadingPolicy::jazz();
        assert_eq!(find_closest_voicing(&target, None, &policy), target);
        assert_eq!(find_closest_voicing(&target, Some(&[]), &policy), target);
    }

    #[test]
    fn test_candidate_count_is_bounded() {
        assert_eq!(candidate_voicings(&[55, 59, 62, 65], true).len(), 12);
        assert_eq!(candidate_voicings(&[55, 59, 62, 65], false).len(), 4);
        // Octave-down copies below MIDI 0 are dropped.
        assert_eq!(candidate_voicings(&[0, 4, 7], true).len(), 6);
    }

    #[test]
    fn test_classical_limit_respected() {
        let g7 = [55, 59, 62, 65];
        let policy = VoiceLeadingPolicy::classical();
        let out = find_closest_voicing(&g7, Some(&CMAJ7), &policy);
        let (_, max) = movement_cost(&out, &CMAJ7);
        assert!(max <= 7, "moved {max}");
        let mut pcs: Vec<u8> = out.iter().map(|n| n % 12).collect();
        pcs.sort_unstable();
        assert_eq!(pcs, vec![2, 5, 7, 11]);
    }

    #[test]
    fn test_chooses_smoothest_inversion() {
        // Dm7 after Cmaj7 in the same register: root position D F A C
        // (50 53 57 60) costs 2+1+2+1 = 6; nothing cheaper exists.
        let dm7 = [50, 53, 57, 60];
        let out = find_closest_voicing(&dm7, Some(&CMAJ7), &VoiceLeadingPolicy::jazz());
        let (sum, _) = movement_cost(&out, &CMAJ7);
        let (root_sum, _) = movement_cost(&dm7, &CMAJ7);
        assert!(sum <= root_sum);
    }

    #[test]
    fn test_tie_keeps_root_position() {
        // The previous voicing is the target itself: root position costs 0.
        let out = find_closest_voicing(&CMAJ7, Some(&CMAJ7), &VoiceLeadingPolicy::gospel());
        assert_eq!(out, CMAJ7);
    }

    #[test]
    fn test_fallback_when_all_rejected() {
        let policy = VoiceLeadingPolicy { max_movement: 0, allow_wide_voicings: false };
        let out = find_closest_voicing(&[61, 65, 68], Some(&[60, 64, 67]), &policy);
        assert_eq!(out.len(), 3);
        let (_, max) = movement_cost(&out, &[60, 64, 67]);
        assert_eq!(max, 1);
    }

    #[test]
    fn test_voice_progression_is_continuous() {
        let chords: Vec<ChordSymbol> = ["Cmaj7", "Am7", "Dm7", "G7"].iter().map(|s| chord(s)).collect();
        let voiced = voice_progression(&chords, 3, &VoiceLeadingPolicy::jazz()).unwrap();
        assert_eq!(voiced.len(), 4);
        for w in voiced.windows(2) {
            let (_, max) = movement_cost(&w[1], &w[0]);
            assert!(max <= 12);
        }
    }

    #[test]
    fn test_report_between_chords() {
        let r = analyze_voice_leading(&chord("G7"), &chord("C"));
        // G->G, B->C, D->C or E (2 either way; first found wins), F->E
        assert_eq!(r.movements[0], 0);
        assert_eq!(r.movements[1], 1);
        assert_eq!(r.movements[3], -1);
        assert_eq!(r.common_tones, vec![7]);
        assert!(r.smoothness > 0.7);
    }

    #[test]
    fn test_parallel_fifths_detected() {
        // C-G moving to D-A.
        let r = compare_voicings(&[48, 55], &[50, 57]);
        assert_eq!(r.parallel_fifths, vec![(0, 1)]);
        assert_eq!(r.motion.parallel, 1);
        let r = compare_voicings(&[48, 60], &[50, 62]);
        assert_eq!(r.parallel_octaves, vec![(0, 1)]);
    }

    #[test]
    fn test_progression_summary() {
        let chords: Vec<ChordSymbol> = ["Dm7", "G7", "Cmaj7"].iter().map(|s| chord(s)).collect();
        let p = analyze_progression_voice_leading(&chords);
        assert_eq!(p.transitions.len(), 2);
        assert!(p.overall_smoothness > 0.5);
        let single = analyze_progression_voice_leading(&chords[..1]);
        assert_eq!(single.overall_smoothness, 1.0);
        assert_eq!(single.rating, SmoothnessRating::Excellent);
    }
}
