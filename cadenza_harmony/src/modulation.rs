// Modulation detection and key-area mapping.
//
// A window of five chords slides across the progression. Each window gets
// its own key estimate; if that key differs from the running key and the
// window holds a cadence landing on its tonic, the arrival is a candidate
// modulation. A candidate is kept only when the chords after the arrival
// (up to four of them) all stay diatonic in the new key; otherwise the
// excursion is a tonicization, which is reported separately.
//
// Kept candidates are classified by the chords around the change, in
// order: pivot (a chord diatonic in both keys), chromatic (tonics a half
// step apart), common tone (a chord rooted on either tonic), else direct.
// Overlapping candidates are resolved by confidence, each survivor
// suppressing its neighbors.

use crate::cadence::{self, CadenceMatch};
use crate::chord::ChordSymbol;
use crate::key::{self, Key};
use crate::pitch;
use serde::{Deserialize, Serialize};

const WINDOW: usize = 5;
/// Chords after an arrival checked against the new key.
const CONFIRM_SPAN: usize = 4;
/// Shortest progression worth scanning.
const MIN_CHORDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationKind {
    Pivot,
    Chromatic,
    CommonTone,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRelationship {
    Same,
    Relative,
    Parallel,
    HalfStepUp,
    WholeStepUp,
    MinorThirdUp,
    MajorThirdUp,
    FourthUp,
    Tritone,
    FifthUp,
    MinorSixthUp,
    MajorSixthUp,
    MinorSeventhUp,
    HalfStepDown,
}

impl KeyRelationship {
    pub fn between(from: &Key, to: &Key) -> Self {
        if from.relative() == *to {
            return KeyRelationship::Relative;
        }
        let interval = pitch::interval(from.tonic, to.tonic);
        if interval == 0 {
            return if from.mode == to.mode {
                KeyRelationship::Same
            } else {
                KeyRelationship::Parallel
            };
        }
        match interval {
            1 => KeyRelationship::HalfStepUp,
            2 => KeyRelationship::WholeStepUp,
            3 => KeyRelationship::MinorThirdUp,
            4 => KeyRelationship::MajorThirdUp,
            5 => KeyRelationship::FourthUp,
            6 => KeyRelationship::Tritone,
            7 => KeyRelationship::FifthUp,
            8 => KeyRelationship::MinorSixthUp,
            9 => KeyRelationship::MajorSixthUp,
            10 => KeyRelationship::MinorSeventhUp,
            _ => KeyRelationship::HalfStepDown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationEvent {
    pub from: Key,
    pub to: Key,
    pub kind: ModulationKind,
    pub pivot: Option<ChordSymbol>,
    /// Index of the first chord of the confirming cadence.
    pub index: usize,
    pub confidence: f64,
    pub relationship: KeyRelationship,
}

/// A secondary dominant resolving to a chord other than the tonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tonicization {
    pub index: usize,
    pub dominant: ChordSymbol,
    pub target: ChordSymbol,
    /// Target root above the tonic, in semitones.
    pub target_degree: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyArea {
    pub key: Key,
    pub start: usize,
    pub end: usize,
}

impl KeyArea {
    pub fn chord_count(&self) -> usize {
        self.end + 1 - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStructure {
    pub initial_key: Key,
    pub final_key: Key,
    pub key_areas: Vec<KeyArea>,
    pub modulations: Vec<ModulationEvent>,
    pub tonicizations: Vec<Tonicization>,
    pub monotonal: bool,
    /// Number of distinct keys visited.
    pub key_diversity: usize,
}

/// Key of the opening: the estimate over the first eight chords.
pub fn initial_key(chords: &[ChordSymbol]) -> Option<Key> {
    let head = &chords[..chords.len().min(8)];
    key::estimate_key(head).map(|e| e.key)
}

/// First cadence in the window that lands on the window's own tonic.
fn window_cadence(window: &[ChordSymbol]) -> Option<(Key, CadenceMatch)> {
    let est = key::estimate_key(window)?;
    cadence::detect_cadences(window, &est.key)
        .into_iter()
        .find(|c| c.cadence.resolves_to_tonic())
        .map(|c| (est.key, c))
}

fn confirmed(chords: &[ChordSymbol], arrival: usize, key: &Key) -> bool {
    chords
        .iter()
        .skip(arrival + 1)
        .take(CONFIRM_SPAN)
        .all(|c| key.is_diatonic(c))
}

/// Classify a key change from the chords around it.
pub fn classify_modulation(
    context: &[ChordSymbol],
    from: &Key,
    to: &Key,
) -> (ModulationKind, Option<ChordSymbol>) {
    if let Some(pivot) = context
        .iter()
        .find(|c| from.is_diatonic(c) && to.is_diatonic(c))
    {
        return (ModulationKind::Pivot, Some(pivot.clone()));
    }
    if matches!(pitch::interval(from.tonic, to.tonic), 1 | 11) {
        return (ModulationKind::Chromatic, None);
    }
    if let Some(common) = context
        .iter()
        .find(|c| c.root == from.tonic || c.root == to.tonic)
    {
        return (ModulationKind::CommonTone, Some(common.clone()));
    }
    (ModulationKind::Direct, None)
}

/// Keep the most confident event in each neighborhood, then restore order.
fn filter_overlaps(mut events: Vec<ModulationEvent>) -> Vec<ModulationEvent> {
    events.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<ModulationEvent> = Vec::new();
    for event in events {
        let covered = kept
            .iter()
            .any(|k| event.index + 1 >= k.index && event.index <= k.index + 2);
        if !covered {
            kept.push(event);
        }
    }
    kept.sort_by_key(|e| e.index);
    kept
}

/// Modulations away from `initial` (estimated when `None`).
pub fn detect_modulations(chords: &[ChordSymbol], initial: Option<Key>) -> Vec<ModulationEvent> {
    if chords.len() < MIN_CHORDS {
        return Vec::new();
    }
    let Some(mut current) = initial.or_else(|| initial_key(chords)) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for i in 0..=chords.len().saturating_sub(WINDOW) {
        let window = &chords[i..(i + WINDOW).min(chords.len())];
        let Some((key, cadence)) = window_cadence(window) else {
            continue;
        };
        if key == current {
            continue;
        }
        let index = i + cadence.start;
        let arrival = i + cadence.end;
        if !confirmed(chords, arrival, &key) {
            continue;
        }
        let context = &chords[index.saturating_sub(1)..(index + 2).min(chords.len())];
        let (kind, pivot) = classify_modulation(context, &current, &key);
        log::debug!("modulation {current} -> {key} at chord {index} ({kind:?})");
        events.push(ModulationEvent {
            from: current,
            to: key,
            kind,
            pivot,
            index,
            confidence: cadence.confidence,
            relationship: KeyRelationship::between(&current, &key),
        });
        current = key;
    }
    filter_overlaps(events)
}

/// Secondary dominants resolving by falling fifth onto a non-tonic root.
pub fn detect_tonicizations(chords: &[ChordSymbol], key: &Key) -> Vec<Tonicization> {
    chords
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| {
            pair[0].is_dominant()
                && pitch::interval(pair[0].root, pair[1].root) == 5
                && pair[1].root != key.tonic
        })
        .map(|(i, pair)| Tonicization {
            index: i,
            dominant: pair[0].clone(),
            target: pair[1].clone(),
            target_degree: pitch::interval(key.tonic, pair[1].root),
        })
        .collect()
}

/// Key areas, modulations and tonicizations of a whole progression.
/// Returns `None` for an empty progression.
pub fn analyze_key_structure(chords: &[ChordSymbol]) -> Option<KeyStructure> {
    analyze_key_structure_from(chords, None)
}

/// Same as `analyze_key_structure`, starting in `initial` when supplied
/// instead of estimating the opening key.
pub fn analyze_key_structure_from(chords: &[ChordSymbol], initial: Option<Key>) -> Option<KeyStructure> {
    if chords.is_empty() {
        return None;
    }
    let initial = match initial {
        Some(k) => k,
        None => initial_key(chords)?,
    };
    let modulations = detect_modulations(chords, Some(initial));

    let mut key_areas = Vec::new();
    let mut current = initial;
    let mut start = 0;
    for m in &modulations {
        if m.index > start {
            key_areas.push(KeyArea {
                key: current,
                start,
                end: m.index - 1,
            });
        }
        current = m.to;
        start = m.index;
    }
    key_areas.push(KeyArea {
        key: current,
        start,
        end: chords.len() - 1,
    });

    let mut distinct: Vec<Key> = Vec::new();
    for area in &key_areas {
        if !distinct.contains(&area.key) {
            distinct.push(area.key);
        }
    }

    // Tonicizations are measured against whichever key is in force.
    let mut tonicizations = Vec::new();
    for area in &key_areas {
        let span = &chords[area.start..=area.end];
        for mut t in detect_tonicizations(span, &area.key) {
            t.index += area.start;
            tonicizations.push(t);
        }
    }

    Some(KeyStructure {
        initial_key: initial,
        final_key: current,
        monotonal: modulations.is_empty(),
        key_diversity: distinct.len(),
        key_areas,
        modulations,
        tonicizations,
    })
}

/// Whether `to` is a closely related key of `from` (same signature or one
/// step around the circle of fifths).
pub fn is_closely_related(from: &Key, to: &Key) -> bool {
    from.fifths_distance(to) <= 1
}
