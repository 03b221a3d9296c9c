// Whole-progression analysis.
//
// A thin orchestrator: the analyzers in `function`, `cadence`,
// `modulation`, `templates` and `idioms` are independent pure passes, and
// this module runs them all over one `ChordEvent` sequence with a shared
// key. A supplied key also opens the key-structure pass; otherwise that
// pass estimates its own starting key from the opening chords. Nothing here
// fails on degraded input; an empty progression simply yields empty
// sections.

use crate::cadence::{self, CadenceAnalysis};
use crate::chord::{self, ChordEvent, ChordSymbol, QualityFamily};
use crate::function::{self, FunctionAnalysis};
use crate::idioms::{self, IdiomAnalysis};
use crate::key::{self, Key, KeyEstimate};
use crate::modulation::{self, KeyStructure};
use crate::templates::{self, TemplateSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionAnalysis {
    pub chords: Vec<ChordSymbol>,
    /// Key used by the key-relative passes.
    pub key: Option<Key>,
    /// Present when the key was estimated rather than supplied.
    pub key_estimate: Option<KeyEstimate>,
    pub functions: Option<FunctionAnalysis>,
    pub cadences: Option<CadenceAnalysis>,
    pub key_structure: Option<KeyStructure>,
    pub templates: TemplateSummary,
    pub idioms: IdiomAnalysis,
    /// Chords whose quality was not in the catalog.
    pub unspecified_chords: usize,
    /// End of the last event, in beats.
    pub total_beats: f64,
}

/// Run every analyzer over `events`, using `key` when supplied and the
/// estimate otherwise.
pub fn analyze_progression(events: &[ChordEvent], key: Option<Key>) -> ProgressionAnalysis {
    let chords = chord::symbols_of(events);
    analyze_chords(&chords, key, total_beats(events))
}

/// Same as `analyze_progression` for bare symbols.
pub fn analyze_symbols(chords: &[ChordSymbol], key: Option<Key>) -> ProgressionAnalysis {
    analyze_chords(chords, key, chords.len() as f64)
}

fn total_beats(events: &[ChordEvent]) -> f64 {
    events
        .iter()
        .map(|e| e.start + e.duration)
        .fold(0.0, f64::max)
}

fn analyze_chords(chords: &[ChordSymbol], key: Option<Key>, total_beats: f64) -> ProgressionAnalysis {
    let supplied = key;
    let key_estimate = match key {
        Some(_) => None,
        None => key::estimate_key(chords),
    };
    let key = key.or(key_estimate.map(|e| e.key));

    let unspecified_chords = chords
        .iter()
        .filter(|c| c.family() == QualityFamily::Unspecified)
        .count();
    if unspecified_chords > 0 {
        log::debug!("{unspecified_chords} chords with unspecified quality");
    }

    ProgressionAnalysis {
        chords: chords.to_vec(),
        key,
        key_estimate,
        functions: key.and_then(|k| function::analyze_functions(chords, Some(k))),
        cadences: key.and_then(|k| cadence::analyze_cadences(chords, Some(k))),
        key_structure: modulation::analyze_key_structure_from(chords, supplied),
        templates: templates::summarize_templates(chords),
        idioms: idioms::analyze_idioms(chords),
        unspecified_chords,
        total_beats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::{CadenceType, Closure};
    use crate::config::Genre;

    #[test]
    fn test_full_analysis() {
        let events = ChordEvent::sequence(&["Dm7", "G7", "Cmaj7", "A7", "Dm7", "G7", "Cmaj7"], 4.0).unwrap();
        let a = analyze_progression(&events, None);
        assert_eq!(a.key, Some(Key::major(0)));
        assert!(a.key_estimate.is_some());
        assert_eq!(a.total_beats, 28.0);
        let cadences = a.cadences.unwrap();
        assert_eq!(cadences.final_cadence, Some(CadenceType::PerfectAuthentic));
        assert_eq!(cadences.closure, Closure::Closed);
        assert_eq!(a.functions.unwrap().secondary_dominants, 1);
        assert!(a.key_structure.unwrap().monotonal);
        assert!(a.templates.matches.iter().any(|m| m.name == "ii_v_i_major"));
        assert_eq!(a.idioms.primary_genre, Some(Genre::Jazz));
        assert_eq!(a.unspecified_chords, 0);
    }

    #[test]
    fn test_supplied_key_and_degraded_input() {
        let events = ChordEvent::sequence(&["Fsomething", "C"], 2.0).unwrap();
        let a = analyze_progression(&events, Some(Key::major(0)));
        assert_eq!(a.key, Some(Key::major(0)));
        assert!(a.key_estimate.is_none());
        assert_eq!(a.unspecified_chords, 1);
        let cadences = a.cadences.unwrap();
        assert_eq!(cadences.cadences[0].cadence, CadenceType::Plagal);
        assert!(cadences.cadences[0].confidence < 0.9);
    }

    #[test]
    fn test_supplied_key_starts_key_structure() {
        let events = ChordEvent::sequence(&["Am", "Dm", "E7", "Am"], 4.0).unwrap();
        let a = analyze_progression(&events, Some(Key::major(0)));
        assert_eq!(a.key_structure.unwrap().initial_key, Key::major(0));
    }

    #[test]
    fn test_empty_progression() {
        let a = analyze_progression(&[], None);
        assert!(a.key.is_none());
        assert!(a.functions.is_none());
        assert!(a.cadences.is_none());
        assert!(a.key_structure.is_none());
        assert!(a.templates.matches.is_empty());
        assert_eq!(a.total_beats, 0.0);
    }
}
