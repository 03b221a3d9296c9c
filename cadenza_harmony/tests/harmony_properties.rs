// End-to-end properties of the analysis and voicing engine, exercised only
// through the public API.

use cadenza_harmony::cadence::{CadenceType, analyze_cadences};
use cadenza_harmony::chord::{ChordEvent, ChordSymbol, parse_progression};
use cadenza_harmony::config::{Genre, HarmonyConfig, VoiceLeadingPolicy};
use cadenza_harmony::key::Key;
use cadenza_harmony::pitch::{self, interval, note_to_semitone};
use cadenza_harmony::progression::analyze_progression;
use cadenza_harmony::reharm::{Technique, reharmonize_progression, tritone_sub};
use cadenza_harmony::tension::{analyze_tension, chord_tension};
use cadenza_harmony::voice_leading::{find_closest_voicing, movement_cost};
use cadenza_harmony::voicing::{inversion, root_midi};
use cadenza_harmony::HarmonyError;

fn chord(s: &str) -> ChordSymbol {
    ChordSymbol::parse(s).unwrap()
}

fn close(symbol: &str, octave: i32) -> Vec<u8> {
    let c = chord(symbol);
    let root = root_midi(c.root, octave);
    c.intervals().iter().map(|&iv| (root + iv as i32) as u8).collect()
}

#[test]
fn pitch_algebra_is_closed_mod_12() {
    assert_eq!(note_to_semitone("C#").unwrap(), note_to_semitone("Db").unwrap());
    for pc in 0..12u8 {
        for n in -30..30 {
            let there = pitch::transpose(pc, n);
            assert!(there < 12);
            assert_eq!(pitch::transpose(there, -n), pc);
        }
        for other in 0..12u8 {
            assert_eq!((interval(pc, other) + interval(other, pc)) % 12, 0);
        }
    }
}

#[test]
fn input_errors_are_named() {
    assert!(matches!(note_to_semitone("H"), Err(HarmonyError::InvalidNoteName(_))));
    assert!(matches!(ChordSymbol::parse("Cfoo"), Err(HarmonyError::UnknownChordQuality(_))));
    assert!(matches!(
        inversion(&[0, 4, 7], 3),
        Err(HarmonyError::InvalidInversion { inversion: 3, len: 3 })
    ));
    assert!(matches!(Key::parse("H minor"), Err(HarmonyError::InvalidKey(_))));
}

#[test]
fn seventh_chord_inversions() {
    let maj7 = chord("Cmaj7");
    let iv = maj7.intervals();
    assert_eq!(iv, &[0, 4, 7, 11]);
    assert_eq!(inversion(iv, 1).unwrap(), vec![0, 3, 7, 8]);
    assert_eq!(inversion(iv, 2).unwrap(), vec![0, 4, 5, 9]);
    assert_eq!(inversion(iv, 3).unwrap(), vec![0, 1, 5, 8]);
}

#[test]
fn optimizer_without_previous_returns_input() {
    let g7 = close("G7", 3);
    let out = find_closest_voicing(&g7, None, &VoiceLeadingPolicy::classical());
    assert_eq!(out, g7);
}

#[test]
fn classical_voice_leading_never_leaps_past_a_fifth() {
    let previous = close("Cmaj7", 4);
    let policy = HarmonyConfig::default().voice_leading_policy(Genre::Classical);
    for octave in 3..=4 {
        let target = close("G7", octave);
        let out = find_closest_voicing(&target, Some(&previous), &policy);
        let (_, max) = movement_cost(&out, &previous);
        assert!(max <= 7, "octave {octave}: moved {max}");
    }
}

#[test]
fn basic_cadences_in_c() {
    let c = Some(Key::major(0));
    let kind = |symbols: &[&str]| {
        let chords = parse_progression(symbols).unwrap();
        analyze_cadences(&chords, c).unwrap().final_cadence
    };
    assert_eq!(kind(&["G7", "Cmaj7"]), Some(CadenceType::PerfectAuthentic));
    assert_eq!(kind(&["F", "C"]), Some(CadenceType::Plagal));
    assert_eq!(kind(&["G7", "Am7"]), Some(CadenceType::Deceptive));
}

#[test]
fn tritone_substitution() {
    let sub = tritone_sub(&chord("G7")).unwrap();
    assert_eq!(sub.replacement.root, 1);
    assert!(sub.replacement.is_dominant());
    assert!(matches!(sub.replacement.name().as_str(), "Db7" | "C#7"));
    assert!(tritone_sub(&chord("Cmaj7")).is_none());
}

#[test]
fn tonic_is_calmer_than_dominant() {
    let weights = HarmonyConfig::default().tension;
    for tonic in 0..12u8 {
        let key = Key::major(tonic);
        let one = ChordSymbol::new(tonic, "").unwrap();
        let five = ChordSymbol::new(pitch::transpose(tonic, 7), "7").unwrap();
        let t1 = chord_tension(&one, &key, None, &weights).value;
        let t5 = chord_tension(&five, &key, None, &weights).value;
        assert!(t1 < t5, "key {tonic}: I {t1} vs V7 {t5}");
    }
}

#[test]
fn tension_curve_resolves_at_the_end() {
    let chords = parse_progression(&["C", "F", "G7", "C"]).unwrap();
    let weights = HarmonyConfig::default().tension;
    let curve = analyze_tension(&chords, None, &weights).unwrap();
    assert_eq!(curve.key, Key::major(0));
    assert_eq!(curve.climax, 2);
    assert!(curve.resolutions.contains(&3));
}

#[test]
fn unknown_quality_degrades_instead_of_failing() {
    let events = ChordEvent::sequence(&["Dm7", "G7", "Cxyz"], 4.0).unwrap();
    let analysis = analyze_progression(&events, None);
    assert_eq!(analysis.unspecified_chords, 1);
    assert!(analysis.key.is_some());
}

#[test]
fn jazz_reharmonization_offers_a_tritone_sub_for_the_dominant() {
    let chords = parse_progression(&["Dm7", "G7", "Cmaj7"]).unwrap();
    let config = HarmonyConfig::default();
    let result = reharmonize_progression(&chords, None, Genre::Jazz, 3, &config).unwrap();
    assert_eq!(result.key, Key::major(0));
    let tritone = result
        .at(1)
        .find(|c| c.suggestion.technique == Technique::TritoneSubstitution)
        .unwrap();
    assert_eq!(tritone.suggestion.replacement.root, 1);
    assert!(result.candidates.iter().all(|c| c.suggestion.level <= 3));
    assert!(result.candidates.iter().all(|c| c.score >= 0.0 && c.score <= 1.0 + 1e-9));
}

#[test]
fn config_round_trips_through_a_file() {
    let mut config = HarmonyConfig::default();
    config.tension.quality = 0.5;
    let path = std::env::temp_dir().join(format!("cadenza_config_{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
    let loaded = HarmonyConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.tension.quality, 0.5);
    assert_eq!(loaded.voice_leading, config.voice_leading);
    assert!(matches!(
        HarmonyConfig::load(std::env::temp_dir().join("cadenza_missing.json")),
        Err(HarmonyError::Io(_))
    ));
}
