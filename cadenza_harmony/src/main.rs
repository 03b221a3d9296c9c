// Cadenza harmony engine, CLI entry point.
//
// Runs one engine operation over chord symbols given on the command line
// and prints a readable report, or the full result as JSON with `--json`.
//
// Usage:
//   cargo run -p cadenza_harmony -- analyze Dm7 G7 Cmaj7 [--key "C major"]
//   cargo run -p cadenza_harmony -- voice Dm7 G7 Cmaj7 [--genre jazz] [--octave 4]
//   cargo run -p cadenza_harmony -- reharm Dm7 G7 Cmaj7 [--key K] [--genre G]
//     [--level 1-5] [--min-score X]
//   cargo run -p cadenza_harmony -- tension Dm7 G7 Cmaj7 [--key K]
//   cargo run -p cadenza_harmony -- lick [--style bebop] [--length N]
//     [--temperature T] [--order N] [--seed N] [--root NOTE] [--genre G]
//
// Every subcommand accepts `--config PATH` (a HarmonyConfig JSON file) and
// `--json`. Set RUST_LOG=debug to see the engine's logging.

use cadenza_harmony::chord::{self, ChordEvent, ChordSymbol};
use cadenza_harmony::config::{Genre, HarmonyConfig};
use cadenza_harmony::humanize::{self, Hand, Humanizer};
use cadenza_harmony::key::Key;
use cadenza_harmony::licks::Characteristic;
use cadenza_harmony::markov::{GenerationParams, LickGenerator};
use cadenza_harmony::model_cache::{ModelCache, ModelKind};
use cadenza_harmony::pitch;
use cadenza_harmony::progression::analyze_progression;
use cadenza_harmony::reharm::{self, Placement};
use cadenza_harmony::tension;
use cadenza_harmony::voice_leading::{self, analyze_progression_voice_leading};
use cadenza_harmony::{HarmonyError, Result, licks};
use cadenza_prng::SeededRng;
use serde::Serialize;
use std::path::Path;

/// Flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &[
    "--key",
    "--genre",
    "--octave",
    "--level",
    "--min-score",
    "--style",
    "--length",
    "--temperature",
    "--order",
    "--seed",
    "--root",
    "--config",
];

const USAGE: &str = "usage: harmonize <analyze|voice|reharm|tension|lick> [CHORDS...] [--json] [--config PATH] ...";

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let rest = &args[1..];
    let outcome = match command.as_str() {
        "analyze" => cmd_analyze(rest),
        "voice" => cmd_voice(rest),
        "reharm" => cmd_reharm(rest),
        "tension" => cmd_tension(rest),
        "lick" => cmd_lick(rest),
        _ => {
            eprintln!("Unknown command '{command}'.\n{USAGE}");
            std::process::exit(2);
        }
    };
    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn cmd_analyze(args: &[String]) -> Result<()> {
    let symbols = positional(args);
    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let events = ChordEvent::sequence(&refs, 4.0)?;
    let key = parse_key(args)?;
    let analysis = analyze_progression(&events, key);
    if has_flag(args, "--json") {
        return print_json(&analysis);
    }

    println!("=== Progression: {} ===", refs.join(" "));
    match (analysis.key, &analysis.key_estimate) {
        (Some(k), Some(est)) => println!("Key: {k} (estimated, confidence {:.2})", est.confidence),
        (Some(k), None) => println!("Key: {k}"),
        (None, _) => println!("Key: unknown"),
    }
    if analysis.unspecified_chords > 0 {
        println!("  {} chord(s) with an unrecognized quality", analysis.unspecified_chords);
    }
    if let Some(functions) = &analysis.functions {
        println!("Functions:");
        for f in &functions.chords {
            println!("  {:<10} {:<8} {:<10} {}", f.chord.to_string(), f.roman, f.function.tag(), f.detail);
        }
        println!("  diatonic ratio {:.2}, {} secondary dominant(s)", functions.diatonic_ratio, functions.secondary_dominants);
    }
    if let Some(cadences) = &analysis.cadences {
        println!("Cadences ({:?}):", cadences.closure);
        for c in &cadences.cadences {
            println!("  {} at {}-{} ({:?}, confidence {:.2})", c.cadence.name(), c.start, c.end, c.strength, c.confidence);
        }
    }
    if let Some(structure) = &analysis.key_structure {
        if structure.monotonal {
            println!("Key structure: monotonal in {}", structure.initial_key);
        } else {
            println!("Key structure: {} -> {}", structure.initial_key, structure.final_key);
            for m in &structure.modulations {
                println!("  {} -> {} at {} ({:?})", m.from, m.to, m.index, m.kind);
            }
        }
        for t in &structure.tonicizations {
            println!("  tonicization of {} at {}", t.target, t.index);
        }
    }
    if !analysis.templates.matches.is_empty() {
        println!("Templates:");
        for m in &analysis.templates.matches {
            println!("  {:<24} {} ({:.2})", m.name, m.roman.join("-"), m.confidence);
        }
    }
    if !analysis.idioms.idioms.is_empty() {
        println!("Idioms:");
        for idiom in &analysis.idioms.idioms {
            println!("  {:?} at {}-{}", idiom.kind, idiom.start, idiom.end);
        }
    }
    if let Some(genre) = analysis.idioms.primary_genre {
        println!("Primary genre: {}", genre.name());
    }
    Ok(())
}

fn cmd_voice(args: &[String]) -> Result<()> {
    let chords = parse_chords(args)?;
    let config = load_config(args)?;
    let genre = genre_flag(args);
    let octave: i32 = parse_flag(args, "--octave").unwrap_or(4);
    let policy = config.voice_leading_policy(genre);
    let voicings = voice_leading::voice_progression(&chords, octave, &policy)?;
    let report = analyze_progression_voice_leading(&chords);
    if has_flag(args, "--json") {
        #[derive(Serialize)]
        struct VoiceOutput<'a> {
            voicings: &'a [Vec<u8>],
            report: &'a voice_leading::ProgressionVoiceLeading,
        }
        return print_json(&VoiceOutput { voicings: &voicings, report: &report });
    }

    println!("=== Voicings ({}, max movement {}) ===", genre.name(), policy.max_movement);
    for (chord, voicing) in chords.iter().zip(&voicings) {
        let names: Vec<String> = voicing.iter().map(|&m| pitch::midi_to_name(m, chord.prefer_sharps)).collect();
        println!("  {:<10} {:?}  {}", chord.to_string(), voicing, names.join(" "));
    }
    for (pair, step) in voicings.windows(2).zip(1..) {
        let r = voice_leading::compare_voicings(&pair[0], &pair[1]);
        println!(
            "  {} -> {}: total {} max {} smoothness {:.2}",
            step - 1,
            step,
            r.total_movement,
            r.max_movement,
            r.smoothness
        );
    }
    Ok(())
}

fn cmd_reharm(args: &[String]) -> Result<()> {
    let chords = parse_chords(args)?;
    let config = load_config(args)?;
    let key = parse_key(args)?;
    let genre = genre_flag(args);
    let level: u8 = parse_flag(args, "--level").unwrap_or(3);
    let min_score: f64 = parse_flag(args, "--min-score").unwrap_or(0.6);
    let Some(result) = reharm::reharmonize_progression(&chords, key, genre, level, &config) else {
        println!("Nothing to reharmonize.");
        return Ok(());
    };
    if has_flag(args, "--json") {
        return print_json(&result);
    }

    println!("=== Reharmonization in {} ({}, level <= {}) ===", result.key, genre.name(), level);
    for (i, chord) in chords.iter().enumerate() {
        println!("{i}: {chord}");
        for c in result.at(i).take(5) {
            let verb = match c.suggestion.placement {
                Placement::Replace => "replace with",
                Placement::InsertAfter => "insert after",
            };
            println!(
                "    {:<13} {:<8} {:.2}  {} ({})",
                verb,
                c.suggestion.replacement.to_string(),
                c.score,
                c.suggestion.technique.name(),
                c.suggestion.explanation
            );
        }
    }
    let best = result.apply_best(min_score);
    let names: Vec<String> = best.iter().map(ChordSymbol::to_string).collect();
    println!("Best (score >= {min_score}): {}", names.join(" "));
    Ok(())
}

fn cmd_tension(args: &[String]) -> Result<()> {
    let chords = parse_chords(args)?;
    let config = load_config(args)?;
    let key = parse_key(args)?;
    let Some(curve) = tension::analyze_tension(&chords, key, &config.tension) else {
        println!("No tension curve for an empty progression.");
        return Ok(());
    };
    if has_flag(args, "--json") {
        return print_json(&curve);
    }

    println!("=== Tension in {} ===", curve.key);
    for p in &curve.points {
        let bar = "#".repeat((p.value * 40.0).round() as usize);
        let flag = if p.non_diatonic { "*" } else { " " };
        println!("  {:<10}{flag} {:.2} {bar}", p.chord.to_string(), p.value);
    }
    println!(
        "average {:.2}, range {:.2}-{:.2}, climax at {}, shape {:?}",
        curve.average, curve.min, curve.max, curve.climax, curve.shape
    );
    println!("{}", curve.band.describe());
    for r in tension::recommendations(&curve) {
        println!("  [{:?}] {}", r.priority, r.message);
    }
    Ok(())
}

fn cmd_lick(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let style: String = parse_flag(args, "--style").unwrap_or_else(|| "bebop".to_string());
    let length: usize = parse_flag(args, "--length").unwrap_or(8);
    let temperature: f64 = parse_flag(args, "--temperature").unwrap_or(1.0);
    let order: Option<usize> = parse_flag(args, "--order");
    let seed: u64 = parse_flag(args, "--seed").unwrap_or_else(clock_seed);
    let root_name: String = parse_flag(args, "--root").unwrap_or_else(|| "C".to_string());
    let root = pitch::note_to_midi(&root_name, 4)?;
    let genre = genre_flag(args);

    let cache = ModelCache::global();
    let kind = match order {
        Some(n) => ModelKind::NGram(n),
        None => ModelKind::Markov,
    };
    let params = GenerationParams::new(length).with_temperature(temperature);
    let mut rng = SeededRng::new(seed);
    let offsets = cache.generate(&style, kind, &params, &mut rng)?;
    if offsets.is_empty() {
        return Err(HarmonyError::EmptyCorpus(style));
    }
    let tags: Vec<&str> = licks::detect_characteristics(&offsets, &[])
        .into_iter()
        .map(Characteristic::name)
        .collect();
    let notes = humanize::render_offsets(root, &offsets, &[], 90, Hand::Right)?;
    let notes = Humanizer::for_genre(genre, &config).humanize(&notes, &mut rng);
    if has_flag(args, "--json") {
        #[derive(Serialize)]
        struct LickOutput<'a> {
            style: &'a str,
            seed: u64,
            offsets: &'a [i8],
            characteristics: &'a [&'a str],
            notes: &'a [humanize::NoteEvent],
        }
        return print_json(&LickOutput {
            style: &style,
            seed,
            offsets: &offsets,
            characteristics: &tags,
            notes: &notes,
        });
    }

    let stats = match kind {
        ModelKind::Markov => cache.markov(&style)?.stats(),
        ModelKind::NGram(n) => cache.ngram(&style, n)?.stats(),
    };
    println!("=== {style} lick (seed {seed}) ===");
    println!("Model: {} patterns, {} states", stats.pattern_count, stats.state_count);
    println!("Offsets: {offsets:?}");
    println!("Characteristics: {}", tags.join(", "));
    for n in &notes {
        println!(
            "  {:>6.3}  {:<4} vel {:>3} {:?}",
            n.time,
            pitch::midi_to_name(n.pitch, true),
            n.velocity,
            n.kind
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip = false;
    for a in args {
        if skip {
            skip = false;
        } else if a.starts_with("--") {
            skip = VALUE_FLAGS.contains(&a.as_str());
        } else {
            out.push(a.clone());
        }
    }
    out
}

fn parse_chords(args: &[String]) -> Result<Vec<ChordSymbol>> {
    let symbols = positional(args);
    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    chord::parse_progression(&refs)
}

fn parse_key(args: &[String]) -> Result<Option<Key>> {
    parse_flag::<String>(args, "--key").map(|k| Key::parse(&k)).transpose()
}

fn genre_flag(args: &[String]) -> Genre {
    parse_flag::<String>(args, "--genre").map_or(Genre::Gospel, |g| Genre::parse(&g))
}

fn load_config(args: &[String]) -> Result<HarmonyConfig> {
    match parse_flag::<String>(args, "--config") {
        Some(path) => HarmonyConfig::load(Path::new(&path)),
        None => Ok(HarmonyConfig::builtin().clone()),
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
