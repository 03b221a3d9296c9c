// Cadenza harmony engine
//
// Models chords, scales and intervals as values over a closed mod-12 pitch
// algebra and reasons about them: analyzing chord sequences for key,
// function, cadence and idiom, voicing chords under voice-leading
// constraints, proposing scored reharmonizations, measuring tension, and
// generating licks from per-style Markov and n-gram models.
//
// Architecture:
// - pitch.rs: Pitch classes, note names, intervals, MIDI and key signatures
// - scale.rs / chord.rs: Scale and chord-quality catalogs, chord symbols
// - voicing.rs: Voicing generators (inversions, drops, rootless, quartal...)
// - voicing_analysis.rs: Shape classification and complexity of a voicing
// - voice_leading.rs: Minimal-movement voicing search and motion reports
// - key.rs: Keys and key estimation from a chord sequence
// - function.rs / cadence.rs / modulation.rs: Key-relative progression passes
// - templates.rs / idioms.rs: Named progression patterns and genre idioms
// - progression.rs: Runs every analysis pass over one progression
// - reharm.rs: Substitution techniques and multi-axis candidate scoring
// - tension.rs: Per-chord tension, curve shape and recommendations
// - licks.rs: Annotated lick corpus and characteristic tagging
// - markov.rs / ngram.rs: Trained lick models with temperature sampling
// - model_cache.rs: Lazily trained models shared across callers
// - humanize.rs: Rendering licks to notes and grooving them per genre
// - config.rs: Genre policies and scoring tables, loadable from JSON
//
// Every analysis is pure. Randomness always comes from a caller-supplied
// `cadenza_prng::RandomSource`, so a fixed seed reproduces any result.

pub mod cadence;
pub mod chord;
pub mod config;
pub mod error;
pub mod function;
pub mod humanize;
pub mod idioms;
pub mod key;
pub mod licks;
pub mod markov;
pub mod model_cache;
pub mod modulation;
pub mod ngram;
pub mod pitch;
pub mod progression;
pub mod reharm;
pub mod scale;
pub mod templates;
pub mod tension;
pub mod voice_leading;
pub mod voicing;
pub mod voicing_analysis;

pub use error::{HarmonyError, Result};
