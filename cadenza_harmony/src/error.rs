// Named failures for the harmony engine.
//
// Only input errors live here: malformed note names, unknown chord or scale
// symbols, out-of-range inversions and MIDI numbers, empty corpora, and the
// I/O or JSON failures of the config and corpus loaders. Analysis
// degradation (an unknown quality inside a progression, a progression too
// short to match anything) is never an error; analyzers return
// low-confidence or empty results instead.

use thiserror::Error;

/// Every recoverable failure the engine reports.
#[derive(Debug, Error)]
pub enum HarmonyError {
    /// A note name that is not a letter A-G followed by at most two
    /// accidentals of the same kind.
    #[error("invalid note name: {0:?}")]
    InvalidNoteName(String),

    /// A chord quality suffix missing from the chord catalog.
    #[error("unknown chord quality: {0:?}")]
    UnknownChordQuality(String),

    /// A scale name missing from the scale catalog.
    #[error("unknown scale: {0:?}")]
    UnknownScale(String),

    /// A key name that could not be parsed (e.g. "H minor").
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("inversion {inversion} is out of range for a chord of {len} notes")]
    InvalidInversion { inversion: usize, len: usize },

    #[error("MIDI note {0} is outside 0..=127")]
    MidiOutOfRange(i32),

    /// No trainable patterns for a style (missing style, or every pattern
    /// too short for the requested model order).
    #[error("no usable training patterns for style {0:?}")]
    EmptyCorpus(String),

    /// An n-gram order outside the supported range.
    #[error("n-gram order {0} is out of range")]
    InvalidOrder(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HarmonyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_input() {
        let err = HarmonyError::InvalidNoteName("H#".into());
        assert_eq!(err.to_string(), "invalid note name: \"H#\"");
        let err = HarmonyError::InvalidInversion { inversion: 4, len: 4 };
        assert!(err.to_string().contains("inversion 4"));
    }

    #[test]
    fn test_json_errors_convert() {
        let parse: std::result::Result<u8, _> = serde_json::from_str("not json");
        let err: HarmonyError = parse.unwrap_err().into();
        assert!(matches!(err, HarmonyError::Json(_)));
    }
}
