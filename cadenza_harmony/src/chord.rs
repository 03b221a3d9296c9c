// Chord catalog, chord symbols, and chord events.
//
// The catalog is a `const` table of `ChordType`s: a primary symbol, the
// root-relative interval set, a category, and aliases. A lazily built index
// maps every symbol and alias to its entry. Quality lookup is exact first,
// then lowercase, so "M7" stays major seventh while "MAJ7" still resolves.
//
// `ChordQuality` is a closed variant with an explicit `Unknown` case that
// keeps the original text. Strict parsing (`ChordSymbol::parse`) rejects an
// unknown quality with `UnknownChordQuality`; lenient parsing keeps it as
// `Unknown` so the analyzers can degrade instead of failing.
//
// `QualityFamily` is derived from the interval content rather than the
// symbol, so "7", "9", "13b9" and "7alt" are all `Dominant`.

use crate::error::{HarmonyError, Result};
use crate::pitch::{self, PitchClass};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChordCategory {
    Triad,
    Seventh,
    Extended,
    Altered,
    Add,
    Sixth,
    Suspended,
    Lydian,
    Quartal,
    Quintal,
    Cluster,
    Special,
}

/// Broad harmonic family of a chord quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityFamily {
    Major,
    Minor,
    Dominant,
    HalfDiminished,
    Diminished,
    Augmented,
    Suspended,
    Power,
    /// Quartal, quintal and cluster sonorities.
    Other,
    /// Quality text not present in the catalog.
    Unspecified,
}

impl QualityFamily {
    pub fn is_major_like(self) -> bool {
        matches!(self, QualityFamily::Major | QualityFamily::Augmented)
    }

    pub fn is_minor_like(self) -> bool {
        matches!(
            self,
            QualityFamily::Minor | QualityFamily::HalfDiminished | QualityFamily::Diminished
        )
    }
}

/// One catalog entry.
#[derive(Debug, PartialEq, Eq)]
pub struct ChordType {
    pub name: &'static str,
    pub symbol: &'static str,
    pub intervals: &'static [u8],
    pub category: ChordCategory,
    pub aliases: &'static [&'static str],
}

impl ChordType {
    /// Bit `i` set when interval class `i` occurs in the chord.
    pub fn interval_mask(&self) -> u16 {
        self.intervals
            .iter()
            .fold(0u16, |mask, &iv| mask | 1 << (iv % 12))
    }

    pub fn family(&self) -> QualityFamily {
        match self.category {
            ChordCategory::Quartal | ChordCategory::Quintal | ChordCategory::Cluster => {
                return QualityFamily::Other;
            }
            _ => {}
        }
        if self.intervals == [0, 7] {
            return QualityFamily::Power;
        }
        let mask = self.interval_mask();
        let has = |iv: u8| mask & (1 << iv) != 0;
        if has(4) && has(10) {
            QualityFamily::Dominant
        } else if has(3) && has(6) && has(10) {
            QualityFamily::HalfDiminished
        } else if has(3) && has(6) {
            QualityFamily::Diminished
        } else if has(4) && has(8) {
            QualityFamily::Augmented
        } else if has(4) {
            QualityFamily::Major
        } else if has(3) {
            QualityFamily::Minor
        } else if has(10) {
            // 7sus4, 9sus: dominant function without a third.
            QualityFamily::Dominant
        } else {
            QualityFamily::Suspended
        }
    }
}

macro_rules! chord {
    ($name:expr, $symbol:expr, [$($iv:expr),*], $cat:ident, [$($alias:expr),*]) => {
        ChordType {
            name: $name,
            symbol: $symbol,
            intervals: &[$($iv),*],
            category: ChordCategory::$cat,
            aliases: &[$($alias),*],
        }
    };
}

const CHORDS: &[ChordType] = &[
    // Triads
    chord!("Major Triad", "", [0, 4, 7], Triad, ["major", "M", "maj"]),
    chord!("Minor Triad", "m", [0, 3, 7], Triad, ["minor", "-", "min"]),
    chord!("Diminished Triad", "dim", [0, 3, 6], Triad, ["°", "o"]),
    chord!("Augmented Triad", "aug", [0, 4, 8], Triad, ["+"]),
    chord!("Suspended 2nd", "sus2", [0, 2, 7], Triad, []),
    chord!("Suspended 4th", "sus4", [0, 5, 7], Triad, ["sus"]),
    // Sevenths
    chord!("Major 7th", "maj7", [0, 4, 7, 11], Seventh, ["Δ7", "M7", "Δ", "Maj7"]),
    chord!("Minor 7th", "m7", [0, 3, 7, 10], Seventh, ["min7", "-7"]),
    chord!("Dominant 7th", "7", [0, 4, 7, 10], Seventh, ["dom7"]),
    chord!("Minor-Major 7th", "mMaj7", [0, 3, 7, 11], Seventh, ["m(M7)", "mM7", "m(maj7)"]),
    chord!("Half-Diminished 7th", "m7b5", [0, 3, 6, 10], Seventh, ["ø7", "ø", "min7b5", "-7b5"]),
    chord!("Fully Diminished 7th", "dim7", [0, 3, 6, 9], Seventh, ["°7", "o7"]),
    chord!("Augmented Major 7th", "augMaj7", [0, 4, 8, 11], Seventh, ["Maj7#5", "maj7#5"]),
    chord!("Augmented 7th", "7#5", [0, 4, 8, 10], Seventh, ["aug7", "+7"]),
    // Extended
    chord!("Major 9th", "maj9", [0, 4, 7, 11, 14], Extended, ["Δ9", "M9"]),
    chord!("Minor 9th", "m9", [0, 3, 7, 10, 14], Extended, ["min9", "-9"]),
    chord!("Dominant 9th", "9", [0, 4, 7, 10, 14], Extended, ["dom9"]),
    chord!("Major 11th", "maj11", [0, 4, 7, 11, 14, 17], Extended, ["Δ11"]),
    chord!("Minor 11th", "m11", [0, 3, 7, 10, 14, 17], Extended, ["min11", "-11"]),
    chord!("Dominant 11th", "11", [0, 4, 7, 10, 14, 17], Extended, []),
    chord!("Major 13th", "maj13", [0, 4, 7, 11, 14, 21], Extended, ["Δ13"]),
    chord!("Minor 13th", "m13", [0, 3, 7, 10, 14, 21], Extended, ["min13", "-13"]),
    chord!("Dominant 13th", "13", [0, 4, 7, 10, 14, 21], Extended, []),
    chord!("Minor 11 flat 5", "m11b5", [0, 3, 6, 10, 14, 17], Extended, ["ø11"]),
    // Altered dominants
    chord!("Dominant 7 flat 9", "7b9", [0, 4, 7, 10, 13], Altered, []),
    chord!("Dominant 7 sharp 9", "7#9", [0, 4, 7, 10, 15], Altered, []),
    chord!("Dominant 7 flat 5", "7b5", [0, 4, 6, 10], Altered, []),
    chord!("Dominant 7 sharp 11", "7#11", [0, 4, 7, 10, 18], Altered, []),
    chord!("Altered Dominant", "7alt", [0, 4, 6, 8, 10, 13, 15], Altered, ["alt"]),
    chord!("Dominant 13 flat 9", "13b9", [0, 4, 7, 10, 13, 21], Altered, []),
    chord!("Dominant 13 sharp 11", "13#11", [0, 4, 7, 10, 14, 18, 21], Altered, []),
    chord!("Dominant 7 flat 9 sharp 9", "7b9#9", [0, 4, 7, 10, 13, 15], Altered, ["7alt2"]),
    chord!("Dominant 7 flat 9 sharp 5", "7b9#5", [0, 4, 8, 10, 13], Altered, []),
    chord!("Dominant 7 sharp 9 sharp 5", "7#9#5", [0, 4, 8, 10, 15], Altered, []),
    chord!("Augmented 9th", "aug9", [0, 4, 8, 14], Altered, ["+9"]),
    // Added tones
    chord!("Add 9", "add9", [0, 4, 7, 14], Add, ["add2"]),
    chord!("Add 11", "add11", [0, 4, 7, 17], Add, ["add4"]),
    chord!("Minor Add 9", "madd9", [0, 3, 7, 14], Add, ["m(add9)"]),
    chord!("Add 13", "add13", [0, 4, 7, 21], Add, []),
    chord!("Minor Add 13", "madd13", [0, 3, 7, 21], Add, []),
    chord!("6/9", "6/9", [0, 4, 7, 9, 14], Add, ["69"]),
    // Sixths
    chord!("Major 6th", "6", [0, 4, 7, 9], Sixth, ["M6", "add6", "maj6"]),
    chord!("Minor 6th", "m6", [0, 3, 7, 9], Sixth, ["min6", "-6"]),
    chord!("Minor 6/9", "m6/9", [0, 3, 7, 9, 14], Sixth, ["m69"]),
    // Suspended
    chord!("Dominant 7 sus4", "7sus4", [0, 5, 7, 10], Suspended, ["7sus"]),
    chord!("Dominant 9 sus4", "9sus", [0, 5, 7, 10, 14], Suspended, ["9sus4"]),
    chord!("Dominant 13 sus4", "13sus", [0, 5, 7, 10, 14, 21], Suspended, ["13sus4"]),
    // Lydian
    chord!("Major 7 sharp 11", "maj7#11", [0, 4, 7, 11, 18], Lydian, ["Δ7#11", "Maj7#11"]),
    chord!("Major 9 sharp 11", "maj9#11", [0, 4, 7, 11, 14, 18], Lydian, ["Δ9#11"]),
    // Stacked and cluster sonorities
    chord!("Quartal Chord", "quartal", [0, 5, 10], Quartal, ["4ths"]),
    chord!("Quintal Chord", "quintal", [0, 7, 14], Quintal, ["5stacked"]),
    chord!("Minor 2nd Cluster", "cluster", [0, 1, 7], Cluster, []),
    // Special
    chord!("Power Chord", "5", [0, 7], Special, ["no3"]),
];

/// Symbol/alias → index into `CHORDS`.
static CHORD_INDEX: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    let mut index = BTreeMap::new();
    for (i, chord) in CHORDS.iter().enumerate() {
        index.insert(chord.symbol, i);
        for alias in chord.aliases {
            index.entry(*alias).or_insert(i);
        }
    }
    index
});

/// Look up a quality by symbol or alias: exact match first, then lowercase.
pub fn chord_type(quality: &str) -> Result<&'static ChordType> {
    let index = &*CHORD_INDEX;
    index
        .get(quality)
        .or_else(|| index.get(quality.to_lowercase().as_str()))
        .map(|&i| &CHORDS[i])
        .ok_or_else(|| HarmonyError::UnknownChordQuality(quality.to_string()))
}

/// Major triad entry; used where a caller explicitly asks for a default.
pub fn major_triad() -> &'static ChordType {
    &CHORDS[0]
}

pub fn all_chord_types() -> &'static [ChordType] {
    CHORDS
}

pub fn chords_in_category(category: ChordCategory) -> Vec<&'static ChordType> {
    CHORDS.iter().filter(|c| c.category == category).collect()
}

/// Pitch classes of `quality` built on `root`, in interval order.
pub fn chord_notes(root: &str, quality: &str) -> Result<Vec<PitchClass>> {
    let root = pitch::note_to_semitone(root)?;
    let chord = chord_type(quality)?;
    Ok(chord
        .intervals
        .iter()
        .map(|&iv| pitch::transpose(root, iv as i32))
        .collect())
}

/// Note names of `quality` built on `root`.
pub fn chord_note_names(root: &str, quality: &str, prefer_sharps: bool) -> Result<Vec<&'static str>> {
    Ok(chord_notes(root, quality)?
        .into_iter()
        .map(|pc| pitch::semitone_to_note(pc as i32, prefer_sharps))
        .collect())
}

// ---------------------------------------------------------------------------
// Quality and symbol
// ---------------------------------------------------------------------------

/// A chord quality: a catalog entry, or the original text when the catalog
/// has no match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChordQuality {
    Known(&'static ChordType),
    Unknown(String),
}

impl ChordQuality {
    pub fn lookup(quality: &str) -> Result<Self> {
        chord_type(quality).map(ChordQuality::Known)
    }

    pub fn lookup_lenient(quality: &str) -> Self {
        match chord_type(quality) {
            Ok(ct) => ChordQuality::Known(ct),
            Err(_) => {
                log::debug!("unknown chord quality {quality:?}, keeping as unspecified");
                ChordQuality::Unknown(quality.to_string())
            }
        }
    }

    pub fn family(&self) -> QualityFamily {
        match self {
            ChordQuality::Known(ct) => ct.family(),
            ChordQuality::Unknown(_) => QualityFamily::Unspecified,
        }
    }

    /// The catalog symbol, or the original text for an unknown quality.
    pub fn symbol(&self) -> &str {
        match self {
            ChordQuality::Known(ct) => ct.symbol,
            ChordQuality::Unknown(s) => s.as_str(),
        }
    }

    pub fn chord_type(&self) -> Option<&'static ChordType> {
        match self {
            ChordQuality::Known(ct) => Some(ct),
            ChordQuality::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ChordQuality::Known(_))
    }
}

/// Root, quality and optional slash bass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordSymbol {
    pub root: PitchClass,
    pub quality: ChordQuality,
    pub bass: Option<PitchClass>,
    /// Spell the root with sharps when rendering the name.
    pub prefer_sharps: bool,
}

/// Split "F#m7b5/A" into ("F#", "m7b5", Some("A")). The slash is a bass
/// separator only when what follows parses as a note, so "C6/9" keeps its
/// quality intact.
fn split_symbol(text: &str) -> Result<(&str, &str, Option<&str>)> {
    let text = text.trim();
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return Err(HarmonyError::InvalidNoteName(text.to_string())),
    }
    let mut root_end = text.len();
    for (i, c) in chars {
        if !matches!(c, '#' | 'b' | '♯' | '♭') {
            root_end = i;
            break;
        }
    }
    let (root, rest) = text.split_at(root_end);
    if let Some(slash) = rest.rfind('/') {
        let candidate = &rest[slash + 1..];
        if !candidate.is_empty() && pitch::note_to_semitone(candidate).is_ok() {
            return Ok((root, &rest[..slash], Some(candidate)));
        }
    }
    Ok((root, rest, None))
}

impl ChordSymbol {
    pub fn new(root: PitchClass, quality: &str) -> Result<Self> {
        Ok(ChordSymbol {
            root: root % 12,
            quality: ChordQuality::lookup(quality)?,
            bass: None,
            prefer_sharps: false,
        })
    }

    pub fn from_type(root: PitchClass, chord: &'static ChordType) -> Self {
        ChordSymbol {
            root: root % 12,
            quality: ChordQuality::Known(chord),
            bass: None,
            prefer_sharps: false,
        }
    }

    /// Parse a chord symbol. Unknown qualities fail with `UnknownChordQuality`.
    pub fn parse(text: &str) -> Result<Self> {
        let (root, quality, bass) = split_symbol(text)?;
        Ok(ChordSymbol {
            root: pitch::note_to_semitone(root)?,
            quality: ChordQuality::lookup(quality)?,
            bass: bass.map(pitch::note_to_semitone).transpose()?,
            prefer_sharps: !pitch::is_flat_spelling(root),
        })
    }

    /// Parse a chord symbol, keeping an unknown quality as
    /// `ChordQuality::Unknown`. The root must still be a valid note.
    pub fn parse_lenient(text: &str) -> Result<Self> {
        let (root, quality, bass) = split_symbol(text)?;
        Ok(ChordSymbol {
            root: pitch::note_to_semitone(root)?,
            quality: ChordQuality::lookup_lenient(quality),
            bass: bass.map(pitch::note_to_semitone).transpose()?,
            prefer_sharps: !pitch::is_flat_spelling(root),
        })
    }

    pub fn with_bass(mut self, bass: PitchClass) -> Self {
        self.bass = Some(bass % 12);
        self
    }

    pub fn flat_spelling(mut self) -> Self {
        self.prefer_sharps = false;
        self
    }

    pub fn family(&self) -> QualityFamily {
        self.quality.family()
    }

    pub fn is_dominant(&self) -> bool {
        self.family() == QualityFamily::Dominant
    }

    /// Root-relative intervals. An unknown quality yields only the root.
    pub fn intervals(&self) -> &'static [u8] {
        match &self.quality {
            ChordQuality::Known(ct) => ct.intervals,
            ChordQuality::Unknown(_) => &[0],
        }
    }

    /// Pitch classes in interval order.
    pub fn notes(&self) -> Vec<PitchClass> {
        self.intervals()
            .iter()
            .map(|&iv| pitch::transpose(self.root, iv as i32))
            .collect()
    }

    /// Lowest sounding pitch class: the slash bass, else the root.
    pub fn bass_note(&self) -> PitchClass {
        self.bass.unwrap_or(self.root)
    }

    /// Whether the slash bass is a chord tone other than the root.
    pub fn is_inverted(&self) -> bool {
        match self.bass {
            Some(b) => b != self.root && self.notes().contains(&b),
            None => false,
        }
    }

    /// Number of shared pitch classes.
    pub fn common_tones(&self, other: &ChordSymbol) -> usize {
        let mine = self.notes();
        let mut theirs = other.notes();
        theirs.sort_unstable();
        theirs.dedup();
        theirs.iter().filter(|pc| mine.contains(pc)).count()
    }

    pub fn transpose(&self, semitones: i32) -> Self {
        ChordSymbol {
            root: pitch::transpose(self.root, semitones),
            quality: self.quality.clone(),
            bass: self.bass.map(|b| pitch::transpose(b, semitones)),
            prefer_sharps: self.prefer_sharps,
        }
    }

    /// Rendered symbol, e.g. "Db7" or "C/E".
    pub fn name(&self) -> String {
        let mut out = String::from(pitch::semitone_to_note(self.root as i32, self.prefer_sharps));
        out.push_str(self.quality.symbol());
        if let Some(b) = self.bass {
            out.push('/');
            out.push_str(pitch::semitone_to_note(b as i32, self.prefer_sharps));
        }
        out
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for ChordSymbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for ChordSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ChordSymbol::parse_lenient(&text).map_err(serde::de::Error::custom)
    }
}

/// A chord placed in time. Gaps and overlaps between events are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub chord: ChordSymbol,
    /// Start time in beats.
    pub start: f64,
    /// Duration in beats.
    pub duration: f64,
}

impl ChordEvent {
    pub fn new(chord: ChordSymbol, start: f64, duration: f64) -> Self {
        ChordEvent { chord, start, duration }
    }

    /// One event per symbol, each `beats` long, back to back. Unknown
    /// qualities are kept as unspecified.
    pub fn sequence(symbols: &[&str], beats: f64) -> Result<Vec<ChordEvent>> {
        symbols
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Ok(ChordEvent::new(
                    ChordSymbol::parse_lenient(s)?,
                    i as f64 * beats,
                    beats,
                ))
            })
            .collect()
    }
}

/// Strip events down to their symbols.
pub fn symbols_of(events: &[ChordEvent]) -> Vec<ChordSymbol> {
    events.iter().map(|e| e.chord.clone()).collect()
}

/// Parse a list of symbols leniently.
pub fn parse_progression(symbols: &[&str]) -> Result<Vec<ChordSymbol>> {
    symbols.iter().map(|s| ChordSymbol::parse_lenient(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_intervals_strictly_increasing() {
        for c in all_chord_types() {
            assert_eq!(c.intervals[0], 0, "{}", c.name);
            assert!(c.intervals.windows(2).all(|w| w[0] < w[1]), "{}", c.name);
        }
    }

    #[test]
    fn test_lookup_exact_then_lowercase() {
        assert_eq!(chord_type("M7").unwrap().symbol, "maj7");
        assert_eq!(chord_type("m7").unwrap().symbol, "m7");
        assert_eq!(chord_type("MAJ7").unwrap().symbol, "maj7");
        assert_eq!(chord_type("ø").unwrap().symbol, "m7b5");
        assert!(matches!(
            chord_type("m7b13#17"),
            Err(HarmonyError::UnknownChordQuality(_))
        ));
    }

    #[test]
    fn test_chord_notes_reduce_mod_12() {
        assert_eq!(chord_notes("C", "maj7").unwrap(), vec![0, 4, 7, 11]);
        assert_eq!(chord_notes("G", "9").unwrap(), vec![7, 11, 2, 5, 9]);
        assert_eq!(
            chord_note_names("Bb", "m7", false).unwrap(),
            vec!["Bb", "Db", "F", "Ab"]
        );
    }

    #[test]
    fn test_families() {
        let fam = |q: &str| chord_type(q).unwrap().family();
        assert_eq!(fam(""), QualityFamily::Major);
        assert_eq!(fam("maj9"), QualityFamily::Major);
        assert_eq!(fam("m7"), QualityFamily::Minor);
        assert_eq!(fam("mMaj7"), QualityFamily::Minor);
        assert_eq!(fam("7"), QualityFamily::Dominant);
        assert_eq!(fam("13b9"), QualityFamily::Dominant);
        assert_eq!(fam("7alt"), QualityFamily::Dominant);
        assert_eq!(fam("7sus4"), QualityFamily::Dominant);
        assert_eq!(fam("m7b5"), QualityFamily::HalfDiminished);
        assert_eq!(fam("dim7"), QualityFamily::Diminished);
        assert_eq!(fam("aug"), QualityFamily::Augmented);
        assert_eq!(fam("sus2"), QualityFamily::Suspended);
        assert_eq!(fam("5"), QualityFamily::Power);
        assert_eq!(fam("quartal"), QualityFamily::Other);
    }

    #[test]
    fn test_parse_with_slash_bass() {
        let c = ChordSymbol::parse("F#m7b5/A").unwrap();
        assert_eq!(c.root, 6);
        assert_eq!(c.quality.symbol(), "m7b5");
        assert_eq!(c.bass, Some(9));
        assert!(c.is_inverted());
        assert_eq!(c.name(), "F#m7b5/A");
    }

    #[test]
    fn test_parse_six_nine_is_not_a_slash_chord() {
        let c = ChordSymbol::parse("C6/9").unwrap();
        assert_eq!(c.quality.symbol(), "6/9");
        assert_eq!(c.bass, None);
    }

    #[test]
    fn test_parse_unknown_quality_strict_vs_lenient() {
        assert!(matches!(
            ChordSymbol::parse("Cfoo7"),
            Err(HarmonyError::UnknownChordQuality(q)) if q == "foo7"
        ));
        let c = ChordSymbol::parse_lenient("Cfoo7").unwrap();
        assert_eq!(c.family(), QualityFamily::Unspecified);
        assert_eq!(c.quality, ChordQuality::Unknown("foo7".into()));
        assert_eq!(c.notes(), vec![0]);
        assert_eq!(c.name(), "Cfoo7");
    }

    #[test]
    fn test_parse_rejects_bad_root() {
        assert!(matches!(
            ChordSymbol::parse("Hm7"),
            Err(HarmonyError::InvalidNoteName(_))
        ));
        assert!(ChordSymbol::parse("").is_err());
    }

    #[test]
    fn test_flat_roots_keep_flat_spelling() {
        let c = ChordSymbol::parse("Dbmaj7").unwrap();
        assert_eq!(c.root, 1);
        assert_eq!(c.name(), "Dbmaj7");
        assert_eq!(ChordSymbol::parse("C#7").unwrap().name(), "C#7");
    }

    #[test]
    fn test_common_tones() {
        let c = ChordSymbol::parse("Cmaj7").unwrap();
        let am = ChordSymbol::parse("Am7").unwrap();
        let fs = ChordSymbol::parse("F#7").unwrap();
        assert_eq!(c.common_tones(&am), 3);
        assert_eq!(c.common_tones(&fs), 0);
    }

    #[test]
    fn test_serde_as_symbol_text() {
        let c = ChordSymbol::parse("Bbm7/F").unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"Bbm7/F\"");
        let back: ChordSymbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_event_sequence() {
        let events = ChordEvent::sequence(&["Dm7", "G7", "Cmaj7"], 4.0).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].start, 8.0);
        assert_eq!(symbols_of(&events)[1].name(), "G7");
    }
}
