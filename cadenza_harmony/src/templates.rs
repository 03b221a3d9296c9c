// Named progression templates.
//
// A template is a run of chord roots written as intervals above a tonic,
// optionally with the quality family each chord must have. Templates are
// slid across the progression; at each position the tonic is assumed from
// the first chord, and every root must then sit at its template interval.
//
// Confidence:
// - 0.9 for an exact root match.
// - 0.7 for a template of four or more chords with exactly one wrong root.
// - Each chord whose quality is unspecified costs 0.1 when the template
//   names qualities, 0.05 otherwise.
// - A named quality that contradicts the chord rejects the position.
// Positions scoring 0.6 or less are dropped. Overlapping matches are
// resolved greedily by confidence, then earliest start, then length.

use crate::chord::QualityFamily::{Dominant as Dom, HalfDiminished as Hd, Major as Maj, Minor as Min};
use crate::chord::{ChordSymbol, QualityFamily};
use crate::key::Key;
use crate::pitch::{self, KeyMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateGenre {
    Pop,
    Blues,
    Jazz,
    Modal,
}

impl TemplateGenre {
    pub const ALL: [TemplateGenre; 4] = [
        TemplateGenre::Pop,
        TemplateGenre::Blues,
        TemplateGenre::Jazz,
        TemplateGenre::Modal,
    ];
}

#[derive(Debug)]
pub struct Template {
    pub name: &'static str,
    pub genre: TemplateGenre,
    pub mode: KeyMode,
    pub intervals: &'static [u8],
    pub roman: &'static [&'static str],
    /// Required family per chord, when the template cares.
    pub families: Option<&'static [QualityFamily]>,
    pub description: &'static str,
}

macro_rules! template {
    ($name:expr, $genre:ident, $mode:ident, $iv:expr, $roman:expr, $desc:expr) => {
        Template {
            name: $name,
            genre: TemplateGenre::$genre,
            mode: KeyMode::$mode,
            intervals: &$iv,
            roman: &$roman,
            families: None,
            description: $desc,
        }
    };
    ($name:expr, $genre:ident, $mode:ident, $iv:expr, $roman:expr, $fam:expr, $desc:expr) => {
        Template {
            name: $name,
            genre: TemplateGenre::$genre,
            mode: KeyMode::$mode,
            intervals: &$iv,
            roman: &$roman,
            families: Some(&$fam as &[QualityFamily]),
            description: $desc,
        }
    };
}

pub static TEMPLATES: [Template; 25] = [
    // Pop
    template!("axis", Pop, Major, [0, 7, 9, 5], ["I", "V", "vi", "IV"],
        "I-V-vi-IV, the most common pop progression"),
    template!("sensitive", Pop, Major, [9, 5, 0, 7], ["vi", "IV", "I", "V"],
        "vi-IV-I-V, the axis started on the relative minor"),
    template!("fifties", Pop, Major, [0, 9, 5, 7], ["I", "vi", "IV", "V"],
        "I-vi-IV-V doo-wop progression"),
    template!("pop_punk", Pop, Major, [0, 5, 7, 0], ["I", "IV", "V", "I"],
        "I-IV-V-I"),
    template!("four_chord_minor", Pop, Minor, [0, 10, 8, 10], ["i", "♭VII", "♭VI", "♭VII"],
        "minor-key rock loop"),
    template!("andalusian", Pop, Minor, [0, 10, 8, 7], ["i", "♭VII", "♭VI", "V"],
        "descending flamenco cadence"),
    template!("pachelbel", Pop, Major, [0, 7, 9, 4, 5, 0, 5, 7],
        ["I", "V", "vi", "iii", "IV", "I", "IV", "V"],
        "Pachelbel's Canon"),
    // Blues
    template!("twelve_bar", Blues, Major, [0, 0, 0, 0, 5, 5, 0, 0, 7, 5, 0, 7],
        ["I", "I", "I", "I", "IV", "IV", "I", "I", "V", "IV", "I", "V"],
        "standard 12-bar blues"),
    template!("twelve_bar_quick_change", Blues, Major, [0, 5, 0, 0, 5, 5, 0, 0, 7, 5, 0, 7],
        ["I", "IV", "I", "I", "IV", "IV", "I", "I", "V", "IV", "I", "V"],
        "12-bar blues with the IV in bar two"),
    template!("eight_bar", Blues, Major, [0, 0, 5, 5, 0, 7, 0, 7],
        ["I", "I", "IV", "IV", "I", "V", "I", "V"],
        "8-bar blues"),
    template!("minor_blues", Blues, Minor, [0, 0, 0, 0, 5, 5, 0, 0, 8, 7, 0, 7],
        ["i", "i", "i", "i", "iv", "iv", "i", "i", "♭VI", "V", "i", "V"],
        "12-bar minor blues"),
    // Jazz
    template!("ii_v_i_major", Jazz, Major, [2, 7, 0], ["ii", "V", "I"], [Min, Dom, Maj],
        "ii-V-I in major"),
    template!("ii_v_i_minor", Jazz, Minor, [2, 7, 0], ["ii°", "V", "i"], [Hd, Dom, Min],
        "ii-V-i in minor"),
    template!("turnaround", Jazz, Major, [0, 9, 2, 7], ["I", "vi", "ii", "V"],
        "I-vi-ii-V turnaround"),
    template!("rhythm_changes_a", Jazz, Major, [0, 9, 2, 7, 0, 9, 2, 7],
        ["I", "vi", "ii", "V", "I", "vi", "ii", "V"],
        "rhythm changes A section"),
    template!("rhythm_changes_b", Jazz, Major, [4, 4, 9, 9, 2, 2, 7, 7],
        ["III7", "III7", "VI7", "VI7", "II7", "II7", "V7", "V7"],
        [Dom, Dom, Dom, Dom, Dom, Dom, Dom, Dom],
        "rhythm changes bridge, dominants around the circle"),
    template!("coltrane", Jazz, Major, [0, 3, 8, 11, 4], ["I", "V7/♭VI", "♭VI", "V7/III", "III"],
        [Maj, Dom, Maj, Dom, Maj],
        "Giant Steps cycle of major thirds"),
    template!("backdoor", Jazz, Major, [10, 0], ["♭VII7", "I"], [Dom, Maj],
        "backdoor resolution"),
    template!("tritone_sub", Jazz, Major, [1, 0], ["♭II7", "I"], [Dom, Maj],
        "tritone substitute resolving down a half step"),
    template!("iii_vi_ii_v", Jazz, Major, [4, 9, 2, 7], ["iii", "vi", "ii", "V"],
        "extended circle of fifths"),
    // Modal
    template!("dorian_vamp", Modal, Minor, [0, 2], ["i", "II"], [Min, Maj],
        "Dorian vamp"),
    template!("mixolydian_vamp", Modal, Major, [0, 10], ["I", "♭VII"], [Maj, Maj],
        "Mixolydian vamp"),
    template!("lydian_vamp", Modal, Major, [0, 2], ["I", "II"], [Maj, Maj],
        "Lydian vamp"),
    template!("phrygian_vamp", Modal, Minor, [0, 1], ["i", "♭II"], [Min, Maj],
        "Phrygian vamp"),
    template!("aeolian_rock", Modal, Minor, [0, 10, 8], ["i", "♭VII", "♭VI"],
        "Aeolian rock progression"),
];

pub fn all_templates() -> &'static [Template] {
    &TEMPLATES
}

pub fn template_info(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name == name)
}

pub fn templates_in_genre(genre: TemplateGenre) -> Vec<&'static Template> {
    TEMPLATES.iter().filter(|t| t.genre == genre).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionMatch {
    pub name: String,
    pub genre: TemplateGenre,
    pub roman: Vec<String>,
    pub start: usize,
    pub end: usize,
    pub key: Key,
    pub confidence: f64,
    pub description: String,
    pub chords: Vec<ChordSymbol>,
}

const EXACT_CONFIDENCE: f64 = 0.9;
const PARTIAL_CONFIDENCE: f64 = 0.7;
const MIN_CONFIDENCE: f64 = 0.6;

/// Score one window against one template. `None` when it does not match.
pub fn match_template(window: &[ChordSymbol], template: &Template) -> Option<(Key, f64)> {
    let n = template.intervals.len();
    if window.len() != n {
        return None;
    }
    let tonic = pitch::transpose(window[0].root, -(template.intervals[0] as i32));
    let misses = window
        .iter()
        .zip(template.intervals)
        .filter(|(c, iv)| pitch::interval(tonic, c.root) != **iv)
        .count();
    let mut confidence = match misses {
        0 => EXACT_CONFIDENCE,
        1 if n >= 4 => PARTIAL_CONFIDENCE,
        _ => return None,
    };

    let mut unspecified = 0;
    for (i, chord) in window.iter().enumerate() {
        let family = chord.family();
        if family == QualityFamily::Unspecified {
            unspecified += 1;
            continue;
        }
        if let Some(families) = template.families {
            if families[i] != family {
                return None;
            }
        }
    }
    let slack = if template.families.is_some() { 0.1 } else { 0.05 };
    confidence -= slack * unspecified as f64;

    (confidence > MIN_CONFIDENCE).then(|| (Key::new(tonic, template.mode), confidence))
}

fn filter_overlapping(mut matches: Vec<ProgressionMatch>) -> Vec<ProgressionMatch> {
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.start.cmp(&b.start))
            .then((b.end - b.start).cmp(&(a.end - a.start)))
    });
    let mut kept: Vec<ProgressionMatch> = Vec::new();
    for m in matches {
        if kept.iter().all(|k| m.end < k.start || m.start > k.end) {
            kept.push(m);
        }
    }
    kept
}

/// Find template matches, restricted to `genres` when given.
pub fn detect_templates(chords: &[ChordSymbol], genres: Option<&[TemplateGenre]>) -> Vec<ProgressionMatch> {
    let mut matches = Vec::new();
    for template in TEMPLATES
        .iter()
        .filter(|t| genres.is_none_or(|g| g.contains(&t.genre)))
    {
        for (start, window) in chords.windows(template.intervals.len()).enumerate() {
            if let Some((key, confidence)) = match_template(window, template) {
                matches.push(ProgressionMatch {
                    name: template.name.to_string(),
                    genre: template.genre,
                    roman: template.roman.iter().map(|r| r.to_string()).collect(),
                    start,
                    end: start + window.len() - 1,
                    key,
                    confidence,
                    description: template.description.to_string(),
                    chords: window.to_vec(),
                });
            }
        }
    }
    filter_overlapping(matches)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub matches: Vec<ProgressionMatch>,
    /// Key with the largest confidence-weighted vote across matches.
    pub detected_key: Option<Key>,
    pub primary_genre: Option<TemplateGenre>,
    pub genre_distribution: BTreeMap<TemplateGenre, usize>,
}

pub fn summarize_templates(chords: &[ChordSymbol]) -> TemplateSummary {
    let matches = detect_templates(chords, None);
    let mut genre_distribution = BTreeMap::new();
    let mut votes: Vec<(Key, f64)> = Vec::new();
    for m in &matches {
        *genre_distribution.entry(m.genre).or_insert(0) += 1;
        match votes.iter_mut().find(|(k, _)| *k == m.key) {
            Some((_, v)) => *v += m.confidence,
            None => votes.push((m.key, m.confidence)),
        }
    }
    // First maximum wins ties, so keys voted for earlier are preferred.
    let detected_key = votes
        .iter()
        .fold(None::<(Key, f64)>, |best, &(k, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((k, v)),
        })
        .map(|(k, _)| k);
    let primary_genre = genre_distribution
        .iter()
        .fold(None::<(TemplateGenre, usize)>, |best, (&g, &n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((g, n)),
        })
        .map(|(g, _)| g);
    TemplateSummary {
        matches,
        detected_key,
        primary_genre,
        genre_distribution,
    }
}
