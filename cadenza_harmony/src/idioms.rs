// Genre idioms.
//
// Key-independent detectors for harmonic habits that mark a style, read
// from root motion and quality families:
// - ii-V-I in major and minor (roots rising by fourths)
// - turnarounds: I-vi-ii-V and iii-vi-ii-V
// - tritone-substitute resolutions: a dominant falling a half step
// - backdoor resolutions: a dominant rising a whole step to a major chord
// - dominant chains: three or more dominants linked by falling fifths
// - plagal "amen" endings: IV to I on the final two chords
// - chromatic mediants: major chords a third apart
// - the 12-bar blues form
//
// `score_genres` weighs the detected idioms and the share of extended
// chords into a normalized score per `Genre`.

use crate::chord::{ChordSymbol, QualityFamily};
use crate::config::Genre;
use crate::pitch::{self, PitchClass};
use crate::templates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdiomKind {
    TwoFiveOneMajor,
    TwoFiveOneMinor,
    Turnaround,
    TritoneResolution,
    BackdoorResolution,
    DominantChain,
    PlagalAmen,
    ChromaticMediant,
    TwelveBarBlues,
}

impl IdiomKind {
    pub fn confidence(self) -> f64 {
        match self {
            IdiomKind::TwoFiveOneMajor | IdiomKind::TwoFiveOneMinor => 0.95,
            IdiomKind::Turnaround => 0.88,
            IdiomKind::TritoneResolution => 0.85,
            IdiomKind::BackdoorResolution => 0.8,
            IdiomKind::DominantChain => 0.8,
            IdiomKind::PlagalAmen => 0.85,
            IdiomKind::ChromaticMediant => 0.7,
            IdiomKind::TwelveBarBlues => 0.9,
        }
    }

    /// How strongly the idiom points at each genre.
    fn genre_weights(self) -> &'static [(Genre, f64)] {
        match self {
            IdiomKind::TwoFiveOneMajor => {
                &[(Genre::Jazz, 1.0), (Genre::Gospel, 0.5), (Genre::NeoSoul, 0.5)]
            }
            IdiomKind::TwoFiveOneMinor => &[(Genre::Jazz, 1.0), (Genre::NeoSoul, 0.3)],
            IdiomKind::Turnaround => &[(Genre::Jazz, 0.8), (Genre::Gospel, 0.4)],
            IdiomKind::TritoneResolution => {
                &[(Genre::Jazz, 1.0), (Genre::Gospel, 0.5), (Genre::NeoSoul, 0.5)]
            }
            IdiomKind::BackdoorResolution => {
                &[(Genre::Gospel, 0.8), (Genre::Jazz, 0.6), (Genre::NeoSoul, 0.6)]
            }
            IdiomKind::DominantChain => {
                &[(Genre::Jazz, 0.6), (Genre::Gospel, 0.6), (Genre::Blues, 0.3)]
            }
            IdiomKind::PlagalAmen => &[(Genre::Gospel, 1.0), (Genre::Classical, 0.5)],
            IdiomKind::ChromaticMediant => &[(Genre::Classical, 0.6), (Genre::NeoSoul, 0.4)],
            IdiomKind::TwelveBarBlues => &[(Genre::Blues, 2.0)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idiom {
    pub kind: IdiomKind,
    pub start: usize,
    pub end: usize,
    pub chords: Vec<ChordSymbol>,
    pub confidence: f64,
    /// Local tonic implied by the idiom, when it has one.
    pub tonic: Option<PitchClass>,
}

fn idiom(kind: IdiomKind, chords: &[ChordSymbol], start: usize, len: usize, tonic: Option<PitchClass>) -> Idiom {
    Idiom {
        kind,
        start,
        end: start + len - 1,
        chords: chords[start..start + len].to_vec(),
        confidence: kind.confidence(),
        tonic,
    }
}

fn rises_fourth(a: &ChordSymbol, b: &ChordSymbol) -> bool {
    pitch::interval(a.root, b.root) == 5
}

fn dominant_like(family: QualityFamily) -> bool {
    matches!(family, QualityFamily::Dominant | QualityFamily::Major)
}

/// ii-V-I and ii°-V-i. The minor variant wins when the arrival is minor.
pub fn detect_two_five_ones(chords: &[ChordSymbol]) -> Vec<Idiom> {
    let mut found = Vec::new();
    for (i, w) in chords.windows(3).enumerate() {
        if !(rises_fourth(&w[0], &w[1]) && rises_fourth(&w[1], &w[2])) {
            continue;
        }
        if !dominant_like(w[1].family()) {
            continue;
        }
        let kind = match (w[0].family(), w[2].family()) {
            (QualityFamily::Minor, QualityFamily::Major) => IdiomKind::TwoFiveOneMajor,
            (QualityFamily::HalfDiminished | QualityFamily::Minor, QualityFamily::Minor) => {
                IdiomKind::TwoFiveOneMinor
            }
            _ => continue,
        };
        found.push(idiom(kind, chords, i, 3, Some(w[2].root)));
    }
    found
}

/// I-vi-ii-V or iii-vi-ii-V by root motion alone.
pub fn detect_turnarounds(chords: &[ChordSymbol]) -> Vec<Idiom> {
    let mut found = Vec::new();
    for (i, w) in chords.windows(4).enumerate() {
        let offsets: Vec<u8> = w.iter().map(|c| pitch::interval(w[0].root, c.root)).collect();
        let tonic = match offsets.as_slice() {
            [0, 9, 2, 7] => w[0].root,
            [0, 5, 10, 3] => pitch::transpose(w[0].root, -4),
            _ => continue,
        };
        found.push(idiom(IdiomKind::Turnaround, chords, i, 4, Some(tonic)));
    }
    found
}

pub fn detect_tritone_resolutions(chords: &[ChordSymbol]) -> Vec<Idiom> {
    chords
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0].is_dominant() && pitch::interval(w[0].root, w[1].root) == 11)
        .map(|(i, w)| idiom(IdiomKind::TritoneResolution, chords, i, 2, Some(w[1].root)))
        .collect()
}

pub fn detect_backdoor_resolutions(chords: &[ChordSymbol]) -> Vec<Idiom> {
    chords
        .windows(2)
        .enumerate()
        .filter(|(_, w)| {
            w[0].is_dominant()
                && pitch::interval(w[0].root, w[1].root) == 2
                && w[1].family() == QualityFamily::Major
        })
        .map(|(i, w)| idiom(IdiomKind::BackdoorResolution, chords, i, 2, Some(w[1].root)))
        .collect()
}

/// Maximal runs of at least three dominants, each falling a fifth to the
/// next.
pub fn detect_dominant_chains(chords: &[ChordSymbol]) -> Vec<Idiom> {
    let mut found = Vec::new();
    let mut i = 0;
    while i < chords.len() {
        let mut j = i;
        while j + 1 < chords.len()
            && chords[j].is_dominant()
            && chords[j + 1].is_dominant()
            && rises_fourth(&chords[j], &chords[j + 1])
        {
            j += 1;
        }
        let len = j + 1 - i;
        if len >= 3 {
            found.push(idiom(IdiomKind::DominantChain, chords, i, len, None));
        }
        i = j + 1;
    }
    found
}

/// IV to I (either major or minor iv) on the last two chords.
pub fn detect_plagal_amen(chords: &[ChordSymbol]) -> Option<Idiom> {
    let n = chords.len();
    if n < 2 {
        return None;
    }
    let (four, one) = (&chords[n - 2], &chords[n - 1]);
    let ok = pitch::interval(four.root, one.root) == 7
        && matches!(four.family(), QualityFamily::Major | QualityFamily::Minor)
        && one.family() == QualityFamily::Major;
    ok.then(|| idiom(IdiomKind::PlagalAmen, chords, n - 2, 2, Some(one.root)))
}

pub fn detect_chromatic_mediants(chords: &[ChordSymbol]) -> Vec<Idiom> {
    chords
        .windows(2)
        .enumerate()
        .filter(|(_, w)| {
            w[0].family() == QualityFamily::Major
                && w[1].family() == QualityFamily::Major
                && matches!(pitch::interval(w[0].root, w[1].root), 3 | 4 | 8 | 9)
        })
        .map(|(i, _)| idiom(IdiomKind::ChromaticMediant, chords, i, 2, None))
        .collect()
}

/// Twelve-chord windows that follow the major 12-bar blues, plain or with
/// the quick change.
pub fn detect_twelve_bar(chords: &[ChordSymbol]) -> Vec<Idiom> {
    let forms: Vec<&templates::Template> = ["twelve_bar", "twelve_bar_quick_change"]
        .iter()
        .filter_map(|name| templates::template_info(name))
        .collect();
    let mut found: Vec<Idiom> = Vec::new();
    for (i, w) in chords.windows(12).enumerate() {
        let exact = forms
            .iter()
            .filter_map(|t| templates::match_template(w, t))
            .find(|(_, conf)| *conf > 0.85);
        let overlaps = found.last().is_some_and(|f| f.end >= i);
        if let (Some((key, _)), false) = (exact, overlaps) {
            found.push(idiom(IdiomKind::TwelveBarBlues, chords, i, 12, Some(key.tonic)));
        }
    }
    found
}

/// Every idiom found in the progression, ordered by start.
pub fn detect_idioms(chords: &[ChordSymbol]) -> Vec<Idiom> {
    let mut all = Vec::new();
    all.extend(detect_two_five_ones(chords));
    all.extend(detect_turnarounds(chords));
    all.extend(detect_tritone_resolutions(chords));
    all.extend(detect_backdoor_resolutions(chords));
    all.extend(detect_dominant_chains(chords));
    all.extend(detect_plagal_amen(chords));
    all.extend(detect_chromatic_mediants(chords));
    all.extend(detect_twelve_bar(chords));
    all.sort_by_key(|i| (i.start, i.kind));
    all
}

// ---------------------------------------------------------------------------
// Genre scoring
// ---------------------------------------------------------------------------

/// Chords with a seventh or beyond.
pub fn extended_ratio(chords: &[ChordSymbol]) -> f64 {
    if chords.is_empty() {
        return 0.0;
    }
    let extended = chords
        .iter()
        .filter(|c| c.intervals().iter().any(|&iv| iv == 10 || iv == 11 || iv > 12))
        .count();
    extended as f64 / chords.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdiomAnalysis {
    pub idioms: Vec<Idiom>,
    pub extended_ratio: f64,
    /// Normalized to sum to 1; empty when nothing pointed anywhere.
    pub genre_scores: BTreeMap<Genre, f64>,
    pub primary_genre: Option<Genre>,
}

pub fn score_genres(idioms: &[Idiom], extended_ratio: f64) -> BTreeMap<Genre, f64> {
    let mut raw: BTreeMap<Genre, f64> = BTreeMap::new();
    for i in idioms {
        for &(genre, weight) in i.kind.genre_weights() {
            *raw.entry(genre).or_insert(0.0) += weight * i.confidence;
        }
    }
    if extended_ratio > 0.7 {
        *raw.entry(Genre::Jazz).or_insert(0.0) += 0.5;
    } else if extended_ratio > 0.4 {
        *raw.entry(Genre::Gospel).or_insert(0.0) += 0.3;
    } else if extended_ratio < 0.2 && idioms.is_empty() {
        *raw.entry(Genre::Classical).or_insert(0.0) += 0.2;
        *raw.entry(Genre::Blues).or_insert(0.0) += 0.1;
    }
    let total: f64 = raw.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    raw.into_iter().map(|(g, v)| (g, v / total)).collect()
}

pub fn analyze_idioms(chords: &[ChordSymbol]) -> IdiomAnalysis {
    let idioms = detect_idioms(chords);
    let ratio = extended_ratio(chords);
    let genre_scores = if chords.is_empty() {
        BTreeMap::new()
    } else {
        score_genres(&idioms, ratio)
    };
    let primary_genre = genre_scores
        .iter()
        .fold(None::<(Genre, f64)>, |best, (&g, &s)| match best {
            Some((_, bs)) if bs >= s => best,
            _ => Some((g, s)),
        })
        .map(|(g, _)| g);
    IdiomAnalysis {
        idioms,
        extended_ratio: ratio,
        genre_scores,
        primary_genre,
    }
}
