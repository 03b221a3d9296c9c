// Lazily trained lick models, one per (style, model kind).
//
// Slots are created up front for every style in the corpus and every
// supported order, each an empty `OnceCell`. The first caller to ask for a
// model trains it inside `get_or_try_init`; concurrent first callers block
// on that one initialization and then share the result. After that a lookup
// is a plain read with no locking. A failed training leaves the slot empty,
// so the error is reported again on the next request.

use crate::error::{HarmonyError, Result};
use crate::licks::LickCorpus;
use crate::markov::{GenerationParams, LickGenerator, MarkovModel};
use crate::ngram::{self, NGramModel};
use cadenza_prng::RandomSource;
use once_cell::sync::{Lazy, OnceCell};
use std::collections::BTreeMap;

static GLOBAL: Lazy<ModelCache> = Lazy::new(|| ModelCache::new(LickCorpus::builtin().clone()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKind {
    Markov,
    NGram(usize),
}

#[derive(Debug)]
struct StyleSlots {
    markov: OnceCell<MarkovModel>,
    /// Indexed by `order - ngram::MIN_ORDER`.
    ngram: Vec<OnceCell<NGramModel>>,
}

#[derive(Debug)]
pub struct ModelCache {
    corpus: LickCorpus,
    /// Keyed by lowercase style name.
    slots: BTreeMap<String, StyleSlots>,
}

impl ModelCache {
    pub fn new(corpus: LickCorpus) -> Self {
        let slots = corpus
            .styles()
            .into_iter()
            .map(|style| {
                let ngram = (ngram::MIN_ORDER..=ngram::MAX_ORDER).map(|_| OnceCell::new()).collect();
                (
                    style.to_ascii_lowercase(),
                    StyleSlots { markov: OnceCell::new(), ngram },
                )
            })
            .collect();
        ModelCache { corpus, slots }
    }

    /// The process-wide cache over the built-in corpus.
    pub fn global() -> &'static ModelCache {
        &GLOBAL
    }

    pub fn corpus(&self) -> &LickCorpus {
        &self.corpus
    }

    pub fn styles(&self) -> Vec<&str> {
        self.slots.keys().map(String::as_str).collect()
    }

    /// The canonical style name and its slots.
    fn slots(&self, style: &str) -> Result<(&str, &StyleSlots)> {
        self.slots
            .get_key_value(&style.to_ascii_lowercase())
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| HarmonyError::EmptyCorpus(style.to_string()))
    }

    /// The second-order Markov model for `style`, trained on first use.
    pub fn markov(&self, style: &str) -> Result<&MarkovModel> {
        let (style, slots) = self.slots(style)?;
        slots.markov.get_or_try_init(|| {
            log::info!("model cache: training markov model for {style}");
            MarkovModel::train(style, &self.corpus.require_style(style)?)
        })
    }

    /// The order-`order` n-gram model for `style`, trained on first use.
    pub fn ngram(&self, style: &str, order: usize) -> Result<&NGramModel> {
        let (style, slots) = self.slots(style)?;
        let cell = order
            .checked_sub(ngram::MIN_ORDER)
            .and_then(|i| slots.ngram.get(i))
            .ok_or(HarmonyError::InvalidOrder(order))?;
        cell.get_or_try_init(|| {
            log::info!("model cache: training {order}-gram model for {style}");
            NGramModel::train(style, order, &self.corpus.require_style(style)?)
        })
    }

    /// True once the model has been trained.
    pub fn is_trained(&self, style: &str, kind: ModelKind) -> bool {
        let Ok((_, slots)) = self.slots(style) else {
            return false;
        };
        match kind {
            ModelKind::Markov => slots.markov.get().is_some(),
            ModelKind::NGram(order) => order
                .checked_sub(ngram::MIN_ORDER)
                .and_then(|i| slots.ngram.get(i))
                .is_some_and(|cell| cell.get().is_some()),
        }
    }

    /// Generate a lick with the requested model.
    pub fn generate(
        &self,
        style: &str,
        kind: ModelKind,
        params: &GenerationParams,
        rng: &mut impl RandomSource,
    ) -> Result<Vec<i8>> {
        Ok(match kind {
            ModelKind::Markov => self.markov(style)?.generate(params, rng),
            ModelKind::NGram(order) => self.ngram(style, order)?.generate(params, rng),
        })
    }

    /// Train the Markov model of every style now rather than on first use.
    pub fn warm(&self) -> Result<()> {
        for style in self.slots.keys() {
            self.markov(style)?;
        }
        Ok(())
    }
}
