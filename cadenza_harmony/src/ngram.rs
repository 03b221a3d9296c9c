// N-gram lick model.
//
// Generalizes the second-order Markov model to contexts of n-1 values.
// Every shorter context length is trained alongside the full one so a
// caller can opt into Katz-style backoff: when the full context has never
// been seen, fall back to its longest seen suffix. Strict generation never
// backs off and so only ever emits transitions observed at full order.

use crate::error::{HarmonyError, Result};
use crate::licks::LickPattern;
use crate::markov::{
    self, GenerationParams, LickGenerator, ModelStats, Transition, context_key, resolves_here,
    sample_transition, to_transitions,
};
use cadenza_prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Supported orders. Order 2 conditions on a single value.
pub const MIN_ORDER: usize = 2;
pub const MAX_ORDER: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramModel {
    pub style: String,
    order: usize,
    /// `levels[k]` maps contexts of `k + 1` values to their continuations;
    /// the last level is the full `order - 1` context.
    levels: Vec<BTreeMap<String, Vec<Transition>>>,
    start_states: Vec<Vec<i8>>,
    end_states: BTreeSet<Vec<i8>>,
    pattern_count: usize,
}

impl NGramModel {
    /// Train an order-`n` model on every pattern with at least `n` values.
    pub fn train(style: &str, order: usize, patterns: &[&LickPattern]) -> Result<Self> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&order) {
            return Err(HarmonyError::InvalidOrder(order));
        }
        let ctx_len = order - 1;
        let mut counts: Vec<BTreeMap<Vec<i8>, BTreeMap<i8, u32>>> = vec![BTreeMap::new(); ctx_len];
        let mut start_states = Vec::new();
        let mut end_states = BTreeSet::new();
        let mut pattern_count = 0;

        for pattern in patterns {
            let iv = &pattern.intervals;
            if iv.len() < order {
                continue;
            }
            pattern_count += 1;
            start_states.push(iv[..ctx_len].to_vec());
            end_states.insert(iv[iv.len() - ctx_len..].to_vec());
            for (k, level) in counts.iter_mut().enumerate() {
                for w in iv.windows(k + 2) {
                    let (ctx, next) = w.split_at(k + 1);
                    *level.entry(ctx.to_vec()).or_default().entry(next[0]).or_default() += 1;
                }
            }
        }

        if pattern_count == 0 {
            return Err(HarmonyError::EmptyCorpus(style.to_string()));
        }

        let levels: Vec<BTreeMap<String, Vec<Transition>>> = counts
            .into_iter()
            .map(|level| {
                level
                    .into_iter()
                    .map(|(ctx, nexts)| (context_key(&ctx), to_transitions(nexts)))
                    .collect()
            })
            .collect();
        log::info!(
            "trained {style} {order}-gram model: {pattern_count} patterns, {} contexts",
            levels.last().map_or(0, BTreeMap::len)
        );
        Ok(NGramModel {
            style: style.to_string(),
            order,
            levels,
            start_states,
            end_states,
            pattern_count,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn start_states(&self) -> &[Vec<i8>] {
        &self.start_states
    }

    pub fn is_end_state(&self, context: &[i8]) -> bool {
        self.end_states.contains(context)
    }

    /// Continuations of an exact context (of any trained length).
    pub fn transitions_from(&self, context: &[i8]) -> &[Transition] {
        if context.is_empty() {
            return &[];
        }
        self.levels
            .get(context.len() - 1)
            .and_then(|level| level.get(&context_key(context)))
            .map_or(&[], Vec::as_slice)
    }

    /// P(next | context) at full order only; 0 for any other context length
    /// or an unseen pair.
    pub fn transition_probability(&self, context: &[i8], next: i8) -> f64 {
        if context.len() != self.order - 1 {
            return 0.0;
        }
        find_probability(self.transitions_from(context), next).unwrap_or(0.0)
    }

    /// P(next | context), backing off to shorter suffixes of `context` until
    /// one has seen `next`. 0 when none has.
    pub fn probability(&self, context: &[i8], next: i8) -> f64 {
        let longest = context.len().min(self.order - 1);
        (1..=longest)
            .rev()
            .find_map(|k| find_probability(self.transitions_from(&context[context.len() - k..]), next))
            .unwrap_or(0.0)
    }

    /// Strict generation from a fixed opening context of `order - 1` values.
    pub fn generate_from(&self, start: &[i8], params: &GenerationParams, rng: &mut impl RandomSource) -> Vec<i8> {
        self.run(start, params, false, rng)
    }

    /// Like `generate`, but an unseen context backs off to its longest seen
    /// suffix instead of ending the lick.
    pub fn generate_with_backoff(&self, params: &GenerationParams, rng: &mut impl RandomSource) -> Vec<i8> {
        match self.pick_start(params.start_interval, rng) {
            Some(start) => self.run(&start, params, true, rng),
            None => Vec::new(),
        }
    }

    fn run(&self, start: &[i8], params: &GenerationParams, backoff: bool, rng: &mut impl RandomSource) -> Vec<i8> {
        let ctx_len = self.order - 1;
        let mut out = start.to_vec();
        while out.len() < params.length {
            let context = &out[out.len().saturating_sub(ctx_len)..];
            if resolves_here(out.len(), params.length, self.is_end_state(context), params, rng) {
                break;
            }
            let transitions = if backoff {
                (1..=context.len())
                    .rev()
                    .map(|k| self.transitions_from(&context[context.len() - k..]))
                    .find(|ts| !ts.is_empty())
                    .unwrap_or(&[])
            } else {
                self.transitions_from(context)
            };
            match sample_transition(transitions, params.temperature, rng) {
                Some(next) => out.push(next),
                None => {
                    log::trace!("{} {}-gram: dead end at {context:?}", self.style, self.order);
                    break;
                }
            }
        }
        out.truncate(params.length);
        out
    }

    fn pick_start(&self, start_interval: Option<i8>, rng: &mut impl RandomSource) -> Option<Vec<i8>> {
        let constrained: Vec<&Vec<i8>> = match start_interval {
            Some(first) => self.start_states.iter().filter(|s| s.first() == Some(&first)).collect(),
            None => Vec::new(),
        };
        if constrained.is_empty() {
            rng.choose(&self.start_states).cloned()
        } else {
            rng.choose(&constrained).map(|s| (*s).clone())
        }
    }
}

fn find_probability(transitions: &[Transition], next: i8) -> Option<f64> {
    transitions.iter().find(|t| t.next == next).map(|t| t.probability)
}

impl LickGenerator for NGramModel {
    fn style(&self) -> &str {
        &self.style
    }

    fn generate(&self, params: &GenerationParams, rng: &mut impl RandomSource) -> Vec<i8> {
        match self.pick_start(params.start_interval, rng) {
            Some(start) => self.run(&start, params, false, rng),
            None => Vec::new(),
        }
    }

    fn stats(&self) -> ModelStats {
        let empty = BTreeMap::new();
        markov::summarize(
            &self.style,
            self.order,
            self.pattern_count,
            self.levels.last().unwrap_or(&empty),
            self.start_states.len(),
            self.end_states.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licks::{Difficulty, LickCorpus};
    use crate::markov::MarkovModel;
    use cadenza_prng::SeededRng;

    fn lick(intervals: &[i8]) -> LickPattern {
        LickPattern {
            name: String::new(),
            style: "test".into(),
            intervals: intervals.to_vec(),
            rhythm: Vec::new(),
            difficulty: Difficulty::Intermediate,
            harmonic_context: Vec::new(),
            phrase_type: String::new(),
            characteristics: Vec::new(),
        }
    }

    #[test]
    fn test_order_bounds() {
        let a = lick(&[0, 2, 4, 5]);
        assert!(matches!(NGramModel::train("t", 1, &[&a]), Err(HarmonyError::InvalidOrder(1))));
        assert!(matches!(NGramModel::train("t", 7, &[&a]), Err(HarmonyError::InvalidOrder(7))));
        assert!(matches!(NGramModel::train("t", 5, &[&a]), Err(HarmonyError::EmptyCorpus(_))));
        assert_eq!(NGramModel::train("t", 4, &[&a]).unwrap().order(), 4);
    }

    #[test]
    fn test_order_three_matches_markov() {
        let patterns = LickCorpus::builtin().by_style("blues");
        let markov = MarkovModel::train("blues", &patterns).unwrap();
        let ngram = NGramModel::train("blues", 3, &patterns).unwrap();
        assert_eq!(markov.stats().transition_count, ngram.stats().transition_count);
        for seed in 0..20 {
            let params = GenerationParams::new(10);
            let a = markov.generate(&params, &mut SeededRng::new(seed));
            let b = ngram.generate(&params, &mut SeededRng::new(seed));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_strict_vs_backoff() {
        let a = lick(&[0, 2, 4, 5]);
        let b = lick(&[1, 4, 5, 8]);
        let model = NGramModel::train("t", 4, &[&a, &b]).unwrap();
        let params = GenerationParams::new(8).with_temperature(0.0).without_resolution();
        let mut rng = SeededRng::new(0);
        assert_eq!(model.generate_from(&[0, 2, 4], &params, &mut rng), vec![0, 2, 4, 5]);
        let params = params.starting_on(0);
        assert_eq!(model.generate_with_backoff(&params, &mut rng), vec![0, 2, 4, 5, 8]);
    }

    #[test]
    fn test_probabilities() {
        let a = lick(&[0, 2, 4, 5]);
        let b = lick(&[1, 4, 5, 8]);
        let model = NGramModel::train("t", 4, &[&a, &b]).unwrap();
        assert_eq!(model.transition_probability(&[0, 2, 4], 5), 1.0);
        assert_eq!(model.transition_probability(&[4, 5], 8), 0.0);
        assert_eq!(model.probability(&[9, 4, 5], 8), 1.0);
        assert_eq!(model.probability(&[9, 9, 4], 5), 1.0);
        assert_eq!(model.probability(&[9, 9, 9], 5), 0.0);
        assert!(model.is_end_state(&[2, 4, 5]));
    }

    #[test]
    fn test_strict_generation_uses_full_order_transitions() {
        let patterns = LickCorpus::builtin().by_style("bebop");
        let model = NGramModel::train("bebop", 4, &patterns).unwrap();
        let mut rng = SeededRng::new(9);
        for _ in 0..30 {
            let out = model.generate(&GenerationParams::new(10), &mut rng);
            assert!(out.len() <= 10);
            for w in out.windows(4) {
                assert!(model.transition_probability(&w[..3], w[3]) > 0.0);
            }
        }
    }
}
