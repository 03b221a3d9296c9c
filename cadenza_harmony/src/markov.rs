// Second-order Markov model over lick intervals.
//
// A state is the last two interval values of a lick; each state maps to the
// next values seen after it in the training corpus, with counts and
// normalized probabilities. Training also records where licks start and end
// so generation can begin on a real opening and stop on a real cadence.
//
// Models are trained once per style and immutable afterwards, so a single
// model can serve any number of concurrent generators. Randomness is always
// supplied by the caller. `ngram` generalizes the same scheme to longer
// contexts and shares the sampling helpers defined here.

use crate::error::{HarmonyError, Result};
use crate::licks::LickPattern;
use cadenza_prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The two most recent interval values.
pub type State = (i8, i8);

/// One outgoing edge of a state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub next: i8,
    pub count: u32,
    pub probability: f64,
}

/// Knobs for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of values to produce.
    pub length: usize,
    /// Restrict the opening to start states beginning with this value. Falls
    /// back to any start state when none does.
    pub start_interval: Option<i8>,
    /// 1.0 samples the trained distribution, lower values sharpen it, 0.0
    /// always takes the most likely transition.
    pub temperature: f64,
    /// Allow stopping early on a trained end state near the target length.
    pub prefer_resolution: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            length: 8,
            start_interval: None,
            temperature: 1.0,
            prefer_resolution: true,
        }
    }
}

impl GenerationParams {
    pub fn new(length: usize) -> Self {
        GenerationParams { length, ..Self::default() }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn starting_on(mut self, interval: i8) -> Self {
        self.start_interval = Some(interval);
        self
    }

    pub fn without_resolution(mut self) -> Self {
        self.prefer_resolution = false;
        self
    }
}

/// Summary of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub style: String,
    /// Number of preceding values a state holds, plus one.
    pub order: usize,
    pub pattern_count: usize,
    pub state_count: usize,
    pub transition_count: usize,
    pub start_state_count: usize,
    pub end_state_count: usize,
    /// Mean number of distinct continuations per state.
    pub average_branching: f64,
    /// The most frequently observed transitions as (context, next, count).
    pub top_transitions: Vec<(String, i8, u32)>,
}

/// Common surface of the trained lick models.
pub trait LickGenerator {
    fn style(&self) -> &str;

    fn generate(&self, params: &GenerationParams, rng: &mut impl RandomSource) -> Vec<i8>;

    fn stats(&self) -> ModelStats;
}

// ---------------------------------------------------------------------------
// Helpers shared with `ngram`
// ---------------------------------------------------------------------------

/// Encode a context (slice of intervals) as a string key for BTreeMap lookup.
pub(crate) fn context_key(context: &[i8]) -> String {
    context.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

/// Normalize raw counts into transitions sorted by descending probability,
/// ties broken by the smaller value.
pub(crate) fn to_transitions(counts: BTreeMap<i8, u32>) -> Vec<Transition> {
    let total: u32 = counts.values().sum();
    let mut out: Vec<Transition> = counts
        .into_iter()
        .map(|(next, count)| Transition {
            next,
            count,
            probability: count as f64 / total.max(1) as f64,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then(a.next.cmp(&b.next)));
    out
}

/// Draw the next value from `transitions`, reweighted by `p^(1/T)`.
///
/// A non-positive (or NaN) temperature takes the first, most likely entry,
/// and so does a temperature small enough that every weight underflows.
pub(crate) fn sample_transition(
    transitions: &[Transition],
    temperature: f64,
    rng: &mut impl RandomSource,
) -> Option<i8> {
    let best = transitions.first()?.next;
    if temperature.is_nan() || temperature <= 0.0 {
        return Some(best);
    }
    let exponent = 1.0 / temperature;
    let weights: Vec<f64> = transitions.iter().map(|t| t.probability.powf(exponent)).collect();
    Some(match rng.weighted_index(&weights) {
        Some(i) => transitions[i].next,
        None => best,
    })
}

/// True when generation should end on the current end state: only in the
/// last quarter of the target length, and then on a coin flip.
pub(crate) fn resolves_here(
    produced: usize,
    target: usize,
    at_end_state: bool,
    params: &GenerationParams,
    rng: &mut impl RandomSource,
) -> bool {
    params.prefer_resolution && at_end_state && produced * 4 >= target * 3 && rng.random_bool(0.5)
}

pub(crate) fn summarize(
    style: &str,
    order: usize,
    pattern_count: usize,
    transitions: &BTreeMap<String, Vec<Transition>>,
    start_state_count: usize,
    end_state_count: usize,
) -> ModelStats {
    let transition_count: usize = transitions.values().map(Vec::len).sum();
    let average_branching = if transitions.is_empty() {
        0.0
    } else {
        transition_count as f64 / transitions.len() as f64
    };
    let mut top: Vec<(String, i8, u32)> = transitions
        .iter()
        .flat_map(|(ctx, ts)| ts.iter().map(move |t| (ctx.clone(), t.next, t.count)))
        .collect();
    top.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
    top.truncate(5);
    ModelStats {
        style: style.to_string(),
        order,
        pattern_count,
        state_count: transitions.len(),
        transition_count,
        start_state_count,
        end_state_count,
        average_branching,
        top_transitions: top,
    }
}

// ---------------------------------------------------------------------------
// MarkovModel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovModel {
    pub style: String,
    /// State key ("a,b") -> continuations, most likely first.
    transitions: BTreeMap<String, Vec<Transition>>,
    /// Opening pair of every training lick; repeats weight the choice.
    start_states: Vec<State>,
    end_states: BTreeSet<State>,
    pattern_count: usize,
}

impl MarkovModel {
    /// Train on every pattern with at least three values. Fails with
    /// `EmptyCorpus` when no pattern qualifies.
    pub fn train(style: &str, patterns: &[&LickPattern]) -> Result<Self> {
        let mut counts: BTreeMap<State, BTreeMap<i8, u32>> = BTreeMap::new();
        let mut start_states = Vec::new();
        let mut end_states = BTreeSet::new();
        let mut pattern_count = 0;

        for pattern in patterns {
            let iv = &pattern.intervals;
            let n = iv.len();
            if n < 3 {
                continue;
            }
            pattern_count += 1;
            start_states.push((iv[0], iv[1]));
            end_states.insert((iv[n - 2], iv[n - 1]));
            for w in iv.windows(3) {
                *counts.entry((w[0], w[1])).or_default().entry(w[2]).or_default() += 1;
            }
        }

        if pattern_count == 0 {
            return Err(HarmonyError::EmptyCorpus(style.to_string()));
        }

        let transitions: BTreeMap<String, Vec<Transition>> = counts
            .into_iter()
            .map(|((a, b), nexts)| (context_key(&[a, b]), to_transitions(nexts)))
            .collect();
        log::info!(
            "trained {style} markov model: {pattern_count} patterns, {} states",
            transitions.len()
        );
        Ok(MarkovModel {
            style: style.to_string(),
            transitions,
            start_states,
            end_states,
            pattern_count,
        })
    }

    /// Continuations of `state`, most likely first. Empty for an unseen state.
    pub fn transitions_from(&self, state: State) -> &[Transition] {
        self.transitions
            .get(&context_key(&[state.0, state.1]))
            .map_or(&[], Vec::as_slice)
    }

    /// P(next | state); 0 for an unseen pair.
    pub fn transition_probability(&self, state: State, next: i8) -> f64 {
        self.transitions_from(state)
            .iter()
            .find(|t| t.next == next)
            .map_or(0.0, |t| t.probability)
    }

    pub fn start_states(&self) -> &[State] {
        &self.start_states
    }

    pub fn is_end_state(&self, state: State) -> bool {
        self.end_states.contains(&state)
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Generate from a fixed opening pair. With `prefer_resolution` off and
    /// a zero temperature the result depends on `start` alone.
    pub fn generate_from(&self, start: State, params: &GenerationParams, rng: &mut impl RandomSource) -> Vec<i8> {
        let mut out = vec![start.0, start.1];
        while out.len() < params.length {
            let state = (out[out.len() - 2], out[out.len() - 1]);
            if resolves_here(out.len(), params.length, self.is_end_state(state), params, rng) {
                break;
            }
            match sample_transition(self.transitions_from(state), params.temperature, rng) {
                Some(next) => out.push(next),
                None => {
                    log::trace!("{} markov: dead end at {state:?}", self.style);
                    break;
                }
            }
        }
        out.truncate(params.length);
        out
    }

    fn pick_start(&self, start_interval: Option<i8>, rng: &mut impl RandomSource) -> Option<State> {
        let constrained: Vec<State> = match start_interval {
            Some(first) => self.start_states.iter().copied().filter(|s| s.0 == first).collect(),
            None => Vec::new(),
        };
        if constrained.is_empty() {
            if let Some(first) = start_interval {
                log::debug!("{} markov: no start state opens on {first}, using any", self.style);
            }
            rng.choose(&self.start_states).copied()
        } else {
            rng.choose(&constrained).copied()
        }
    }
}

impl LickGenerator for MarkovModel {
    fn style(&self) -> &str {
        &self.style
    }

    fn generate(&self, params: &GenerationParams, rng: &mut impl RandomSource) -> Vec<i8> {
        match self.pick_start(params.start_interval, rng) {
            Some(start) => self.generate_from(start, params, rng),
            None => Vec::new(),
        }
    }

    fn stats(&self) -> ModelStats {
        summarize(
            &self.style,
            3,
            self.pattern_count,
            &self.transitions,
            self.start_states.len(),
            self.end_states.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licks::{Difficulty, LickCorpus};
    use cadenza_prng::{ReplayRng, SeededRng};

    fn lick(intervals: &[i8]) -> LickPattern {
        LickPattern {
            name: format!("{intervals:?}"),
            style: "test".into(),
            intervals: intervals.to_vec(),
            rhythm: Vec::new(),
            difficulty: Difficulty::Beginner,
            harmonic_context: Vec::new(),
            phrase_type: String::new(),
            characteristics: Vec::new(),
        }
    }

    fn toy_model() -> MarkovModel {
        let a = lick(&[0, 2, 4, 5]);
        let b = lick(&[0, 2, 4, 7]);
        let c = lick(&[0, 2, 4, 5]);
        MarkovModel::train("test", &[&a, &b, &c]).unwrap()
    }

    #[test]
    fn test_context_key() {
        assert_eq!(context_key(&[2, -1, 3]), "2,-1,3");
        assert_eq!(context_key(&[]), "");
    }

    #[test]
    fn test_train_counts_and_probabilities() {
        let model = toy_model();
        assert_eq!(model.pattern_count(), 3);
        assert_eq!(model.start_states(), &[(0, 2), (0, 2), (0, 2)]);
        assert!(model.is_end_state((4, 5)));
        assert!(model.is_end_state((4, 7)));
        let ts = model.transitions_from((2, 4));
        assert_eq!(ts[0].next, 5);
        assert_eq!(ts[0].count, 2);
        assert!((model.transition_probability((2, 4), 5) - 2.0 / 3.0).abs() < 1e-12);
        assert!((model.transition_probability((2, 4), 7) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.transition_probability((2, 4), 9), 0.0);
        assert!(model.transitions_from((9, 9)).is_empty());
    }

    #[test]
    fn test_train_skips_short_patterns() {
        let short = lick(&[0, 2]);
        let err = MarkovModel::train("tiny", &[&short]).unwrap_err();
        assert!(matches!(err, HarmonyError::EmptyCorpus(s) if s == "tiny"));
        assert!(MarkovModel::train("none", &[]).is_err());
    }

    #[test]
    fn test_zero_temperature_is_argmax() {
        let model = toy_model();
        let params = GenerationParams::new(8).with_temperature(0.0).without_resolution();
        let mut rng = SeededRng::new(1);
        // (0,2) -> 4 -> 5, then (4,5) is a dead end.
        assert_eq!(model.generate_from((0, 2), &params, &mut rng), vec![0, 2, 4, 5]);
        assert_eq!(model.generate(&params, &mut rng), vec![0, 2, 4, 5]);
    }

    #[test]
    fn test_length_caps_output() {
        let model = toy_model();
        let params = GenerationParams::new(3).with_temperature(0.0);
        assert_eq!(model.generate(&params, &mut SeededRng::new(2)), vec![0, 2, 4]);
        let params = GenerationParams::new(1);
        assert_eq!(model.generate(&params, &mut SeededRng::new(2)), vec![0]);
    }

    #[test]
    fn test_sample_transition_temperature() {
        let ts = to_transitions(BTreeMap::from([(1, 1), (2, 3)]));
        assert_eq!(ts[0].next, 2);
        assert_eq!(sample_transition(&ts, 0.0, &mut SeededRng::new(0)), Some(2));
        assert_eq!(sample_transition(&ts, f64::NAN, &mut SeededRng::new(0)), Some(2));
        assert_eq!(sample_transition(&[], 1.0, &mut SeededRng::new(0)), None);
        // A draw near 1.0 lands on the last bucket.
        let mut rng = ReplayRng::new(vec![0.99]);
        assert_eq!(sample_transition(&ts, 1.0, &mut rng), Some(1));
        // Cooling shrinks the minority bucket below the draw.
        let mut rng = ReplayRng::new(vec![0.9]);
        assert_eq!(sample_transition(&ts, 0.2, &mut rng), Some(2));
    }

    #[test]
    fn test_resolution_stops_in_final_quarter() {
        let a = lick(&[0, 1, 0, 1, 0, 1, 0, 1]);
        let model = MarkovModel::train("loop", &[&a]).unwrap();
        assert!(model.is_end_state((0, 1)));
        // Every coin flip fires, so generation stops on the first end state
        // at or past three quarters of the target.
        let params = GenerationParams::new(8).with_temperature(0.0);
        let out = model.generate_from((0, 1), &params, &mut ReplayRng::new(vec![0.0]));
        assert_eq!(out, vec![0, 1, 0, 1, 0, 1]);
        let out = model.generate_from((0, 1), &params.without_resolution(), &mut ReplayRng::new(vec![0.0]));
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_start_interval_constraint() {
        let a = lick(&[0, 2, 4]);
        let b = lick(&[7, 5, 4]);
        let model = MarkovModel::train("two", &[&a, &b]).unwrap();
        let params = GenerationParams::new(3).with_temperature(0.0).starting_on(7);
        for seed in 0..8 {
            assert_eq!(model.generate(&params, &mut SeededRng::new(seed))[0], 7);
        }
        let params = GenerationParams::new(3).starting_on(11);
        let first = model.generate(&params, &mut SeededRng::new(3))[0];
        assert!(first == 0 || first == 7);
    }

    #[test]
    fn test_builtin_generation_uses_observed_transitions() {
        let corpus = LickCorpus::builtin();
        let model = MarkovModel::train("bebop", &corpus.by_style("bebop")).unwrap();
        let mut rng = SeededRng::new(42);
        for _ in 0..50 {
            let out = model.generate(&GenerationParams::new(12), &mut rng);
            assert!(out.len() >= 2 && out.len() <= 12);
            assert!(model.start_states().contains(&(out[0], out[1])));
            for w in out.windows(3) {
                assert!(model.transition_probability((w[0], w[1]), w[2]) > 0.0);
            }
        }
    }

    #[test]
    fn test_stats() {
        let stats = toy_model().stats();
        assert_eq!(stats.order, 3);
        assert_eq!(stats.state_count, 2);
        assert_eq!(stats.transition_count, 3);
        assert_eq!(stats.start_state_count, 3);
        assert_eq!(stats.end_state_count, 2);
        assert_eq!(stats.top_transitions[0], ("0,2".to_string(), 4, 3));
        assert!((stats.average_branching - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_model_json_round_trip() {
        let model = toy_model();
        let json = serde_json::to_string(&model).unwrap();
        let back: MarkovModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
