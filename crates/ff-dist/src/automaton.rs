//! Weighted finite automaton over strings.
//!
//! The string-distribution family: a point mass is a linear chain, the
//! improper uniform accepts any string, products of messages are automaton
//! intersections. Transitions carry log-weights; there are no epsilon
//! transitions, so concatenation glues accepting states onto the start
//! state of the suffix automaton.

use std::collections::HashMap;

use ff_math::{log_add_exp, log_sum_exp};
use serde::{Deserialize, Serialize};

/// Transition label: a literal character or any character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Char(char),
    Any,
}

impl Label {
    fn matches(&self, c: char) -> bool {
        match self {
            Label::Char(l) => *l == c,
            Label::Any => true,
        }
    }

    /// Label accepted by both, if any.
    fn meet(&self, other: &Label) -> Option<Label> {
        match (self, other) {
            (Label::Any, l) => Some(*l),
            (l, Label::Any) => Some(*l),
            (Label::Char(a), Label::Char(b)) if a == b => Some(Label::Char(*a)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Transition {
    label: Label,
    target: usize,
    log_weight: f64,
}

/// Weighted string automaton / distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringAutomaton {
    start: usize,
    /// Outgoing transitions per state.
    transitions: Vec<Vec<Transition>>,
    /// Accepting log-weight per state; None means non-accepting.
    accept: Vec<Option<f64>>,
}

impl StringAutomaton {
    /// The empty-language automaton (zero distribution).
    pub fn zero() -> Self {
        StringAutomaton {
            start: 0,
            transitions: vec![vec![]],
            accept: vec![None],
        }
    }

    /// Point mass on one string: a linear chain of literal transitions.
    pub fn point_mass(s: &str) -> Self {
        let chars: Vec<char> = s.chars().collect();
        let n = chars.len();
        let mut transitions = vec![Vec::new(); n + 1];
        for (i, &c) in chars.iter().enumerate() {
            transitions[i].push(Transition {
                label: Label::Char(c),
                target: i + 1,
                log_weight: 0.0,
            });
        }
        let mut accept = vec![None; n + 1];
        accept[n] = Some(0.0);
        StringAutomaton {
            start: 0,
            transitions,
            accept,
        }
    }

    /// The improper uniform: accepts every string with weight one.
    pub fn any_string() -> Self {
        StringAutomaton {
            start: 0,
            transitions: vec![vec![Transition {
                label: Label::Any,
                target: 0,
                log_weight: 0.0,
            }]],
            accept: vec![Some(0.0)],
        }
    }

    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_uniform(&self) -> bool {
        self.num_states() == 1
            && self.accept[0] == Some(0.0)
            && self.transitions[0].len() == 1
            && self.transitions[0][0]
                == Transition {
                    label: Label::Any,
                    target: 0,
                    log_weight: 0.0,
                }
    }

    /// True when no accepting state is reachable.
    pub fn is_zero(&self) -> bool {
        let mut seen = vec![false; self.num_states()];
        let mut stack = vec![self.start];
        seen[self.start] = true;
        while let Some(s) = stack.pop() {
            if self.accept[s].is_some() {
                return false;
            }
            for t in &self.transitions[s] {
                if !seen[t.target] {
                    seen[t.target] = true;
                    stack.push(t.target);
                }
            }
        }
        true
    }

    /// Log-weight assigned to one string.
    pub fn log_weight_of(&self, s: &str) -> f64 {
        let mut frontier: HashMap<usize, f64> = HashMap::new();
        frontier.insert(self.start, 0.0);
        for c in s.chars() {
            let mut next: HashMap<usize, f64> = HashMap::new();
            for (&state, &lw) in &frontier {
                for t in &self.transitions[state] {
                    if t.label.matches(c) {
                        let entry = next.entry(t.target).or_insert(f64::NEG_INFINITY);
                        *entry = log_add_exp(*entry, lw + t.log_weight);
                    }
                }
            }
            if next.is_empty() {
                return f64::NEG_INFINITY;
            }
            frontier = next;
        }
        let terms: Vec<f64> = frontier
            .iter()
            .filter_map(|(&state, &lw)| self.accept[state].map(|aw| lw + aw))
            .collect();
        log_sum_exp(&terms)
    }

    /// Concatenation: self followed by other.
    pub fn concat(&self, other: &StringAutomaton) -> StringAutomaton {
        let offset = self.num_states();
        let mut transitions = self.transitions.clone();
        for trans in &other.transitions {
            transitions.push(
                trans
                    .iter()
                    .map(|t| Transition {
                        label: t.label,
                        target: t.target + offset,
                        log_weight: t.log_weight,
                    })
                    .collect(),
            );
        }
        let mut accept: Vec<Option<f64>> = vec![None; offset];
        accept.extend(other.accept.iter().copied());
        // Glue: each accepting state of self behaves like other's start
        let glue: Vec<Transition> = other.transitions[other.start]
            .iter()
            .map(|t| Transition {
                label: t.label,
                target: t.target + offset,
                log_weight: t.log_weight,
            })
            .collect();
        for s in 0..offset {
            if let Some(aw) = self.accept[s] {
                for t in &glue {
                    transitions[s].push(Transition {
                        label: t.label,
                        target: t.target,
                        log_weight: t.log_weight + aw,
                    });
                }
                accept[s] = other.accept[other.start].map(|bw| aw + bw);
            }
        }
        StringAutomaton {
            start: self.start,
            transitions,
            accept,
        }
    }

    /// Union: either branch, weights preserved.
    pub fn union(&self, other: &StringAutomaton) -> StringAutomaton {
        let offset = self.num_states() + 1;
        let mut transitions: Vec<Vec<Transition>> = vec![Vec::new()];
        let mut accept: Vec<Option<f64>> = vec![None];
        for trans in &self.transitions {
            transitions.push(
                trans
                    .iter()
                    .map(|t| Transition {
                        label: t.label,
                        target: t.target + 1,
                        log_weight: t.log_weight,
                    })
                    .collect(),
            );
        }
        accept.extend(self.accept.iter().copied());
        for trans in &other.transitions {
            transitions.push(
                trans
                    .iter()
                    .map(|t| Transition {
                        label: t.label,
                        target: t.target + offset,
                        log_weight: t.log_weight,
                    })
                    .collect(),
            );
        }
        accept.extend(other.accept.iter().copied());
        // The fresh start mirrors both original starts
        let mut start_trans: Vec<Transition> = self.transitions[self.start]
            .iter()
            .map(|t| Transition {
                label: t.label,
                target: t.target + 1,
                log_weight: t.log_weight,
            })
            .collect();
        start_trans.extend(other.transitions[other.start].iter().map(|t| Transition {
            label: t.label,
            target: t.target + offset,
            log_weight: t.log_weight,
        }));
        transitions[0] = start_trans;
        accept[0] = match (self.accept[self.start], other.accept[other.start]) {
            (Some(a), Some(b)) => Some(log_add_exp(a, b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        StringAutomaton {
            start: 0,
            transitions,
            accept,
        }
    }

    /// Intersection by product construction; the message product for
    /// string distributions.
    pub fn intersect(&self, other: &StringAutomaton) -> StringAutomaton {
        struct Product {
            index: HashMap<(usize, usize), usize>,
            transitions: Vec<Vec<Transition>>,
            accept: Vec<Option<f64>>,
            stack: Vec<(usize, usize)>,
        }
        impl Product {
            fn intern(&mut self, pair: (usize, usize)) -> usize {
                if let Some(&i) = self.index.get(&pair) {
                    return i;
                }
                let i = self.transitions.len();
                self.index.insert(pair, i);
                self.transitions.push(Vec::new());
                self.accept.push(None);
                self.stack.push(pair);
                i
            }
        }

        let mut prod = Product {
            index: HashMap::new(),
            transitions: Vec::new(),
            accept: Vec::new(),
            stack: Vec::new(),
        };
        let start = prod.intern((self.start, other.start));
        while let Some((a, b)) = prod.stack.pop() {
            let here = prod.index[&(a, b)];
            prod.accept[here] = match (self.accept[a], other.accept[b]) {
                (Some(x), Some(y)) => Some(x + y),
                _ => None,
            };
            let mut out = Vec::new();
            for ta in &self.transitions[a] {
                for tb in &other.transitions[b] {
                    if let Some(label) = ta.label.meet(&tb.label) {
                        let target = prod.intern((ta.target, tb.target));
                        out.push(Transition {
                            label,
                            target,
                            log_weight: ta.log_weight + tb.log_weight,
                        });
                    }
                }
            }
            prod.transitions[here] = out;
        }
        let Product {
            transitions, accept, ..
        } = prod;
        StringAutomaton {
            start,
            transitions,
            accept,
        }
    }

    /// Weight of consuming `s` from `state` through to acceptance.
    fn completion_weight(&self, state: usize, s: &str) -> f64 {
        let mut frontier: HashMap<usize, f64> = HashMap::new();
        frontier.insert(state, 0.0);
        for c in s.chars() {
            let mut next: HashMap<usize, f64> = HashMap::new();
            for (&st, &lw) in &frontier {
                for t in &self.transitions[st] {
                    if t.label.matches(c) {
                        let entry = next.entry(t.target).or_insert(f64::NEG_INFINITY);
                        *entry = log_add_exp(*entry, lw + t.log_weight);
                    }
                }
            }
            if next.is_empty() {
                return f64::NEG_INFINITY;
            }
            frontier = next;
        }
        let terms: Vec<f64> = frontier
            .iter()
            .filter_map(|(&st, &lw)| self.accept[st].map(|aw| lw + aw))
            .collect();
        log_sum_exp(&terms)
    }

    /// Projection onto the middle section: the weighted language of
    /// strings `x` such that `prefix + x + suffix` is accepted.
    ///
    /// This is the automaton-intersection backward message of a
    /// template factor whose other segments are literal.
    pub fn between(&self, prefix: &str, suffix: &str) -> StringAutomaton {
        let mut frontier: HashMap<usize, f64> = HashMap::new();
        frontier.insert(self.start, 0.0);
        for c in prefix.chars() {
            let mut next: HashMap<usize, f64> = HashMap::new();
            for (&st, &lw) in &frontier {
                for t in &self.transitions[st] {
                    if t.label.matches(c) {
                        let entry = next.entry(t.target).or_insert(f64::NEG_INFINITY);
                        *entry = log_add_exp(*entry, lw + t.log_weight);
                    }
                }
            }
            if next.is_empty() {
                return StringAutomaton::zero();
            }
            frontier = next;
        }
        // Acceptance of the projected automaton: completing the suffix
        let accept: Vec<Option<f64>> = (0..self.num_states())
            .map(|s| {
                let w = self.completion_weight(s, suffix);
                if w == f64::NEG_INFINITY {
                    None
                } else {
                    Some(w)
                }
            })
            .collect();
        // Fresh start mirroring the post-prefix frontier
        let offset = 1;
        let mut transitions: Vec<Vec<Transition>> = vec![Vec::new()];
        for trans in &self.transitions {
            transitions.push(
                trans
                    .iter()
                    .map(|t| Transition {
                        label: t.label,
                        target: t.target + offset,
                        log_weight: t.log_weight,
                    })
                    .collect(),
            );
        }
        let mut new_accept: Vec<Option<f64>> = vec![None];
        new_accept.extend(accept.iter().copied());
        let mut start_trans = Vec::new();
        let mut start_accept: Option<f64> = None;
        for (&st, &lw) in &frontier {
            for t in &self.transitions[st] {
                start_trans.push(Transition {
                    label: t.label,
                    target: t.target + offset,
                    log_weight: t.log_weight + lw,
                });
            }
            if let Some(aw) = accept[st] {
                start_accept = Some(match start_accept {
                    None => lw + aw,
                    Some(prev) => log_add_exp(prev, lw + aw),
                });
            }
        }
        transitions[0] = start_trans;
        new_accept[0] = start_accept;
        StringAutomaton {
            start: 0,
            transitions,
            accept: new_accept,
        }
        .trimmed()
    }

    /// Drop transitions into states that cannot reach acceptance.
    fn trimmed(mut self) -> StringAutomaton {
        let n = self.num_states();
        let mut co_reachable: Vec<bool> = self.accept.iter().map(|a| a.is_some()).collect();
        // Small automata: iterate to a fixed point
        loop {
            let mut changed = false;
            for s in 0..n {
                if !co_reachable[s]
                    && self.transitions[s].iter().any(|t| co_reachable[t.target])
                {
                    co_reachable[s] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        for trans in self.transitions.iter_mut() {
            trans.retain(|t| co_reachable[t.target]);
        }
        self
    }

    /// The single accepted string, if the language is a singleton along an
    /// unambiguous literal path. Used by point-mass fast paths.
    pub fn try_point(&self) -> Option<String> {
        const MAX_LEN: usize = 100_000;
        let mut result = String::new();
        let mut current: Vec<usize> = vec![self.start];
        for _ in 0..MAX_LEN {
            let accepting = current.iter().any(|&s| self.accept[s].is_some());
            let out: Vec<&Transition> = current
                .iter()
                .flat_map(|&s| self.transitions[s].iter())
                .collect();
            if out.is_empty() {
                return if accepting { Some(result) } else { None };
            }
            if accepting {
                // Accepts both a prefix and a longer string
                return None;
            }
            let first = match out[0].label {
                Label::Char(c) => c,
                Label::Any => return None,
            };
            if out.iter().any(|t| t.label != Label::Char(first)) {
                return None;
            }
            result.push(first);
            let mut next: Vec<usize> = out.iter().map(|t| t.target).collect();
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        None
    }
}
