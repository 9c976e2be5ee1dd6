//! IndexOfMaximum factor: argmax over a list of Gaussians.
//!
//! The exact operator keeps per-candidate buffers: for candidate k, the
//! running max of every other element, folded pairwise through the Max
//! primitive. Each element's message is then refined by division against
//! its incoming belief. One full refresh costs O(n^2); the buffers encode
//! a fixed point of the pairwise-max network, so repeated external calls
//! are expected until the messages stop moving.
//!
//! The `fast` variant trades accuracy for an O(n log n) sweep over the
//! mean-sorted list with shared prefix/suffix folds. The two variants are
//! both public; the caller chooses the trade.

use ff_common::{InferenceSettings, OpResult, OperatorError};
use ff_dist::{Discrete, Gaussian};
use ff_math::{normal_cdf_ln, normal_cdf_ratio};
use serde::{Deserialize, Serialize};

use crate::max_gaussian;

/// Auxiliary state for the exact operator, owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexOfMaximumBuffer {
    /// Per candidate k: the running max of every element except k.
    pub messages_to_max: Vec<Gaussian>,
    /// Last message sent to each list element.
    pub to_list: Vec<Gaussian>,
}

impl IndexOfMaximumBuffer {
    /// Buffer initialization depends only on the static list length.
    pub fn init(len: usize) -> Self {
        IndexOfMaximumBuffer {
            messages_to_max: vec![Gaussian::uniform(); len],
            to_list: vec![Gaussian::uniform(); len],
        }
    }

    /// Refresh the per-candidate running maxes from current messages.
    pub fn update(&mut self, list: &[Gaussian], settings: &InferenceSettings) -> OpResult<()> {
        if list.len() != self.messages_to_max.len() {
            return Err(OperatorError::DomainMismatch {
                argument: "list",
                message: format!(
                    "buffer sized for {}, got {}",
                    self.messages_to_max.len(),
                    list.len()
                ),
            });
        }
        for k in 0..list.len() {
            self.messages_to_max[k] =
                fold_max(list.iter().enumerate().filter(|(j, _)| *j != k), settings)?;
        }
        tracing::trace!(
            target: "ff_ops::index_of_maximum",
            candidates = list.len(),
            "refreshed running-max buffers"
        );
        Ok(())
    }
}

fn fold_max<'a>(
    items: impl Iterator<Item = (usize, &'a Gaussian)>,
    settings: &InferenceSettings,
) -> OpResult<Gaussian> {
    let mut acc: Option<Gaussian> = None;
    for (_, g) in items {
        acc = Some(match acc {
            None => *g,
            Some(prev) => {
                max_gaussian::max_average_conditional(&Gaussian::uniform(), &prev, g, settings)?
            }
        });
    }
    acc.ok_or(OperatorError::DomainMismatch {
        argument: "list",
        message: "argmax needs at least two elements".to_string(),
    })
}

/// log P(x beats y) under independent Gaussians.
fn log_win_prob(x: &Gaussian, y: &Gaussian) -> f64 {
    let (mx, vx) = x.mean_and_variance();
    let (my, vy) = y.mean_and_variance();
    let d2 = vx + vy;
    if d2 == 0.0 {
        return if mx >= my { 0.0 } else { f64::NEG_INFINITY };
    }
    normal_cdf_ln((mx - my) / d2.sqrt())
}

/// Soft truncation of `target` to lie above `threshold`.
fn survivor_moments(target: &Gaussian, threshold: &Gaussian) -> (f64, f64) {
    let (m, v) = target.mean_and_variance();
    let (mt, vt) = threshold.mean_and_variance();
    let d2 = v + vt;
    if d2 == 0.0 || v == 0.0 {
        return (m, v);
    }
    let d = d2.sqrt();
    let t = (m - mt) / d;
    let h = 1.0 / normal_cdf_ratio(t);
    let mean = m + v * h / d;
    let variance = (v - v * v * h * (h + t) / d2).max(0.0);
    (mean, variance)
}

/// Soft truncation of `target` to lie below `threshold`.
fn loser_moments(target: &Gaussian, threshold: &Gaussian) -> (f64, f64) {
    let (m, v) = target.mean_and_variance();
    let (mt, vt) = threshold.mean_and_variance();
    let d2 = v + vt;
    if d2 == 0.0 || v == 0.0 {
        return (m, v);
    }
    let d = d2.sqrt();
    let t = (mt - m) / d;
    let h = 1.0 / normal_cdf_ratio(t);
    let mean = m - v * h / d;
    let variance = (v - v * v * h * (h + t) / d2).max(0.0);
    (mean, variance)
}

/// EP message to the index: per-candidate win log-probabilities against
/// the buffered running maxes.
pub fn index_of_maximum_average_conditional(
    list: &[Gaussian],
    buffer: &IndexOfMaximumBuffer,
) -> OpResult<Discrete> {
    if list.len() < 2 {
        return Err(OperatorError::DomainMismatch {
            argument: "list",
            message: "argmax needs at least two elements".to_string(),
        });
    }
    let weights: Vec<f64> = list
        .iter()
        .zip(buffer.messages_to_max.iter())
        .map(|(x, y)| log_win_prob(x, y))
        .collect();
    Ok(Discrete::from_log_weights(weights)?.0)
}

/// EP messages to the list elements: a per-element blend over candidates,
/// divided by the element's incoming belief. Updates `buffer.to_list`.
pub fn list_average_conditional(
    index: &Discrete,
    list: &[Gaussian],
    buffer: &mut IndexOfMaximumBuffer,
    settings: &InferenceSettings,
) -> OpResult<Vec<Gaussian>> {
    if index.len() != list.len() {
        return Err(OperatorError::DomainMismatch {
            argument: "index",
            message: format!("index support {} vs list {}", index.len(), list.len()),
        });
    }
    // Posterior candidate weights combine the index message with the
    // evidence each candidate earns from the max network
    let mut log_weights: Vec<f64> = (0..list.len())
        .map(|k| index.log_prob(k) + log_win_prob(&list[k], &buffer.messages_to_max[k]))
        .collect();
    let norm = ff_math::normalize_log_probs(&mut log_weights);
    if norm == f64::NEG_INFINITY {
        return Err(OperatorError::AllZero {
            constraint: "no candidate index has positive probability",
        });
    }
    let mut out = Vec::with_capacity(list.len());
    for i in 0..list.len() {
        let mut mean = 0.0;
        let mut second = 0.0;
        for (k, &lw) in log_weights.iter().enumerate() {
            if lw == f64::NEG_INFINITY {
                continue;
            }
            let w = lw.exp();
            let (mu, var) = if k == i {
                survivor_moments(&list[i], &buffer.messages_to_max[i])
            } else {
                loser_moments(&list[i], &list[k])
            };
            mean += w * mu;
            second += w * (var + mu * mu);
        }
        let posterior = Gaussian::from_mean_and_variance(mean, (second - mean * mean).max(0.0));
        let msg = if list[i].is_point_mass() {
            Gaussian::uniform()
        } else {
            posterior.ratio(&list[i], settings.force_proper)?
        };
        buffer.to_list[i] = msg;
        out.push(msg);
    }
    Ok(out)
}

/// Approximate O(n log n) sweep: sort by mean, reuse prefix/suffix max
/// folds instead of per-candidate exclusion.
pub fn index_of_maximum_fast_average_conditional(
    list: &[Gaussian],
    settings: &InferenceSettings,
) -> OpResult<Discrete> {
    let n = list.len();
    if n < 2 {
        return Err(OperatorError::DomainMismatch {
            argument: "list",
            message: "argmax needs at least two elements".to_string(),
        });
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        list[j]
            .mean()
            .partial_cmp(&list[i].mean())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    // prefix[p] = max of sorted[0..=p], suffix[p] = max of sorted[p..]
    let mut prefix = Vec::with_capacity(n);
    for p in 0..n {
        let g = list[order[p]];
        prefix.push(match p {
            0 => g,
            _ => max_gaussian::max_average_conditional(
                &Gaussian::uniform(),
                &prefix[p - 1],
                &g,
                settings,
            )?,
        });
    }
    let mut suffix = vec![Gaussian::uniform(); n];
    for p in (0..n).rev() {
        let g = list[order[p]];
        suffix[p] = if p == n - 1 {
            g
        } else {
            max_gaussian::max_average_conditional(&Gaussian::uniform(), &suffix[p + 1], &g, settings)?
        };
    }
    let mut weights = vec![f64::NEG_INFINITY; n];
    for p in 0..n {
        let rest = if p == 0 {
            suffix[1]
        } else if p == n - 1 {
            prefix[n - 2]
        } else {
            max_gaussian::max_average_conditional(
                &Gaussian::uniform(),
                &prefix[p - 1],
                &suffix[p + 1],
                settings,
            )?
        };
        weights[order[p]] = log_win_prob(&list[order[p]], &rest);
    }
    Ok(Discrete::from_log_weights(weights)?.0)
}

/// Evidence: log E[factor] for an uncertain index.
pub fn log_average_factor(
    index: &Discrete,
    list: &[Gaussian],
    buffer: &IndexOfMaximumBuffer,
) -> OpResult<f64> {
    let to_index = index_of_maximum_average_conditional(list, buffer)?;
    Ok(to_index.log_average_of(index))
}

/// EP evidence contribution: zero for an uncertain index (the forward
/// normalizer cancels), the log-factor itself for an observed one.
pub fn log_evidence_ratio(
    index: &Discrete,
    list: &[Gaussian],
    buffer: &IndexOfMaximumBuffer,
) -> OpResult<f64> {
    if index.is_point_mass() {
        log_average_factor(index, list, buffer)
    } else {
        Ok(0.0)
    }
}
