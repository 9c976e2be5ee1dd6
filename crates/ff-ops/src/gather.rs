//! Indexing factors over lists of distributions: GetItem and SubList.
//!
//! Forward messages extract elements; backward messages scatter into an
//! otherwise-uniform list. Deterministic, so evidence contributions are
//! zero for derived outputs.

use ff_common::{OpResult, OperatorError};
use ff_dist::Belief;

/// EP message to the extracted item.
pub fn item_average_conditional<B: Belief>(list: &[B], index: usize) -> OpResult<B> {
    list.get(index)
        .cloned()
        .ok_or_else(|| OperatorError::DomainMismatch {
            argument: "index",
            message: format!("index {index} out of bounds for list of {}", list.len()),
        })
}

/// EP message to the list: the item belief lands at `index`, every other
/// position is uniform.
pub fn list_average_conditional<B: Belief>(
    item: &B,
    index: usize,
    len: usize,
) -> OpResult<Vec<B>> {
    if index >= len {
        return Err(OperatorError::DomainMismatch {
            argument: "index",
            message: format!("index {index} out of bounds for list of {len}"),
        });
    }
    let mut out = vec![item.uniform_like(); len];
    out[index] = item.clone();
    Ok(out)
}

/// VMP messages coincide with EP for deterministic extraction.
pub fn item_average_logarithm<B: Belief>(list: &[B], index: usize) -> OpResult<B> {
    item_average_conditional(list, index)
}

pub fn list_average_logarithm<B: Belief>(item: &B, index: usize, len: usize) -> OpResult<Vec<B>> {
    list_average_conditional(item, index, len)
}

/// EP message to an extracted contiguous sub-list.
pub fn sub_list_average_conditional<B: Belief>(
    list: &[B],
    start: usize,
    count: usize,
) -> OpResult<Vec<B>> {
    if start + count > list.len() {
        return Err(OperatorError::DomainMismatch {
            argument: "start",
            message: format!(
                "range {start}..{} out of bounds for list of {}",
                start + count,
                list.len()
            ),
        });
    }
    Ok(list[start..start + count].to_vec())
}

/// EP message to the source list from a sub-list belief.
pub fn source_average_conditional<B: Belief>(
    sub: &[B],
    start: usize,
    len: usize,
) -> OpResult<Vec<B>> {
    if start + sub.len() > len {
        return Err(OperatorError::DomainMismatch {
            argument: "start",
            message: format!(
                "range {start}..{} out of bounds for list of {len}",
                start + sub.len()
            ),
        });
    }
    if sub.is_empty() {
        return Err(OperatorError::DomainMismatch {
            argument: "sub",
            message: "empty sub-list".to_string(),
        });
    }
    let mut out = vec![sub[0].uniform_like(); len];
    for (offset, belief) in sub.iter().enumerate() {
        out[start + offset] = belief.clone();
    }
    Ok(out)
}

/// Evidence: log E[factor] for an observed item against the forward belief.
pub fn log_average_factor<B: Belief>(item: &B, list: &[B], index: usize) -> OpResult<f64> {
    let forward = item_average_conditional(list, index)?;
    Ok(forward.log_average_of(item))
}

/// Derived outputs contribute no evidence.
pub fn log_evidence_ratio() -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_dist::Gaussian;

    #[test]
    fn extraction_and_scatter() {
        let list = vec![
            Gaussian::from_mean_and_variance(0.0, 1.0),
            Gaussian::from_mean_and_variance(5.0, 2.0),
        ];
        let item = item_average_conditional(&list, 1).unwrap();
        assert_eq!(item, list[1]);

        let back = list_average_conditional(&item, 1, 2).unwrap();
        assert!(back[0].is_uniform());
        assert_eq!(back[1], item);
    }

    #[test]
    fn out_of_bounds_is_domain_mismatch() {
        let list = vec![Gaussian::uniform()];
        assert!(matches!(
            item_average_conditional(&list, 3),
            Err(OperatorError::DomainMismatch { .. })
        ));
    }

    #[test]
    fn sub_list_round_trip() {
        let list: Vec<Gaussian> = (0..5)
            .map(|i| Gaussian::from_mean_and_variance(i as f64, 1.0))
            .collect();
        let sub = sub_list_average_conditional(&list, 1, 3).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub[0], list[1]);

        let back = source_average_conditional(&sub, 1, 5).unwrap();
        assert!(back[0].is_uniform());
        assert_eq!(back[2], list[2]);
        assert!(back[4].is_uniform());
    }

    #[test]
    fn evidence_of_matching_point_mass_is_zero() {
        let list = vec![Gaussian::point_mass(2.0), Gaussian::point_mass(3.0)];
        let item = Gaussian::point_mass(3.0);
        assert_eq!(log_average_factor(&item, &list, 1).unwrap(), 0.0);
        // Mismatched constants: zero likelihood, not an error
        let wrong = Gaussian::point_mass(4.0);
        assert_eq!(
            log_average_factor(&wrong, &list, 1).unwrap(),
            f64::NEG_INFINITY
        );
    }
}
