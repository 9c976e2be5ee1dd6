//! Sparse list of distributions: a shared default element plus exceptions.
//!
//! Element-wise message operations touch the default once and each
//! exception individually, so lists whose elements mostly agree stay
//! cheap regardless of length.

use std::collections::BTreeMap;

use ff_common::OpResult;
use serde::{Deserialize, Serialize};

/// A length-`len` list where every index holds `default` except the
/// recorded exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseList<D> {
    len: usize,
    default: D,
    exceptions: BTreeMap<usize, D>,
}

impl<D: Clone + PartialEq> SparseList<D> {
    pub fn constant(len: usize, default: D) -> Self {
        SparseList {
            len,
            default,
            exceptions: BTreeMap::new(),
        }
    }

    /// Build from a dense vector, collapsing the most common value by
    /// taking the first element as the default.
    pub fn from_dense(items: Vec<D>) -> Self {
        let len = items.len();
        let default = items[0].clone();
        let mut list = SparseList::constant(len, default);
        for (i, item) in items.into_iter().enumerate() {
            list.set(i, item);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn default_value(&self) -> &D {
        &self.default
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }

    pub fn get(&self, index: usize) -> &D {
        self.exceptions.get(&index).unwrap_or(&self.default)
    }

    /// Set one element; values equal to the default are not stored.
    pub fn set(&mut self, index: usize, value: D) {
        assert!(index < self.len, "index {index} out of bounds {}", self.len);
        if value == self.default {
            self.exceptions.remove(&index);
        } else {
            self.exceptions.insert(index, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &D> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Element-wise unary map; the default is mapped once.
    pub fn map<E: Clone + PartialEq>(&self, mut f: impl FnMut(&D) -> E) -> SparseList<E> {
        let default = f(&self.default);
        let mut out = SparseList::constant(self.len, default);
        for (&i, d) in &self.exceptions {
            out.set(i, f(d));
        }
        out
    }

    /// Element-wise fallible map, preserving sparsity.
    pub fn try_map<E: Clone + PartialEq>(
        &self,
        mut f: impl FnMut(&D) -> OpResult<E>,
    ) -> OpResult<SparseList<E>> {
        let default = f(&self.default)?;
        let mut out = SparseList::constant(self.len, default);
        for (&i, d) in &self.exceptions {
            out.set(i, f(d)?);
        }
        Ok(out)
    }

    /// Element-wise fallible zip over the union of exception indices.
    pub fn try_zip_map<E: Clone + PartialEq, F: Clone + PartialEq>(
        &self,
        other: &SparseList<E>,
        mut f: impl FnMut(&D, &E) -> OpResult<F>,
    ) -> OpResult<SparseList<F>> {
        assert_eq!(self.len, other.len, "sparse list length mismatch");
        let default = f(&self.default, &other.default)?;
        let mut out = SparseList::constant(self.len, default);
        let indices: Vec<usize> = self
            .exceptions
            .keys()
            .chain(other.exceptions.keys())
            .copied()
            .collect();
        for i in indices {
            out.set(i, f(self.get(i), other.get(i))?);
        }
        Ok(out)
    }

    /// Sum of a per-element score, using sparsity: count * default score
    /// plus per-exception corrections.
    pub fn sum_scores(&self, mut score: impl FnMut(&D) -> f64) -> f64 {
        let default_score = score(&self.default);
        let mut total = default_score * (self.len - self.exceptions.len()) as f64;
        for d in self.exceptions.values() {
            total += score(d);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_collapse_to_default() {
        let mut list = SparseList::constant(5, 0i32);
        list.set(2, 7);
        assert_eq!(*list.get(2), 7);
        assert_eq!(*list.get(3), 0);
        assert_eq!(list.exception_count(), 1);
        list.set(2, 0);
        assert_eq!(list.exception_count(), 0);
    }

    #[test]
    fn map_preserves_sparsity() {
        let mut list = SparseList::constant(100, 1i32);
        list.set(10, 5);
        let doubled = list.map(|&x| x * 2);
        assert_eq!(*doubled.get(10), 10);
        assert_eq!(*doubled.get(0), 2);
        assert_eq!(doubled.exception_count(), 1);
    }

    #[test]
    fn zip_map_unions_exceptions() {
        let mut a = SparseList::constant(10, 1i32);
        a.set(3, 2);
        let mut b = SparseList::constant(10, 10i32);
        b.set(7, 20);
        let sum = a.try_zip_map(&b, |&x, &y| Ok(x + y)).unwrap();
        assert_eq!(*sum.get(3), 12);
        assert_eq!(*sum.get(7), 21);
        assert_eq!(*sum.get(0), 11);
        assert_eq!(sum.exception_count(), 2);
    }

    #[test]
    fn sum_scores_uses_default_once() {
        let mut list = SparseList::constant(1000, 2.0f64);
        list.set(0, 4.0);
        let total = list.sum_scores(|&x| x);
        assert_eq!(total, 999.0 * 2.0 + 4.0);
    }

    #[test]
    fn from_dense_round_trips() {
        let list = SparseList::from_dense(vec![1, 1, 3, 1]);
        assert_eq!(list.len(), 4);
        assert_eq!(*list.get(2), 3);
        assert_eq!(list.exception_count(), 1);
    }
}
