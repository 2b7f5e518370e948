use std::cmp::Ordering;

use num::Num;
use serde::{Deserialize, Serialize};

use crate::utils::sort::radix_sort_u32_soa;

/// Sparse vector over a fixed dimension.
///
/// Non-zero entries are kept as two parallel arrays (indices / values),
/// indices strictly ascending. Entries not stored are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVec<N = f64>
where
    N: Num + Copy,
{
    inds: Vec<u32>,
    vals: Vec<N>,
    len: u32,
}

impl<N> SparseVec<N>
where
    N: Num + Copy + Default,
{
    /// All-zero vector of dimension `len`
    pub fn zeros(len: u32) -> Self {
        Self { inds: Vec::new(), vals: Vec::new(), len }
    }

    /// Build from unordered (index, value) pairs.
    /// Zero values are dropped; indices must be unique and below `len`.
    pub fn from_unsorted(len: u32, mut inds: Vec<u32>, mut vals: Vec<N>) -> Self {
        debug_assert_eq!(inds.len(), vals.len(), "inds and vals must have the same length");
        radix_sort_u32_soa(&mut inds, &mut vals);
        let (inds, vals) = inds
            .into_iter()
            .zip(vals)
            .filter(|(_, v)| !v.is_zero())
            .unzip();
        Self { inds, vals, len }
    }

    /// Build from already sorted parts, checking the ordering invariant.
    pub fn try_from_parts(len: u32, inds: Vec<u32>, vals: Vec<N>) -> Result<Self, String> {
        let vec = Self { inds, vals, len };
        vec.check()?;
        Ok(vec)
    }

    /// Check structural invariants: paired arrays, strictly ascending indices, in range.
    pub fn check(&self) -> Result<(), String> {
        if self.inds.len() != self.vals.len() {
            return Err(format!(
                "index/value length mismatch ({} vs {})",
                self.inds.len(),
                self.vals.len()
            ));
        }
        if self.inds.windows(2).any(|w| w[0] >= w[1]) {
            return Err("indices are not strictly ascending".to_string());
        }
        if let Some(&last) = self.inds.last() {
            if last >= self.len {
                return Err(format!("index {} out of range for dimension {}", last, self.len));
            }
        }
        Ok(())
    }
}

impl<N> SparseVec<N>
where
    N: Num + Copy,
{
    /// Dimension
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Number of stored (non-zero) entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inds.is_empty()
    }

    /// (index, value) pairs in ascending index order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, N)> + '_ {
        self.inds.iter().copied().zip(self.vals.iter().copied())
    }

    #[inline]
    pub fn values(&self) -> &[N] {
        &self.vals
    }

    /// Value at `index`, zero when not stored
    pub fn get(&self, index: u32) -> N {
        match self.inds.binary_search(&index) {
            Ok(pos) => self.vals[pos],
            Err(_) => N::zero(),
        }
    }
}

impl<N> SparseVec<N>
where
    N: Num + Copy + Into<f64>,
{
    /// dot product
    /// d(a, b) = Σ(a_i * b_i)
    pub fn dot(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.len, other.len, "vectors must share a dimension");
        let (mut i, mut j) = (0, 0);
        let mut result = 0.0;
        while i < self.inds.len() && j < other.inds.len() {
            match self.inds[i].cmp(&other.inds[j]) {
                Ordering::Equal => {
                    result += self.vals[i].into() * other.vals[j].into();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        result
    }

    /// ||a||^2
    pub fn norm_sq(&self) -> f64 {
        self.vals.iter().map(|&v| {
            let v: f64 = v.into();
            v * v
        }).sum()
    }

    /// cos(θ) = Σ(a_i * b_i) / (||a|| * ||b||)
    /// Zero vectors have similarity 0 with everything.
    pub fn cosine_similarity(&self, other: &Self) -> f64 {
        cosine_with_norms(self, self.norm_sq().sqrt(), other, other.norm_sq().sqrt())
    }
}

/// Cosine similarity with precomputed norms
pub(crate) fn cosine_with_norms<N>(a: &SparseVec<N>, norm_a: f64, b: &SparseVec<N>, norm_b: f64) -> f64
where
    N: Num + Copy + Into<f64>,
{
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    a.dot(b) / (norm_a * norm_b)
}

impl SparseVec<f64> {
    /// Scale to unit L2 norm. The zero vector is returned unchanged.
    pub fn l2_normalized(mut self) -> Self {
        let norm = self.norm_sq().sqrt();
        if norm > 0.0 {
            self.vals.iter_mut().for_each(|v| *v /= norm);
        }
        self
    }
}
