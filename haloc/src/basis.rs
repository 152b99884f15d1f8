//! Near-orthogonal random projection basis.
//!
//! # Algorithm
//!
//! The first vector is `max_desc` uniform values in `[0, 1)`, normalized.
//! Every following vector `k` starts as `max_desc - k` uniform values and gets
//! `k` trailing components chosen so that it is orthogonal to all `k`
//! accepted vectors. Those components solve a `k x k` system:
//!
//! ```text
//! row n:  v_n[max_desc-k..] . x  =  -(new[..max_desc-k] . v_n[..max_desc-k])
//! ```
//!
//! Each step touches only a small system instead of re-orthogonalizing
//! against the whole basis. The solved vector then gets two Gram-Schmidt
//! correction passes, which remove the rounding the solve leaves behind
//! when the trailing blocks of the accepted vectors are ill-conditioned.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{HalocConfig, HalocError};

/// Tolerance for unit norm and pairwise orthogonality of basis vectors.
pub const BASIS_TOLERANCE: f64 = 1e-4;

/// Tighter bound applied while building, leaving room for the f32 cast.
const DRAW_TOLERANCE: f64 = 1e-9;

/// Minimum share of a candidate's norm that must survive the correction
/// passes. Below it the candidate lies almost inside the accepted span.
const MIN_RETAINED: f64 = 1e-3;

/// Full-length redraws tried when the solved candidate is unusable.
const MAX_REDRAWS: usize = 16;

/// Singular values below this are treated as zero by the solver.
const SOLVE_EPS: f64 = 1e-12;

/// A set of `num_proj` mutually orthogonal unit vectors of length `max_desc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionBasis {
    max_desc: usize,
    vectors: Vec<Vec<f32>>,
}

/// JSON format for persisted bases.
#[derive(Serialize, Deserialize)]
struct BasisFile {
    num_proj: usize,
    max_desc: usize,
    vectors: Vec<Vec<f32>>,
}

impl ProjectionBasis {
    /// Builds a new basis, drawing every random value from `rng`.
    ///
    /// The same generator state always yields the same basis.
    pub fn generate<R: Rng + ?Sized>(
        num_proj: usize,
        max_desc: usize,
        rng: &mut R,
    ) -> Result<Self, HalocError> {
        HalocConfig::new(num_proj, max_desc).validate()?;

        let mut accepted: Vec<Vec<f64>> = Vec::with_capacity(num_proj);
        let first = unit_vector(random_vector(rng, max_desc)).ok_or(HalocError::Basis {
            index: 0,
            reason: "zero-norm draw".into(),
        })?;
        accepted.push(first);

        for k in 1..num_proj {
            let v = orthogonal_vector(rng, &accepted, max_desc).ok_or_else(|| {
                HalocError::Basis {
                    index: k,
                    reason: format!("no independent direction after {MAX_REDRAWS} redraws"),
                }
            })?;
            accepted.push(v);
        }

        tracing::debug!(num_proj, max_desc, "haloc: projection basis built");
        Ok(Self {
            max_desc,
            vectors: accepted
                .into_iter()
                .map(|v| v.into_iter().map(|x| x as f32).collect())
                .collect(),
        })
    }

    /// Wraps existing vectors, checking shape, unit norm and orthogonality.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self, HalocError> {
        let max_desc = vectors.first().map_or(0, Vec::len);
        HalocConfig::new(vectors.len(), max_desc)
            .validate()
            .map_err(|e| HalocError::InvalidBasis(e.to_string()))?;
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != max_desc {
                return Err(HalocError::InvalidBasis(format!(
                    "vector {i} has length {}, expected {max_desc}",
                    v.len()
                )));
            }
        }

        let basis = Self { max_desc, vectors };
        let norm_err = basis.norm_error();
        if norm_err > BASIS_TOLERANCE {
            return Err(HalocError::InvalidBasis(format!(
                "vectors are not unit length (error {norm_err:.2e})"
            )));
        }
        let ortho_err = basis.orthogonality_error();
        if ortho_err > BASIS_TOLERANCE {
            return Err(HalocError::InvalidBasis(format!(
                "vectors are not orthogonal (error {ortho_err:.2e})"
            )));
        }
        Ok(basis)
    }

    /// Loads a basis written by [`ProjectionBasis::to_json`].
    pub fn from_json(json_data: &[u8]) -> Result<Self, HalocError> {
        let bf: BasisFile = serde_json::from_slice(json_data)
            .map_err(|e| HalocError::InvalidBasis(format!("parse basis JSON: {e}")))?;
        if bf.vectors.len() != bf.num_proj {
            return Err(HalocError::InvalidBasis(format!(
                "num_proj is {} but file holds {} vectors",
                bf.num_proj,
                bf.vectors.len()
            )));
        }
        let basis = Self::from_vectors(bf.vectors)?;
        if basis.max_desc != bf.max_desc {
            return Err(HalocError::InvalidBasis(format!(
                "max_desc is {} but vectors have length {}",
                bf.max_desc, basis.max_desc
            )));
        }
        Ok(basis)
    }

    /// Serializes the basis in the format read by [`ProjectionBasis::from_json`].
    pub fn to_json(&self) -> Result<Vec<u8>, HalocError> {
        let bf = BasisFile {
            num_proj: self.num_proj(),
            max_desc: self.max_desc,
            vectors: self.vectors.clone(),
        };
        serde_json::to_vec(&bf).map_err(|e| HalocError::InvalidBasis(e.to_string()))
    }

    /// Returns the number of projection vectors.
    pub fn num_proj(&self) -> usize {
        self.vectors.len()
    }

    /// Returns the length of each projection vector.
    pub fn max_desc(&self) -> usize {
        self.max_desc
    }

    /// Returns the projection vectors, one per row.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Largest deviation of any vector's norm from 1.
    pub fn norm_error(&self) -> f64 {
        self.vectors
            .iter()
            .map(|v| (norm(v) - 1.0).abs())
            .fold(0.0, f64::max)
    }

    /// Largest absolute dot product between two distinct vectors.
    pub fn orthogonality_error(&self) -> f64 {
        let mut worst: f64 = 0.0;
        for (i, a) in self.vectors.iter().enumerate() {
            for b in &self.vectors[i + 1..] {
                worst = worst.max(dot_f32(a, b).abs());
            }
        }
        worst
    }
}

/// Produces the next basis vector: the solved candidate when it survives
/// correction, otherwise a corrected full-length random draw.
fn orthogonal_vector<R: Rng + ?Sized>(
    rng: &mut R,
    accepted: &[Vec<f64>],
    max_desc: usize,
) -> Option<Vec<f64>> {
    let solved = solved_candidate(rng, accepted, max_desc).and_then(|v| corrected(v, accepted));
    if solved.is_some() {
        return solved;
    }
    for attempt in 0..MAX_REDRAWS {
        tracing::debug!(
            index = accepted.len(),
            attempt,
            "haloc: redrawing degenerate basis vector"
        );
        if let Some(v) = corrected(random_vector(rng, max_desc), accepted) {
            return Some(v);
        }
    }
    None
}

/// Leading random values plus the `k` trailing components from the solve.
fn solved_candidate<R: Rng + ?Sized>(
    rng: &mut R,
    accepted: &[Vec<f64>],
    max_desc: usize,
) -> Option<Vec<f64>> {
    let k = accepted.len();
    let lead = max_desc - k;
    let mut v = random_vector(rng, lead);

    let a = DMatrix::from_fn(k, k, |r, c| accepted[r][lead + c]);
    let b = DVector::from_fn(k, |r, _| -dot(&v, &accepted[r][..lead]));
    let x = a.svd(true, true).solve(&b, SOLVE_EPS).ok()?;
    if x.iter().any(|c| !c.is_finite()) {
        return None;
    }

    v.extend(x.iter().copied());
    Some(v)
}

/// Removes the components along `accepted` twice and normalizes.
/// Returns `None` if too little of `v` is left or the result is still off.
fn corrected(mut v: Vec<f64>, accepted: &[Vec<f64>]) -> Option<Vec<f64>> {
    let before = dot(&v, &v).sqrt();
    if !before.is_finite() || before == 0.0 {
        return None;
    }
    for _ in 0..2 {
        for p in accepted {
            let d = dot(&v, p);
            for (x, y) in v.iter_mut().zip(p) {
                *x -= d * y;
            }
        }
    }
    if dot(&v, &v).sqrt() < MIN_RETAINED * before {
        return None;
    }
    let v = unit_vector(v)?;
    accepted
        .iter()
        .all(|p| dot(&v, p).abs() <= DRAW_TOLERANCE)
        .then_some(v)
}

fn random_vector<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<f64> {
    (0..size).map(|_| rng.gen_range(0.0..1.0)).collect()
}

fn unit_vector(mut v: Vec<f64>) -> Option<Vec<f64>> {
    let n = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !n.is_finite() || n == 0.0 {
        return None;
    }
    for x in &mut v {
        *x /= n;
    }
    Some(v)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn dot_f32(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum()
}

fn norm(v: &[f32]) -> f64 {
    dot_f32(v, v).sqrt()
}
