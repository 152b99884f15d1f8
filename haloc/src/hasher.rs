use once_cell::unsync::OnceCell;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{DescriptorMatrix, HalocConfig, HalocError, ProjectionBasis};

/// Returned by [`similarity`] when the hashes cannot be compared.
pub const INVALID_SIMILARITY: f32 = -1.0;

/// Projects descriptor matrices onto a [`ProjectionBasis`] to produce
/// fixed-length image hashes.
///
/// A hash holds `num_proj * D` values for descriptors of dimension `D`.
/// Entry `i * D + n` is the mean over descriptor rows `m` of
/// `(p_i[m] * desc[m][n] + 1) / 2`, where the mean divides by the number of
/// rows the image had before any subsampling.
///
/// # Randomness
///
/// The hasher owns its generator. The basis is drawn from it on the first
/// [`Hasher::calc_hash`] call, and later calls draw from it again only when
/// an image has more than `max_desc` rows and must be subsampled. With a
/// fixed seed, the same sequence of calls yields the same hashes.
pub struct Hasher {
    num_proj: usize,
    max_desc: usize,
    seed: u64,
    rng: StdRng,
    basis: OnceCell<ProjectionBasis>,
}

impl Hasher {
    /// Creates a Hasher whose basis is built lazily on first use.
    pub fn new(cfg: &HalocConfig) -> Result<Self, HalocError> {
        cfg.validate()?;
        let seed = cfg.resolve_seed();
        Ok(Self {
            num_proj: cfg.num_proj,
            max_desc: cfg.max_desc,
            seed,
            rng: StdRng::seed_from_u64(seed),
            basis: OnceCell::new(),
        })
    }

    /// Creates a Hasher around an existing basis.
    ///
    /// `seed` only drives row subsampling here; `None` is time-derived.
    pub fn with_basis(basis: ProjectionBasis, seed: Option<u64>) -> Self {
        let cfg = HalocConfig {
            num_proj: basis.num_proj(),
            max_desc: basis.max_desc(),
            seed,
        };
        let seed = cfg.resolve_seed();
        Self {
            num_proj: cfg.num_proj,
            max_desc: cfg.max_desc,
            seed,
            rng: StdRng::seed_from_u64(seed),
            basis: OnceCell::with_value(basis),
        }
    }

    /// Returns the basis, building it if this is the first use.
    pub fn basis(&mut self) -> Result<&ProjectionBasis, HalocError> {
        let (num_proj, max_desc) = (self.num_proj, self.max_desc);
        let rng = &mut self.rng;
        self.basis
            .get_or_try_init(|| ProjectionBasis::generate(num_proj, max_desc, rng))
    }

    /// True once the basis exists.
    pub fn is_initialized(&self) -> bool {
        self.basis.get().is_some()
    }

    /// Computes the hash of a descriptor matrix.
    ///
    /// Descriptor values are expected roughly within `[-1, 1]`.
    pub fn calc_hash(&mut self, desc: &DescriptorMatrix) -> Result<Vec<f32>, HalocError> {
        self.basis()?;
        if desc.is_empty() {
            return Err(HalocError::EmptyDescriptors);
        }

        // Keep at most max_desc rows, picked at random.
        let used: Vec<usize> = if desc.rows() > self.max_desc {
            tracing::debug!(
                rows = desc.rows(),
                max_desc = self.max_desc,
                "haloc: subsampling descriptors"
            );
            rand::seq::index::sample(&mut self.rng, desc.rows(), self.max_desc).into_vec()
        } else {
            (0..desc.rows()).collect()
        };

        let Some(basis) = self.basis.get() else {
            return Err(HalocError::Basis {
                index: 0,
                reason: "basis missing after initialization".into(),
            });
        };

        let dim = desc.cols();
        let total = desc.rows() as f32;
        let mut hash = vec![0.0f32; basis.num_proj() * dim];
        for (i, proj) in basis.vectors().iter().enumerate() {
            for n in 0..dim {
                let mut sum = 0.0f32;
                for (m, &row) in used.iter().enumerate() {
                    let projected = proj[m] * desc.get(row, n);
                    sum += (projected + 1.0) / 2.0;
                }
                hash[i * dim + n] = sum / total;
            }
        }
        Ok(hash)
    }

    /// Returns the number of projection vectors.
    pub fn num_proj(&self) -> usize {
        self.num_proj
    }

    /// Returns the maximum number of descriptor rows used per image.
    pub fn max_desc(&self) -> usize {
        self.max_desc
    }

    /// The seed in effect, including a time-derived one.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Euclidean distance between two hashes. Smaller is more similar; 0 means
/// identical.
pub fn try_similarity(a: &[f32], b: &[f32]) -> Result<f32, HalocError> {
    if a.len() != b.len() {
        return Err(HalocError::HashLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let sum: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum.sqrt())
}

/// Like [`try_similarity`], but logs a length mismatch and returns
/// [`INVALID_SIMILARITY`] instead of failing.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    match try_similarity(a, b) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{e}");
            INVALID_SIMILARITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(rows: usize, cols: usize, phase: f32) -> DescriptorMatrix {
        let data = (0..rows * cols)
            .map(|i| ((i as f32) * 0.37 + phase).sin())
            .collect();
        DescriptorMatrix::new(rows, cols, data).unwrap()
    }

    fn hasher(num_proj: usize, max_desc: usize, seed: u64) -> Hasher {
        Hasher::new(&HalocConfig::new(num_proj, max_desc).with_seed(seed)).unwrap()
    }

    #[test]
    fn hash_length() {
        let mut h = hasher(3, 20, 1);
        for (rows, cols) in [(1, 8), (5, 16), (20, 32), (45, 4)] {
            let hash = h.calc_hash(&descriptors(rows, cols, 0.0)).unwrap();
            assert_eq!(hash.len(), 3 * cols, "rows={rows} cols={cols}");
        }
    }

    #[test]
    fn basis_built_lazily_once() {
        let mut h = hasher(2, 10, 3);
        assert!(!h.is_initialized());
        h.calc_hash(&descriptors(4, 4, 0.0)).unwrap();
        assert!(h.is_initialized());
        let first = h.basis().unwrap().clone();
        h.calc_hash(&descriptors(30, 4, 0.5)).unwrap();
        assert_eq!(h.basis().unwrap(), &first);
    }

    #[test]
    fn empty_descriptors_rejected() {
        let mut h = hasher(2, 10, 3);
        let err = h.calc_hash(&DescriptorMatrix::default()).unwrap_err();
        assert!(matches!(err, HalocError::EmptyDescriptors));
    }

    #[test]
    fn hash_deterministic() {
        let d = descriptors(12, 8, 0.2);
        let mut h = hasher(4, 16, 42);
        let a = h.calc_hash(&d).unwrap();
        let b = h.calc_hash(&d).unwrap();
        assert_eq!(a, b);

        let mut other = hasher(4, 16, 42);
        assert_eq!(other.calc_hash(&d).unwrap(), a);
    }

    #[test]
    fn subsampling_deterministic_for_seed() {
        let d = descriptors(50, 6, 1.0);
        let mut h1 = hasher(3, 10, 9);
        let mut h2 = hasher(3, 10, 9);
        assert_eq!(h1.calc_hash(&d).unwrap(), h2.calc_hash(&d).unwrap());
        assert_eq!(h1.calc_hash(&d).unwrap(), h2.calc_hash(&d).unwrap());
    }

    #[test]
    fn hash_layout_is_row_major_per_projection() {
        // Orthonormal basis picking rows 0 and 1.
        let basis =
            ProjectionBasis::from_vectors(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap();
        let mut h = Hasher::with_basis(basis, Some(0));
        let d = DescriptorMatrix::from_rows(vec![
            vec![0.2, 0.4],
            vec![-0.6, 1.0],
            vec![0.0, 0.0],
        ])
        .unwrap();
        let hash = h.calc_hash(&d).unwrap();

        // Entry (i, n) = sum_m (p_i[m] * d[m][n] + 1) / 2, divided by 3 rows.
        let expected = [
            ((0.2 + 1.0) / 2.0 + 0.5 + 0.5) / 3.0,
            ((0.4 + 1.0) / 2.0 + 0.5 + 0.5) / 3.0,
            (0.5 + (-0.6 + 1.0) / 2.0 + 0.5) / 3.0,
            (0.5 + (1.0 + 1.0) / 2.0 + 0.5) / 3.0,
        ];
        assert_eq!(hash.len(), 4);
        for (got, want) in hash.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn subsampled_mean_uses_original_row_count() {
        let basis = ProjectionBasis::from_vectors(vec![vec![1.0, 0.0]]).unwrap();
        let mut h = Hasher::with_basis(basis, Some(1));
        // Four zero rows, only two of which are used.
        let d = DescriptorMatrix::new(4, 1, vec![0.0; 4]).unwrap();
        let hash = h.calc_hash(&d).unwrap();
        assert!((hash[0] - 0.25).abs() < 1e-6, "got {}", hash[0]);
    }

    #[test]
    fn similarity_identity() {
        let mut h = hasher(3, 20, 5);
        let hash = h.calc_hash(&descriptors(10, 16, 0.0)).unwrap();
        assert_eq!(similarity(&hash, &hash), 0.0);
    }

    #[test]
    fn similarity_symmetric() {
        let mut h = hasher(3, 20, 5);
        let a = h.calc_hash(&descriptors(10, 16, 0.0)).unwrap();
        let b = h.calc_hash(&descriptors(7, 16, 2.0)).unwrap();
        assert_eq!(similarity(&a, &b), similarity(&b, &a));
        assert!(similarity(&a, &b) > 0.0);
    }

    #[test]
    fn similarity_euclidean() {
        assert_eq!(try_similarity(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 5.0);
    }

    #[test]
    fn similarity_length_mismatch() {
        let err = try_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, HalocError::HashLengthMismatch { left: 2, right: 1 }));
        assert_eq!(err.kind(), crate::ErrorKind::Input);
        assert_eq!(similarity(&[1.0, 2.0], &[1.0]), INVALID_SIMILARITY);
    }
}
