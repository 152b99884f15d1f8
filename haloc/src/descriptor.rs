use serde::{Deserialize, Serialize};

use crate::HalocError;

/// Local feature descriptors of one image, one row per keypoint.
///
/// Stored row-major. Every row has the same length (the descriptor
/// dimensionality `D`); the row count varies per image.
///
/// Hashing assumes element values lie roughly in `[-1, 1]`. Extractors
/// producing unnormalized values (e.g. raw SIFT bins in `[0, 255]`) must be
/// normalized by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f32>>", into = "Vec<Vec<f32>>")]
pub struct DescriptorMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl DescriptorMatrix {
    /// Creates a matrix from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, HalocError> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            HalocError::InvalidDescriptors(format!("{rows}x{cols} matrix size overflows"))
        })?;
        if expected != data.len() {
            return Err(HalocError::InvalidDescriptors(format!(
                "{rows}x{cols} matrix needs {expected} values, got {}",
                data.len()
            )));
        }
        if rows > 0 && cols == 0 {
            return Err(HalocError::InvalidDescriptors("rows have zero length".into()));
        }
        Ok(Self { rows, cols, data })
    }

    /// Creates a matrix from individual rows. All rows must share a length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, HalocError> {
        let cols = rows.first().map_or(0, Vec::len);
        let n = rows.len();
        let mut data = Vec::with_capacity(n.saturating_mul(cols));
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(HalocError::InvalidDescriptors(format!(
                    "row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Self::new(n, cols, data)
    }

    /// Number of descriptors.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Descriptor dimensionality.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns true when the matrix holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns descriptor `i`. Panics if `i` is out of range.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Returns element `col` of descriptor `row`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    /// Returns the row-major backing data.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl TryFrom<Vec<Vec<f32>>> for DescriptorMatrix {
    type Error = HalocError;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<DescriptorMatrix> for Vec<Vec<f32>> {
    fn from(m: DescriptorMatrix) -> Self {
        if m.cols == 0 {
            return Vec::new();
        }
        m.data.chunks(m.cols).map(<[f32]>::to_vec).collect()
    }
}
