//! Dense numeric arrays used as tree leaves.
//!
//! Row-major layout; the shape is carried alongside the flat buffer. An empty
//! shape denotes a scalar (one element).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Element type of a leaf array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    F64,
    I64,
}

/// Flat element buffer, one variant per supported dtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::F64(v) => v.len(),
            ArrayData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayData::F64(_) => Dtype::F64,
            ArrayData::I64(_) => Dtype::I64,
        }
    }
}

/// A dense n-dimensional numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl Array {
    /// Zero-filled array of the given shape and dtype.
    pub fn zeros(shape: &[usize], dtype: Dtype) -> Self {
        let n = element_count(shape);
        let data = match dtype {
            Dtype::F64 => ArrayData::F64(vec![0.0; n]),
            Dtype::I64 => ArrayData::I64(vec![0; n]),
        };
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    pub fn from_f64(shape: &[usize], values: Vec<f64>) -> Result<Self> {
        if element_count(shape) != values.len() {
            return Err(Error::Shape(format!(
                "shape {:?} wants {} elements, got {}",
                shape,
                element_count(shape),
                values.len()
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data: ArrayData::F64(values),
        })
    }

    pub fn from_i64(shape: &[usize], values: Vec<i64>) -> Result<Self> {
        if element_count(shape) != values.len() {
            return Err(Error::Shape(format!(
                "shape {:?} wants {} elements, got {}",
                shape,
                element_count(shape),
                values.len()
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data: ArrayData::I64(values),
        })
    }

    /// Scalar (rank-0) array holding one f64.
    pub fn scalar_f64(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: ArrayData::F64(vec![value]),
        }
    }

    /// Scalar (rank-0) array holding one i64.
    pub fn scalar_i64(value: i64) -> Self {
        Self {
            shape: Vec::new(),
            data: ArrayData::I64(vec![value]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        element_count(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` into position `index` along this array's leading axis.
    ///
    /// Requires `self.shape == (n,) + src.shape` with `index < n` and matching
    /// dtypes.
    pub fn write_slice(&mut self, index: usize, src: &Array) -> Result<()> {
        let Some((&runs, inner)) = self.shape.split_first() else {
            return Err(Error::Shape("cannot slice a scalar along axis 0".into()));
        };
        if inner != src.shape() {
            return Err(Error::Shape(format!(
                "slice shape {:?} does not match target inner shape {:?}",
                src.shape(),
                inner
            )));
        }
        if index >= runs {
            return Err(Error::Shape(format!(
                "slice index {} out of range for leading axis {}",
                index, runs
            )));
        }
        let n = src.len();
        let start = index * n;
        match (&mut self.data, src.data()) {
            (ArrayData::F64(dst), ArrayData::F64(s)) => dst[start..start + n].copy_from_slice(s),
            (ArrayData::I64(dst), ArrayData::I64(s)) => dst[start..start + n].copy_from_slice(s),
            _ => {
                return Err(Error::Shape(format!(
                    "dtype mismatch: {:?} vs {:?}",
                    self.data.dtype(),
                    src.dtype()
                )))
            }
        }
        Ok(())
    }

    /// Extract the `index`-th slice along the leading axis.
    pub fn slice_axis0(&self, index: usize) -> Result<Array> {
        let Some((&runs, inner)) = self.shape.split_first() else {
            return Err(Error::Shape("cannot slice a scalar along axis 0".into()));
        };
        if index >= runs {
            return Err(Error::Shape(format!(
                "slice index {} out of range for leading axis {}",
                index, runs
            )));
        }
        let n = element_count(inner);
        let start = index * n;
        let data = match &self.data {
            ArrayData::F64(v) => ArrayData::F64(v[start..start + n].to_vec()),
            ArrayData::I64(v) => ArrayData::I64(v[start..start + n].to_vec()),
        };
        Ok(Array {
            shape: inner.to_vec(),
            data,
        })
    }
}
