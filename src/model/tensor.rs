//! Named, shaped parameter tensors.

use serde::{Deserialize, Serialize};

/// A named numeric array of trained parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTensor {
    /// Key the tensor was stored under.
    pub name: String,
    /// Shape in row-major (C) order.
    pub shape: Vec<usize>,
    /// Flat values, little-endian f32 on disk.
    pub data: Vec<f32>,
}

impl WeightTensor {
    /// Build a tensor from parts.
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            shape,
            data,
        }
    }

    /// Zero-filled tensor of the given shape.
    pub fn zeros(name: impl Into<String>, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            name: name.into(),
            shape,
            data: vec![0.0; len],
        }
    }

    /// Number of elements the shape implies.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}
