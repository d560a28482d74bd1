//! Populated network and the CPU forward pass.
//!
//! Layout is NHWC throughout: the serving input is `(1, height, width, 3)`
//! and feature maps are `(height, width, channels)`. Dropout layers are
//! inert at inference and carry no parameters, so they do not appear here.

use ndarray::{Array1, Array2, Array3, Array4, Axis};

use super::arch::{Architecture, LayerSpec};
use super::errors::ModelError;
use super::tensor::WeightTensor;

/// Epsilon the batch-norm layers were trained with.
const BATCH_NORM_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone)]
struct BatchNorm {
    gamma: Array1<f32>,
    beta: Array1<f32>,
    mean: Array1<f32>,
    variance: Array1<f32>,
}

impl BatchNorm {
    fn apply(&self, channel: usize, value: f32) -> f32 {
        let scale = (self.variance[channel] + BATCH_NORM_EPSILON).sqrt();
        (value - self.mean[channel]) / scale * self.gamma[channel] + self.beta[channel]
    }
}

#[derive(Debug, Clone)]
struct ConvLayer {
    kernel: Array4<f32>,
    bias: Array1<f32>,
    norm: BatchNorm,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weight: Array2<f32>,
    bias: Array1<f32>,
    relu: bool,
    norm: Option<BatchNorm>,
}

/// Inference-ready network with all parameters assigned.
///
/// Construction is all-or-nothing: [`Network::from_tensors`] rejects the
/// whole batch on any count or shape disagreement, so a value of this type
/// always carries a complete parameter set. `forward` takes `&self` and
/// allocates its own scratch, so concurrent forward passes are safe.
#[derive(Debug, Clone)]
pub struct Network {
    input_shape: [usize; 3],
    conv: Vec<ConvLayer>,
    dense: Vec<DenseLayer>,
}

impl Network {
    /// Assign `tensors` into `architecture` as a single atomic batch.
    ///
    /// Tensors must arrive in the architecture's expected order (the weight
    /// archive sorts by key ordinal before calling this). Any mismatch in
    /// count, declared shape, or element length rejects the entire batch.
    pub fn from_tensors(
        architecture: &Architecture,
        tensors: Vec<WeightTensor>,
    ) -> Result<Self, ModelError> {
        let expected = architecture.expected_tensors();
        if tensors.len() != expected.len() {
            return Err(ModelError::FormatMismatch {
                detail: format!(
                    "expected {} weight tensors, found {}",
                    expected.len(),
                    tensors.len()
                ),
            });
        }
        for (tensor, spec) in tensors.iter().zip(&expected) {
            if tensor.data.len() != tensor.element_count() {
                return Err(ModelError::FormatMismatch {
                    detail: format!(
                        "tensor '{}' carries {} values for shape {:?}",
                        tensor.name,
                        tensor.data.len(),
                        tensor.shape
                    ),
                });
            }
            if tensor.shape != spec.shape {
                return Err(ModelError::FormatMismatch {
                    detail: format!(
                        "tensor '{}' has shape {:?}, expected {:?} for {}",
                        tensor.name, tensor.shape, spec.shape, spec.label
                    ),
                });
            }
        }

        let mut stream = tensors.into_iter();
        let mut conv = Vec::new();
        let mut dense = Vec::new();
        for layer in &architecture.layers {
            match layer {
                LayerSpec::ConvBlock { .. } => {
                    let kernel = take_array4(&mut stream)?;
                    let bias = take_array1(&mut stream)?;
                    let norm = take_norm(&mut stream)?;
                    conv.push(ConvLayer { kernel, bias, norm });
                }
                LayerSpec::DenseBlock { .. } => {
                    let weight = take_array2(&mut stream)?;
                    let bias = take_array1(&mut stream)?;
                    let norm = take_norm(&mut stream)?;
                    dense.push(DenseLayer {
                        weight,
                        bias,
                        relu: true,
                        norm: Some(norm),
                    });
                }
                LayerSpec::Output { .. } => {
                    let weight = take_array2(&mut stream)?;
                    let bias = take_array1(&mut stream)?;
                    dense.push(DenseLayer {
                        weight,
                        bias,
                        relu: false,
                        norm: None,
                    });
                }
            }
        }
        Ok(Self {
            input_shape: architecture.input_shape,
            conv,
            dense,
        })
    }

    /// Input shape (height, width, channels) the network expects.
    pub fn input_shape(&self) -> [usize; 3] {
        self.input_shape
    }

    /// Run a forward pass over a single `(1, height, width, channels)` input.
    ///
    /// Returns the softmax probability vector produced by the final layer.
    pub fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError> {
        let [height, width, channels] = self.input_shape;
        if input.dim() != (1, height, width, channels) {
            return Err(ModelError::FormatMismatch {
                detail: format!(
                    "input tensor has shape {:?}, expected (1, {height}, {width}, {channels})",
                    input.dim()
                ),
            });
        }
        let mut features = input.index_axis(Axis(0), 0).to_owned();
        for layer in &self.conv {
            features = conv_relu(&features, &layer.kernel, &layer.bias);
            apply_norm_channels(&mut features, &layer.norm);
            features = max_pool(&features);
        }
        // Row-major (height, width, channel) flatten, matching training.
        let mut vector: Vec<f32> = features.iter().copied().collect();
        for layer in &self.dense {
            vector = dense_forward(&vector, layer)?;
        }
        Ok(softmax(&vector))
    }
}

fn take_next(
    stream: &mut impl Iterator<Item = WeightTensor>,
) -> Result<WeightTensor, ModelError> {
    stream.next().ok_or_else(|| ModelError::FormatMismatch {
        detail: "weight tensor stream ended early".to_string(),
    })
}

fn take_array1(
    stream: &mut impl Iterator<Item = WeightTensor>,
) -> Result<Array1<f32>, ModelError> {
    let tensor = take_next(stream)?;
    match tensor.shape.as_slice() {
        [_] => Ok(Array1::from_vec(tensor.data)),
        other => Err(rank_error(&tensor.name, other, 1)),
    }
}

fn take_array2(
    stream: &mut impl Iterator<Item = WeightTensor>,
) -> Result<Array2<f32>, ModelError> {
    let tensor = take_next(stream)?;
    let dims = match tensor.shape.as_slice() {
        [a, b] => (*a, *b),
        other => return Err(rank_error(&tensor.name, other, 2)),
    };
    Array2::from_shape_vec(dims, tensor.data).map_err(|err| ModelError::FormatMismatch {
        detail: format!("tensor '{}': {err}", tensor.name),
    })
}

fn take_array4(
    stream: &mut impl Iterator<Item = WeightTensor>,
) -> Result<Array4<f32>, ModelError> {
    let tensor = take_next(stream)?;
    let dims = match tensor.shape.as_slice() {
        [a, b, c, d] => (*a, *b, *c, *d),
        other => return Err(rank_error(&tensor.name, other, 4)),
    };
    Array4::from_shape_vec(dims, tensor.data).map_err(|err| ModelError::FormatMismatch {
        detail: format!("tensor '{}': {err}", tensor.name),
    })
}

fn take_norm(
    stream: &mut impl Iterator<Item = WeightTensor>,
) -> Result<BatchNorm, ModelError> {
    Ok(BatchNorm {
        gamma: take_array1(stream)?,
        beta: take_array1(stream)?,
        mean: take_array1(stream)?,
        variance: take_array1(stream)?,
    })
}

fn rank_error(name: &str, shape: &[usize], expected: usize) -> ModelError {
    ModelError::FormatMismatch {
        detail: format!("tensor '{name}' has shape {shape:?}, expected rank {expected}"),
    }
}

/// Same-padding convolution followed by relu.
fn conv_relu(input: &Array3<f32>, kernel: &Array4<f32>, bias: &Array1<f32>) -> Array3<f32> {
    let (height, width, in_channels) = input.dim();
    let (kernel_h, kernel_w, _, out_channels) = kernel.dim();
    let pad_y = kernel_h / 2;
    let pad_x = kernel_w / 2;
    let mut out = Array3::zeros((height, width, out_channels));
    for y in 0..height {
        for x in 0..width {
            for co in 0..out_channels {
                let mut acc = bias[co];
                for ky in 0..kernel_h {
                    let Some(iy) = (y + ky).checked_sub(pad_y) else {
                        continue;
                    };
                    if iy >= height {
                        continue;
                    }
                    for kx in 0..kernel_w {
                        let Some(ix) = (x + kx).checked_sub(pad_x) else {
                            continue;
                        };
                        if ix >= width {
                            continue;
                        }
                        for ci in 0..in_channels {
                            acc += input[[iy, ix, ci]] * kernel[[ky, kx, ci, co]];
                        }
                    }
                }
                out[[y, x, co]] = acc.max(0.0);
            }
        }
    }
    out
}

fn apply_norm_channels(features: &mut Array3<f32>, norm: &BatchNorm) {
    let (height, width, channels) = features.dim();
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                features[[y, x, c]] = norm.apply(c, features[[y, x, c]]);
            }
        }
    }
}

/// 2x2 max pool with stride 2; odd trailing rows and columns are dropped.
fn max_pool(input: &Array3<f32>) -> Array3<f32> {
    let (height, width, channels) = input.dim();
    let (out_h, out_w) = (height / 2, width / 2);
    let mut out = Array3::zeros((out_h, out_w, channels));
    for y in 0..out_h {
        for x in 0..out_w {
            for c in 0..channels {
                let mut best = f32::NEG_INFINITY;
                for dy in 0..2 {
                    for dx in 0..2 {
                        best = best.max(input[[y * 2 + dy, x * 2 + dx, c]]);
                    }
                }
                out[[y, x, c]] = best;
            }
        }
    }
    out
}

fn dense_forward(input: &[f32], layer: &DenseLayer) -> Result<Vec<f32>, ModelError> {
    let (fan_in, units) = layer.weight.dim();
    if input.len() != fan_in {
        return Err(ModelError::FormatMismatch {
            detail: format!(
                "dense layer expects {fan_in} inputs, got {}",
                input.len()
            ),
        });
    }
    let mut out = vec![0.0f32; units];
    for (j, slot) in out.iter_mut().enumerate() {
        let mut acc = layer.bias[j];
        for (i, &value) in input.iter().enumerate() {
            acc += value * layer.weight[[i, j]];
        }
        *slot = acc;
    }
    if layer.relu {
        for value in &mut out {
            *value = value.max(0.0);
        }
    }
    if let Some(norm) = &layer.norm {
        for (j, value) in out.iter_mut().enumerate() {
            *value = norm.apply(j, *value);
        }
    }
    Ok(out)
}

/// Compute a numerically-stable softmax for a set of logits.
pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut exps = Vec::with_capacity(raw.len());
    let mut sum = 0.0f32;
    for &value in raw {
        let e = (value - max).exp();
        exps.push(e);
        sum += e;
    }
    if sum <= 0.0 {
        let uniform = 1.0 / raw.len() as f32;
        return vec![uniform; raw.len()];
    }
    for value in &mut exps {
        *value /= sum;
    }
    exps
}
