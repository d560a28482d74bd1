//! Network topology description for the trained classifier.
//!
//! The topology is rebuilt from code and must match the shapes the model was
//! trained with; the weight stores carry parameters only (or, for the full
//! model file, embed a serialized [`Architecture`] of their own).

use serde::{Deserialize, Serialize};

/// Input shape (height, width, channels) the serving pipeline feeds the model.
pub const INPUT_SHAPE: [usize; 3] = [128, 128, 3];

/// Side length of the square convolution kernels used throughout.
pub const CONV_KERNEL: usize = 3;

/// One block of the layer stack, carrying its shape-relevant hyperparameters.
///
/// Dropout is inert at inference time but remains part of the topology
/// description so serialized architectures round-trip faithfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LayerSpec {
    /// Same-padding convolution with relu, batch norm, 2x2 max pool, dropout.
    ConvBlock {
        /// Output channel count.
        filters: usize,
        /// Square kernel side length.
        kernel: usize,
        /// Dropout rate applied after pooling during training.
        dropout: f32,
    },
    /// Fully-connected layer with relu, batch norm, dropout.
    DenseBlock {
        /// Output width.
        units: usize,
        /// Dropout rate applied during training.
        dropout: f32,
    },
    /// Final fully-connected layer; its scores are normalized with softmax.
    Output {
        /// Number of classes scored.
        classes: usize,
    },
}

/// Ordered layer stack plus the input shape it expects. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    /// Expected input shape as (height, width, channels).
    pub input_shape: [usize; 3],
    /// Layers in forward order.
    pub layers: Vec<LayerSpec>,
}

/// Expected shape for one parameter tensor, with a label for error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    /// Position-derived name such as `conv1_kernel` or `dense2_gamma`.
    pub label: String,
    /// Expected tensor shape.
    pub shape: Vec<usize>,
}

impl Architecture {
    /// Build the fixed classifier topology used at training time.
    ///
    /// Four conv blocks with increasing channel depth, two dense blocks,
    /// then the softmax output layer. Deterministic and infallible for
    /// valid dimensions.
    pub fn classifier(input_shape: [usize; 3], num_classes: usize) -> Self {
        let layers = vec![
            LayerSpec::ConvBlock {
                filters: 32,
                kernel: CONV_KERNEL,
                dropout: 0.25,
            },
            LayerSpec::ConvBlock {
                filters: 64,
                kernel: CONV_KERNEL,
                dropout: 0.25,
            },
            LayerSpec::ConvBlock {
                filters: 128,
                kernel: CONV_KERNEL,
                dropout: 0.30,
            },
            LayerSpec::ConvBlock {
                filters: 256,
                kernel: CONV_KERNEL,
                dropout: 0.35,
            },
            LayerSpec::DenseBlock {
                units: 512,
                dropout: 0.5,
            },
            LayerSpec::DenseBlock {
                units: 256,
                dropout: 0.5,
            },
            LayerSpec::Output {
                classes: num_classes,
            },
        ];
        Self {
            input_shape,
            layers,
        }
    }

    /// Number of classes scored by the output layer, or 0 if there is none.
    pub fn num_classes(&self) -> usize {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| match layer {
                LayerSpec::Output { classes } => Some(*classes),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Expected parameter tensors, in assignment order.
    ///
    /// Per conv block: kernel, bias, then the four batch-norm vectors
    /// (gamma, beta, moving mean, moving variance). Per dense block: kernel,
    /// bias and the same four vectors. The output layer has kernel and bias
    /// only. The walk tracks the feature shape through pooling and flatten.
    pub fn expected_tensors(&self) -> Vec<TensorSpec> {
        let [mut height, mut width, mut channels] = self.input_shape;
        let mut fan_in: Option<usize> = None;
        let mut specs = Vec::new();
        let mut conv_index = 0usize;
        let mut dense_index = 0usize;
        for layer in &self.layers {
            match layer {
                LayerSpec::ConvBlock {
                    filters, kernel, ..
                } => {
                    conv_index += 1;
                    let name = format!("conv{conv_index}");
                    specs.push(TensorSpec {
                        label: format!("{name}_kernel"),
                        shape: vec![*kernel, *kernel, channels, *filters],
                    });
                    specs.push(TensorSpec {
                        label: format!("{name}_bias"),
                        shape: vec![*filters],
                    });
                    push_norm_specs(&mut specs, &name, *filters);
                    channels = *filters;
                    height /= 2;
                    width /= 2;
                }
                LayerSpec::DenseBlock { units, .. } => {
                    dense_index += 1;
                    let name = format!("dense{dense_index}");
                    let input = fan_in.unwrap_or(height * width * channels);
                    specs.push(TensorSpec {
                        label: format!("{name}_kernel"),
                        shape: vec![input, *units],
                    });
                    specs.push(TensorSpec {
                        label: format!("{name}_bias"),
                        shape: vec![*units],
                    });
                    push_norm_specs(&mut specs, &name, *units);
                    fan_in = Some(*units);
                }
                LayerSpec::Output { classes } => {
                    let input = fan_in.unwrap_or(height * width * channels);
                    specs.push(TensorSpec {
                        label: "output_kernel".to_string(),
                        shape: vec![input, *classes],
                    });
                    specs.push(TensorSpec {
                        label: "output_bias".to_string(),
                        shape: vec![*classes],
                    });
                    fan_in = Some(*classes);
                }
            }
        }
        specs
    }

    /// Total number of parameter tensors the architecture expects.
    pub fn tensor_count(&self) -> usize {
        self.expected_tensors().len()
    }
}

fn push_norm_specs(specs: &mut Vec<TensorSpec>, name: &str, width: usize) {
    for field in ["gamma", "beta", "moving_mean", "moving_variance"] {
        specs.push(TensorSpec {
            label: format!("{name}_{field}"),
            shape: vec![width],
        });
    }
}
