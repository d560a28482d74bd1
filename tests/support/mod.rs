//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use skylens::classes::WeatherClass;
use skylens::model::{
    Architecture, FullModelFile, LayerSpec, WeightTensor, FULL_MODEL_SCHEMA_VERSION, INPUT_SHAPE,
};

/// Zero-filled tensors for `arch`, keyed in the `w_<ordinal>` archive style.
pub fn archive_tensors(arch: &Architecture) -> Vec<WeightTensor> {
    arch.expected_tensors()
        .into_iter()
        .enumerate()
        .map(|(index, spec)| WeightTensor::zeros(format!("w_{index}"), spec.shape))
        .collect()
}

/// Write a complete, valid weight archive for the production topology.
pub fn write_production_archive(path: &Path) {
    let arch = Architecture::classifier(INPUT_SHAPE, WeatherClass::ALL.len());
    let tensors = archive_tensors(&arch);
    skylens::model::write_weight_archive(path, &tensors).expect("write weight archive");
}

/// Serving class labels in fixed order.
pub fn serving_classes() -> Vec<String> {
    WeatherClass::ALL
        .iter()
        .map(|class| class.label().to_string())
        .collect()
}

/// A minimal valid full model file: softmax regression straight off the
/// flattened input, proving the artifact supplies its own topology.
pub fn minimal_full_model() -> FullModelFile {
    let architecture = Architecture {
        input_shape: INPUT_SHAPE,
        layers: vec![LayerSpec::Output {
            classes: WeatherClass::ALL.len(),
        }],
    };
    let tensors = architecture
        .expected_tensors()
        .into_iter()
        .map(|spec| WeightTensor::zeros(spec.label, spec.shape))
        .collect();
    FullModelFile {
        schema_version: FULL_MODEL_SCHEMA_VERSION,
        architecture,
        classes: serving_classes(),
        tensors,
    }
}

/// Encode a uniform grayscale PNG entirely in memory.
pub fn gray_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(width, height, image::Luma([value]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode fixture png");
    bytes
}
