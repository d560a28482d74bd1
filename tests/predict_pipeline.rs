//! End-to-end prediction pipeline: weight store on disk to ranked result.

mod support;

use skylens::imagery;
use skylens::model::{self, ModelLocations};
use skylens::service::{FormatOnDisk, PredictError, PredictionService};
use tempfile::tempdir;

fn locations_in(dir: &std::path::Path) -> ModelLocations {
    ModelLocations {
        weight_archive: dir.join("exported_model").join("model_weights.npz"),
        full_model: dir.join("best_model.json"),
    }
}

#[test]
fn archive_backed_service_classifies_an_upload() {
    let dir = tempdir().expect("tempdir");
    let locations = locations_in(dir.path());
    std::fs::create_dir_all(dir.path().join("exported_model")).expect("create model dir");
    support::write_production_archive(&locations.weight_archive);

    let service = PredictionService::startup(&locations);
    let readiness = service.readiness();
    assert!(readiness.service_healthy);
    assert!(readiness.model_loaded);
    assert_eq!(readiness.format_on_disk, FormatOnDisk::Archive);

    let prediction = service
        .predict(&support::gray_png(50, 200, 127))
        .expect("predict");
    // Zero weights give a uniform distribution, so the tie resolves to the
    // lowest class index.
    assert_eq!(prediction.predicted_class, "hail");
    assert!((prediction.confidence - 20.0).abs() < 1e-2);
    assert_eq!(prediction.distribution.len(), 5);
    let total: f32 = prediction
        .distribution
        .iter()
        .map(|score| score.percent)
        .sum();
    assert!((total - 100.0).abs() < 1e-2);

    let tensor = imagery::normalize(&support::gray_png(64, 64, 10)).expect("normalize");
    let probabilities = service.infer(&tensor).expect("infer");
    assert_eq!(probabilities.len(), 5);
    let sum: f32 = probabilities.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
}

#[test]
fn degraded_service_answers_readiness_but_not_predictions() {
    let dir = tempdir().expect("tempdir");
    let service = PredictionService::startup(&locations_in(dir.path()));

    let readiness = service.readiness();
    assert!(readiness.service_healthy);
    assert!(!readiness.model_loaded);
    assert_eq!(readiness.format_on_disk, FormatOnDisk::None);

    let err = service
        .predict(&support::gray_png(32, 32, 0))
        .unwrap_err();
    assert!(matches!(err, PredictError::ModelUnavailable));
}

#[test]
fn bad_upload_fails_without_disturbing_the_loaded_model() {
    let dir = tempdir().expect("tempdir");
    let locations = locations_in(dir.path());
    support::minimal_full_model()
        .save(&locations.full_model)
        .expect("write full model");

    let service = PredictionService::startup(&locations);
    assert_eq!(service.readiness().format_on_disk, FormatOnDisk::FullFile);

    let err = service.predict(b"not an image at all").unwrap_err();
    assert!(matches!(err, PredictError::ImageDecode(_)));

    // The failed request left the state intact; a valid upload still works.
    let prediction = service
        .predict(&support::gray_png(40, 40, 200))
        .expect("predict after failure");
    assert_eq!(prediction.distribution.len(), 5);
}

#[test]
fn full_file_backed_service_reports_its_source() {
    let dir = tempdir().expect("tempdir");
    let locations = locations_in(dir.path());
    support::minimal_full_model()
        .save(&locations.full_model)
        .expect("write full model");

    let state = model::load(&locations);
    assert_eq!(state.source(), Some(model::ModelSource::FullFile));
    let service = PredictionService::from_state(state, locations);
    assert!(service.readiness().model_loaded);
    assert_eq!(
        service.model_source(),
        Some(model::ModelSource::FullFile)
    );
}
