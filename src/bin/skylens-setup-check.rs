//! Standalone setup verification for the classifier service.
//!
//! Reports whether the app directories, configuration and model artifacts
//! are in place, then attempts an actual model load. Exits non-zero when no
//! model is usable so provisioning scripts can gate on it.

use skylens::config::{AppSettings, CONFIG_FILE_NAME};
use skylens::model::{self, ModelState};
use skylens::{app_dirs, service};

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool, String> {
    println!("skylens setup check");
    println!();

    let root = app_dirs::app_root_dir().map_err(|err| err.to_string())?;
    println!("ok      app directory {}", root.display());

    let config_path = root.join(CONFIG_FILE_NAME);
    let settings = AppSettings::load_from(&config_path).map_err(|err| err.to_string())?;
    if config_path.exists() {
        println!("ok      config {}", config_path.display());
    } else {
        println!("default config (no {} present)", config_path.display());
    }

    let locations = settings.model_locations().map_err(|err| err.to_string())?;
    report_artifact("weight archive", locations.weight_archive.exists());
    report_artifact("full model file", locations.full_model.exists());

    println!();
    let state = model::load(&locations);
    let usable = match &state {
        ModelState::Loaded(model) => {
            println!("ok      model loads from {}", model.source.as_str());
            true
        }
        ModelState::Unavailable(attempts) => {
            for attempt in attempts {
                println!(
                    "failed  {} at {}: {}",
                    attempt.source.as_str(),
                    attempt.path.display(),
                    attempt.error
                );
            }
            println!();
            println!("No usable model. Provide one of:");
            println!("  - {}", locations.weight_archive.display());
            println!("  - {}", locations.full_model.display());
            false
        }
    };

    let service = service::PredictionService::from_state(state, locations);
    let readiness = service.readiness();
    let payload = serde_json::to_string(&readiness).map_err(|err| err.to_string())?;
    println!();
    println!("readiness: {payload}");
    Ok(usable)
}

fn report_artifact(label: &str, present: bool) {
    if present {
        println!("ok      {label} present");
    } else {
        println!("missing {label}");
    }
}
