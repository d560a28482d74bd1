#![deny(missing_docs)]

//! Command-line entry for the weather image classifier.
//!
//! Loads the model once at startup, then reports readiness or classifies
//! image files, printing structured JSON either way.

use std::path::PathBuf;

use skylens::config::AppSettings;
use skylens::logging;
use skylens::service::PredictionService;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let options = parse_args(std::env::args().skip(1).collect())?;

    let settings = AppSettings::load_or_default().map_err(|err| err.to_string())?;
    let locations = match &options.model_dir {
        Some(dir) => settings.locations_in(dir),
        None => settings.model_locations().map_err(|err| err.to_string())?,
    };

    let service = PredictionService::startup(&locations);

    if options.status || options.images.is_empty() {
        let readiness = service.readiness();
        let payload = serde_json::to_string_pretty(&readiness).map_err(|err| err.to_string())?;
        println!("{payload}");
        return Ok(());
    }

    for path in &options.images {
        let bytes =
            std::fs::read(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
        let prediction = service
            .predict(&bytes)
            .map_err(|err| format!("{}: {err}", path.display()))?;
        let payload =
            serde_json::to_string_pretty(&prediction).map_err(|err| err.to_string())?;
        println!("{payload}");
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_dir: Option<PathBuf>,
    status: bool,
    images: Vec<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model_dir: Option<PathBuf> = None;
    let mut status = false;
    let mut images = Vec::new();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--status" => status = true,
            "--model-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-dir requires a value".to_string())?;
                model_dir = Some(PathBuf::from(value));
            }
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            image => images.push(PathBuf::from(image)),
        }
        idx += 1;
    }

    Ok(CliOptions {
        model_dir,
        status,
        images,
    })
}

fn help_text() -> String {
    [
        "skylens",
        "",
        "Classifies weather conditions in image files using the trained model.",
        "With no images (or with --status) prints the readiness report instead.",
        "",
        "Usage:",
        "  skylens [--model-dir <dir>] [--status] [image ...]",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_image_paths() {
        let options = parse_args(vec![
            "--model-dir".to_string(),
            "/srv/models".to_string(),
            "storm.jpg".to_string(),
        ])
        .expect("parse args");
        assert_eq!(options.model_dir, Some(PathBuf::from("/srv/models")));
        assert!(!options.status);
        assert_eq!(options.images, vec![PathBuf::from("storm.jpg")]);
    }

    #[test]
    fn status_flag_is_recognized() {
        let options = parse_args(vec!["--status".to_string()]).expect("parse args");
        assert!(options.status);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = parse_args(vec!["--frobnicate".to_string()]).unwrap_err();
        assert!(err.contains("Unknown argument"));
    }

    #[test]
    fn model_dir_requires_a_value() {
        let err = parse_args(vec!["--model-dir".to_string()]).unwrap_err();
        assert!(err.contains("requires a value"));
    }
}
