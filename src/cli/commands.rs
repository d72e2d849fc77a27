//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use walkdir::WalkDir;

use super::ProcessArgs;
use crate::config::{EngineConfig, DEFAULT_MODEL_FILE_NAME};
use crate::engine::{export_mono, import_mono, BitDepth, Controls, MonoAudio, NeuralProcessor};
use crate::error::{LoadError, NeuralFxError};
use crate::neural::{ModelDescriptor, ModelDocument, Network};

/// Render a WAV file through the processor.
pub fn process(args: &ProcessArgs) -> Result<()> {
    info!(
        "Processing {} -> {} with bundle {}",
        args.input.display(),
        args.output.display(),
        args.bundle.display()
    );

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let depth = BitDepth::from_bits(args.bit_depth)?;

    let audio = import_mono(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let controls = Controls {
        param1: args.param1,
        param2: args.param2,
        master: args.master,
        bypass: args.bypass,
    };
    let rendered = render_file(
        &audio,
        &args.bundle,
        config,
        controls,
        args.block_size,
        args.allow_unloaded,
    )?;

    export_mono(&rendered, &args.output, depth)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Rendered: {}", args.output.display());
    println!(
        "  {} samples @ {} Hz ({:.2}s), peak {:.3}",
        rendered.len(),
        rendered.sample_rate,
        rendered.duration_secs(),
        rendered.peak()
    );

    Ok(())
}

/// Run `audio` through a processor built from `bundle`.
pub fn render_file(
    audio: &MonoAudio,
    bundle: &Path,
    config: EngineConfig,
    controls: Controls,
    block_size: usize,
    allow_unloaded: bool,
) -> Result<MonoAudio> {
    let mut processor = NeuralProcessor::with_config(audio.sample_rate as f64, bundle, config);

    if !processor.is_model_loaded() && !allow_unloaded {
        let err = match processor.into_load_error() {
            Some(reason) => anyhow::Error::new(NeuralFxError::from(reason)),
            None => anyhow!("no model loaded"),
        };
        return Err(err.context(format!("Model in {} failed to load", bundle.display())));
    }
    if let Some(reason) = processor.load_error() {
        warn!("Rendering without a model: {}", reason);
    }

    info!(
        "Rendering {} samples at {} Hz in blocks of {} ({} pre-roll samples)",
        audio.len(),
        processor.sample_rate(),
        block_size,
        processor.config().preroll_samples
    );

    let samples = processor.render(&audio.samples, block_size, controls);
    processor.shutdown();

    Ok(MonoAudio::new(samples, audio.sample_rate))
}

/// Print the descriptor of a model document.
pub fn inspect(path: &Path) -> Result<()> {
    let path = resolve_model_path(path);
    let descriptor = ModelDescriptor::load(&path)
        .with_context(|| format!("Invalid model document {}", path.display()))?;

    println!("Model: {}", descriptor.path().display());
    println!("{:-<60}", "");
    println!("Layers:       {}", descriptor.layer_count());
    println!("Inputs:       {}", descriptor.input_arity());
    println!("Hidden size:  {}", descriptor.hidden_size());
    println!("Input skip:   {}", u8::from(descriptor.skip_enabled()));
    println!("Last layer:   {}", descriptor.last_layer_type());
    println!("SHA-256:      {}", descriptor.checksum());

    let document = ModelDocument::from_path(&path)?;
    match Network::from_document(&document) {
        Ok(network) => println!("Runnable:     yes ({} outputs)", network.out_size()),
        Err(e) => println!("Runnable:     no ({})", e),
    }

    Ok(())
}

/// Outcome of checking one document during a scan
#[derive(Debug)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub result: std::result::Result<ModelDescriptor, LoadError>,
}

/// Check every `.json` file under `dir`.
pub fn scan_models(dir: &Path, max_depth: usize) -> Vec<ScanEntry> {
    WalkDir::new(dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
        .map(|entry| {
            let path = entry.into_path();
            debug!("Checking {}", path.display());
            let result = ModelDocument::from_path(&path).and_then(|doc| {
                let descriptor = ModelDescriptor::from_document(&doc)?;
                Network::from_document(&doc)?;
                Ok(descriptor)
            });
            ScanEntry { path, result }
        })
        .collect()
}

/// Report every model document under `dir`.
pub fn scan(dir: &Path, max_depth: usize) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    info!("Scanning {} for model documents", dir.display());

    let entries = scan_models(dir, max_depth);
    if entries.is_empty() {
        println!("No model documents found.");
        return Ok(());
    }

    let mut valid = 0;
    for entry in &entries {
        match &entry.result {
            Ok(descriptor) => {
                valid += 1;
                println!(
                    "OK    {} ({} layers, {} inputs, skip {})",
                    entry.path.display(),
                    descriptor.layer_count(),
                    descriptor.input_arity(),
                    u8::from(descriptor.skip_enabled())
                );
            }
            Err(e) => println!("FAIL  {} [{}] {}", entry.path.display(), e.error_code(), e),
        }
    }

    println!("{:-<60}", "");
    println!("{} of {} documents valid", valid, entries.len());

    Ok(())
}

/// Suggestions for the first recoverable neuralfx error in `err`'s chain.
pub fn recovery_hints(err: &anyhow::Error) -> Vec<&'static str> {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<NeuralFxError>() {
            if e.is_recoverable() {
                return e.recovery_suggestions();
            }
            return Vec::new();
        }
        if let Some(e) = cause.downcast_ref::<LoadError>() {
            return e.recovery_suggestions();
        }
    }
    Vec::new()
}

/// A directory stands for the model document inside it
fn resolve_model_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_MODEL_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MONO_DENSE: &str = r#"{
        "in_shape": [null, null, 1],
        "in_skip": 0,
        "layers": [
            { "type": "dense", "activation": "", "shape": [null, null, 1],
              "weights": [[[0.5]], [0.0]] }
        ]
    }"#;

    #[test]
    fn test_scan_reports_valid_and_invalid() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a_good.json"), MONO_DENSE).unwrap();
        fs::write(dir.path().join("b_bad.json"), r#"{ "in_shape": [4], "layers": [] }"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let entries = scan_models(dir.path(), 2);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].result.is_ok());
        assert!(entries[1].result.is_err());
    }

    #[test]
    fn test_resolve_model_path() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_model_path(dir.path()), dir.path().join("model.json"));

        let file = dir.path().join("amp.json");
        assert_eq!(resolve_model_path(&file), file);
    }

    #[test]
    fn test_render_file_requires_model() {
        let dir = tempdir().unwrap();
        let audio = MonoAudio::new(vec![0.5; 64], 48000);

        let config = EngineConfig::default();
        let controls = Controls::default();

        let err = render_file(&audio, dir.path(), config.clone(), controls, 16, false).unwrap_err();
        let typed = err.downcast_ref::<NeuralFxError>().unwrap();
        assert_eq!(typed.error_code(), "MODEL_IO");
        assert!(!recovery_hints(&err).is_empty());

        let silent = render_file(&audio, dir.path(), config, controls, 16, true).unwrap();
        assert!(silent.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_recovery_hints_follow_the_chain() {
        let err = anyhow::Error::new(LoadError::UnsupportedArity { arity: 4 })
            .context("Invalid model document");
        assert_eq!(
            recovery_hints(&err),
            LoadError::UnsupportedArity { arity: 4 }.recovery_suggestions()
        );

        let missing: anyhow::Error = NeuralFxError::FileNotFound {
            path: "di.wav".to_string(),
        }
        .into();
        assert!(recovery_hints(&missing).contains(&"Check the file path is correct"));

        let not_recoverable: anyhow::Error = NeuralFxError::InvalidConfig {
            reason: "preroll".to_string(),
        }
        .into();
        assert!(recovery_hints(&not_recoverable).is_empty());

        assert!(recovery_hints(&anyhow!("plain failure")).is_empty());
    }
}
