//! Model document parsing and descriptor validation
//!
//! A model document is the JSON export of a trained network: an `in_shape`
//! whose last element is the number of inputs per sample, an optional
//! `in_skip` flag, and the ordered `layers` list with their weights.
//! Unknown fields are ignored.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::engine::InputArity;
use crate::error::LoadError;

/// One entry of the document's `layers` list
#[derive(Debug, Clone, Deserialize)]
pub struct LayerSpec {
    /// Layer kind, e.g. "dense", "gru", "lstm", "conv1d", "tanh"
    #[serde(rename = "type")]
    pub layer_type: String,

    /// Fused activation ("" or absent for linear)
    #[serde(default)]
    pub activation: Option<String>,

    /// Output shape; the last element is the layer width
    #[serde(default)]
    pub shape: Option<Vec<Value>>,

    /// Raw weight tensors, layout depends on the layer kind
    #[serde(default)]
    pub weights: Vec<Value>,

    /// Convolution kernel size (int or one-element list)
    #[serde(default)]
    pub kernel_size: Option<Value>,

    /// Convolution dilation (int or one-element list)
    #[serde(default)]
    pub dilation: Option<Value>,

    /// Batch-norm epsilon
    #[serde(default)]
    pub epsilon: Option<f32>,
}

impl LayerSpec {
    /// Width of this layer's output (last element of `shape`)
    pub fn width(&self, index: usize) -> Result<usize, LoadError> {
        let field = format!("layers[{}].shape", index);
        let shape = self
            .shape
            .as_deref()
            .ok_or_else(|| LoadError::missing(field.clone()))?;
        last_dimension(shape, &field)
    }
}

/// A parsed model document
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub in_shape: Option<Vec<Value>>,

    #[serde(default)]
    pub in_skip: Option<Value>,

    #[serde(default)]
    pub layers: Option<Vec<LayerSpec>>,

    #[serde(skip)]
    pub path: PathBuf,

    /// SHA-256 of the raw document, hex encoded
    #[serde(skip)]
    pub checksum: String,
}

impl ModelDocument {
    /// Read and parse a document from disk
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse a document from its JSON text
    pub fn parse(content: &str, path: &Path) -> Result<Self, LoadError> {
        let mut document: ModelDocument =
            serde_json::from_str(content).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        document.path = path.to_path_buf();
        document.checksum = format!("{:x}", Sha256::digest(content.as_bytes()));
        Ok(document)
    }

    /// Number of scalar inputs per sample (last element of `in_shape`)
    pub fn input_size(&self) -> Result<usize, LoadError> {
        let shape = self
            .in_shape
            .as_deref()
            .ok_or_else(|| LoadError::missing("in_shape"))?;
        last_dimension(shape, "in_shape")
    }

    /// The layer list; never empty on success
    pub fn layers(&self) -> Result<&[LayerSpec], LoadError> {
        let layers = self
            .layers
            .as_deref()
            .ok_or_else(|| LoadError::missing("layers"))?;
        if layers.is_empty() {
            return Err(LoadError::EmptyLayers);
        }
        Ok(layers)
    }

    /// Interpret `in_skip`: absent or non-numeric is 0, only 0 and 1 are valid
    pub fn skip_enabled(&self) -> Result<bool, LoadError> {
        let value = match &self.in_skip {
            Some(value) => value,
            None => return Ok(false),
        };

        let skip = match value.as_i64() {
            Some(v) => v,
            None => match value.as_f64() {
                Some(v) => v.trunc() as i64,
                None => {
                    warn!("Ignoring non-numeric in_skip value {}", value);
                    return Ok(false);
                }
            },
        };

        match skip {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LoadError::UnsupportedSkip { value: other }),
        }
    }
}

/// Validated description of a loaded model
///
/// Only exists for documents that passed validation; a failed load leaves
/// the processor without a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    layer_count: usize,
    input_arity: InputArity,
    hidden_size: usize,
    skip_enabled: bool,
    last_layer_type: String,
    path: PathBuf,
    checksum: String,
}

impl ModelDescriptor {
    /// Load and validate a model document
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        log_loading(path);
        let result = ModelDocument::from_path(path).and_then(|doc| Self::from_document(&doc));
        log_load_result(path, result.as_ref());
        result
    }

    /// Extract the descriptor fields from a parsed document
    pub fn from_document(document: &ModelDocument) -> Result<Self, LoadError> {
        let layers = document.layers()?;
        let input_arity = InputArity::from_size(document.input_size()?)?;
        let skip_enabled = document.skip_enabled()?;

        let last_index = layers.len() - 1;
        let last = &layers[last_index];

        Ok(Self {
            layer_count: layers.len(),
            input_arity,
            hidden_size: last.width(last_index)?,
            skip_enabled,
            last_layer_type: last.layer_type.clone(),
            path: document.path.clone(),
            checksum: document.checksum.clone(),
        })
    }

    /// Build a descriptor for a model that did not come from a document
    pub fn from_parts(
        layer_count: usize,
        input_arity: InputArity,
        hidden_size: usize,
        skip_enabled: bool,
        last_layer_type: &str,
    ) -> Self {
        Self {
            layer_count,
            input_arity,
            hidden_size,
            skip_enabled,
            last_layer_type: last_layer_type.to_string(),
            path: PathBuf::new(),
            checksum: String::new(),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn input_arity(&self) -> InputArity {
        self.input_arity
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn skip_enabled(&self) -> bool {
        self.skip_enabled
    }

    /// Multiplier applied to the raw input before it is added to the output
    pub fn skip_gain(&self) -> f32 {
        if self.skip_enabled {
            1.0
        } else {
            0.0
        }
    }

    pub fn last_layer_type(&self) -> &str {
        &self.last_layer_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// Log the start of a model load
pub(crate) fn log_loading(path: &Path) {
    info!("Loading model file: {}", path.display());
}

/// Log the outcome of a model load
pub(crate) fn log_load_result(path: &Path, result: Result<&ModelDescriptor, &LoadError>) {
    match result {
        Ok(descriptor) => info!(
            "Successfully loaded model file: {} ({} layers, {} inputs, skip {}, sha256 {})",
            path.display(),
            descriptor.layer_count,
            descriptor.input_arity,
            u8::from(descriptor.skip_enabled),
            descriptor.checksum
        ),
        Err(e) => error!("Unable to load model file: {}: {}", path.display(), e),
    }
}

/// Last element of a shape list as a positive width
///
/// Whole-number floats such as `2.0` are accepted.
fn last_dimension(shape: &[Value], field: &str) -> Result<usize, LoadError> {
    let last = shape
        .last()
        .ok_or_else(|| LoadError::invalid(field, "shape is empty"))?;
    let width = last.as_u64().or_else(|| {
        last.as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u64)
    });
    match width {
        Some(0) => Err(LoadError::invalid(field, "last dimension is zero")),
        Some(width) => Ok(width as usize),
        None => Err(LoadError::invalid(
            field,
            format!("last dimension must be a positive integer, got {}", last),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use test_case::test_case;

    fn document(json: &str) -> ModelDocument {
        ModelDocument::parse(json, Path::new("model.json")).unwrap()
    }

    const GRU_MODEL: &str = r#"{
        "in_shape": [null, null, 2],
        "in_skip": 1,
        "layers": [
            { "type": "gru", "activation": "", "shape": [null, null, 8], "weights": [] },
            { "type": "dense", "activation": "", "shape": [null, null, 1], "weights": [] }
        ]
    }"#;

    #[test]
    fn test_descriptor_fields() {
        let descriptor = ModelDescriptor::from_document(&document(GRU_MODEL)).unwrap();
        assert_eq!(descriptor.layer_count(), 2);
        assert_eq!(descriptor.input_arity(), InputArity::Conditioned);
        assert_eq!(descriptor.hidden_size(), 1);
        assert!(descriptor.skip_enabled());
        assert_eq!(descriptor.skip_gain(), 1.0);
        assert_eq!(descriptor.last_layer_type(), "dense");
        assert_eq!(descriptor.checksum().len(), 64);
    }

    #[test_case(None => true ; "absent")]
    #[test_case(Some("0") => true ; "zero")]
    #[test_case(Some("1") => true ; "one")]
    #[test_case(Some("1.0") => true ; "float one")]
    #[test_case(Some("\"2\"") => true ; "non numeric is ignored")]
    #[test_case(Some("2") => false ; "two")]
    #[test_case(Some("-1") => false ; "negative")]
    fn test_skip_bound(skip: Option<&str>) -> bool {
        let skip_field = skip
            .map(|v| format!(r#""in_skip": {},"#, v))
            .unwrap_or_default();
        let json = format!(
            r#"{{ "in_shape": [null, null, 1], {} "layers": [
                {{ "type": "dense", "shape": [null, null, 1] }}
            ] }}"#,
            skip_field
        );
        ModelDescriptor::from_document(&document(&json)).is_ok()
    }

    #[test]
    fn test_skip_two_reports_value() {
        let json = r#"{ "in_shape": [1], "in_skip": 2, "layers": [{ "type": "dense", "shape": [1] }] }"#;
        let err = ModelDescriptor::from_document(&document(json)).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedSkip { value: 2 }));
    }

    #[test_case(0 ; "zero inputs")]
    #[test_case(4 ; "four inputs")]
    fn test_rejects_arity(arity: usize) {
        let json = format!(
            r#"{{ "in_shape": [null, null, {}], "layers": [{{ "type": "dense", "shape": [1] }}] }}"#,
            arity
        );
        assert!(ModelDescriptor::from_document(&document(&json)).is_err());
    }

    #[test]
    fn test_missing_fields() {
        let err = ModelDescriptor::from_document(&document(r#"{ "layers": [] }"#)).unwrap_err();
        assert!(matches!(err, LoadError::EmptyLayers));

        let err = ModelDescriptor::from_document(&document(
            r#"{ "layers": [{ "type": "dense", "shape": [1] }] }"#,
        ))
        .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");

        let err = ModelDescriptor::from_document(&document(r#"{ "in_shape": [1] }"#)).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }

    #[test_case("2.0" => Ok(InputArity::Conditioned) ; "whole float")]
    #[test_case("3" => Ok(InputArity::DualConditioned) ; "integer")]
    #[test_case("1.5" => Err("INVALID_FIELD") ; "fractional")]
    #[test_case("-1.0" => Err("INVALID_FIELD") ; "negative float")]
    fn test_in_shape_accepts_whole_floats(
        width: &str,
    ) -> std::result::Result<InputArity, &'static str> {
        let json = format!(
            r#"{{ "in_shape": [null, null, {}], "layers": [{{ "type": "dense", "shape": [1.0] }}] }}"#,
            width
        );
        ModelDescriptor::from_document(&document(&json))
            .map(|d| d.input_arity())
            .map_err(|e| e.error_code())
    }

    #[test]
    fn test_type_mismatch_is_a_load_error() {
        let err = ModelDescriptor::from_document(&document(
            r#"{ "in_shape": ["one"], "layers": [{ "type": "dense", "shape": [1] }] }"#,
        ))
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FIELD");

        let err = ModelDocument::parse(r#"{ "layers": 3 }"#, Path::new("m.json")).unwrap_err();
        assert_eq!(err.error_code(), "MODEL_PARSE");
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, GRU_MODEL).unwrap();

        let descriptor = ModelDescriptor::load(&path).unwrap();
        assert_eq!(descriptor.path(), path.as_path());

        let missing = ModelDescriptor::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(missing.error_code(), "MODEL_IO");
    }
}
