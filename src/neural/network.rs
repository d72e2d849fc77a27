//! Layer-stack network built from a model document

use log::debug;

use super::descriptor::ModelDocument;
use super::layers::{build_layer, Layer};
use super::model::SequenceModel;
use crate::error::LoadError;

/// Sequential network evaluated one sample at a time
///
/// Two scratch buffers sized to the widest layer are swapped between
/// layers, so evaluation allocates nothing.
pub struct Network {
    in_size: usize,
    layers: Vec<Box<dyn Layer>>,
    current: Vec<f32>,
    next: Vec<f32>,
}

impl Network {
    /// Build every layer described by the document
    pub fn from_document(document: &ModelDocument) -> Result<Self, LoadError> {
        let in_size = document.input_size()?;
        let mut width = in_size;
        let mut layers = Vec::new();

        for (index, spec) in document.layers()?.iter().enumerate() {
            let layer = build_layer(index, spec, width)?;
            debug!(
                "Layer {}: {} {} -> {}",
                index,
                layer.kind(),
                layer.in_size(),
                layer.out_size()
            );
            width = layer.out_size();
            layers.push(layer);
        }

        Self::from_layers(in_size, layers)
    }

    /// Chain pre-built layers, checking that widths line up
    pub fn from_layers(in_size: usize, layers: Vec<Box<dyn Layer>>) -> Result<Self, LoadError> {
        if layers.is_empty() {
            return Err(LoadError::EmptyLayers);
        }

        let mut width = in_size;
        let mut widest = in_size;
        for (index, layer) in layers.iter().enumerate() {
            if layer.in_size() != width {
                return Err(LoadError::ShapeMismatch {
                    index,
                    expected: width,
                    found: layer.in_size(),
                });
            }
            width = layer.out_size();
            widest = widest.max(width);
        }

        Ok(Self {
            in_size,
            layers,
            current: vec![0.0; widest],
            next: vec![0.0; widest],
        })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Width of the final layer
    pub fn out_size(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.out_size())
    }
}

impl SequenceModel for Network {
    fn input_size(&self) -> usize {
        self.in_size
    }

    fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
        self.current.fill(0.0);
        self.next.fill(0.0);
    }

    fn forward(&mut self, input: &[f32]) -> f32 {
        let n = input.len().min(self.in_size);
        self.current[..n].copy_from_slice(&input[..n]);

        let mut width = self.in_size;
        for layer in &mut self.layers {
            let out = layer.out_size();
            layer.forward(&self.current[..width], &mut self.next[..out]);
            std::mem::swap(&mut self.current, &mut self.next);
            width = out;
        }

        self.current[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::Path;

    fn document(json: &str) -> ModelDocument {
        ModelDocument::parse(json, Path::new("model.json")).unwrap()
    }

    const GRU_DENSE: &str = r#"{
        "in_shape": [null, null, 1],
        "layers": [
            {
                "type": "gru", "activation": "", "shape": [null, null, 2],
                "weights": [
                    [[0.1, -0.2, 0.3, 0.4, 0.5, -0.6]],
                    [[0.1, 0.1, 0.1, 0.1, 0.1, 0.1], [0.2, 0.2, 0.2, 0.2, 0.2, 0.2]],
                    [[0.0, 0.0, 0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]
                ]
            },
            {
                "type": "dense", "activation": "", "shape": [null, null, 1],
                "weights": [[[1.0], [-1.0]], [0.25]]
            }
        ]
    }"#;

    #[test]
    fn test_build_from_document() {
        let net = Network::from_document(&document(GRU_DENSE)).unwrap();
        assert_eq!(net.layer_count(), 2);
        assert_eq!(net.input_size(), 1);
        assert_eq!(net.out_size(), 1);
    }

    #[test]
    fn test_zero_input_from_zero_state_gives_bias() {
        let mut net = Network::from_document(&document(GRU_DENSE)).unwrap();
        // GRU stays at zero for zero input, dense adds its bias
        assert_relative_eq!(net.forward(&[0.0]), 0.25);
    }

    #[test]
    fn test_reset_restores_initial_response() {
        let mut net = Network::from_document(&document(GRU_DENSE)).unwrap();
        let first: Vec<f32> = [0.5, -0.3, 0.8].iter().map(|&x| net.forward(&[x])).collect();
        net.reset();
        let second: Vec<f32> = [0.5, -0.3, 0.8].iter().map(|&x| net.forward(&[x])).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_unsupported_layer() {
        let json = r#"{ "in_shape": [1], "layers": [{ "type": "softmax", "shape": [1] }] }"#;
        let err = Network::from_document(&document(json)).err().unwrap();
        assert_eq!(err.error_code(), "UNSUPPORTED_LAYER");
    }

    #[test]
    fn test_from_layers_checks_chain() {
        let json = r#"{ "in_shape": [2], "layers": [{ "type": "tanh", "shape": [2] }] }"#;
        let doc = document(json);
        let spec = &doc.layers().unwrap()[0];
        let layer = build_layer(0, spec, 2).unwrap();

        let err = Network::from_layers(3, vec![layer]).err().unwrap();
        assert!(matches!(
            err,
            LoadError::ShapeMismatch {
                index: 0,
                expected: 3,
                found: 2
            }
        ));
    }
}
