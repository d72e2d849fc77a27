//! Network layers
//!
//! Per-sample implementations of the layer kinds found in exported model
//! documents. Weight tensors follow the Keras export layout:
//!
//! | type        | weights                                              |
//! |-------------|------------------------------------------------------|
//! | `dense`     | kernel `[in][out]`, bias `[out]`                     |
//! | `gru`       | kernel `[in][3h]`, recurrent `[h][3h]`, bias `[2][3h]` |
//! | `lstm`      | kernel `[in][4h]`, recurrent `[h][4h]`, bias `[4h]`  |
//! | `conv1d`    | kernel `[k][in][out]`, bias `[out]`                  |
//! | `batchnorm` | `[gamma, beta, mean, var]` or `[mean, var]`          |
//!
//! All buffers are sized when the layer is built; `forward` never allocates.

use serde::Deserialize;
use serde_json::Value;

use super::descriptor::LayerSpec;
use crate::error::LoadError;

/// Default batch-norm epsilon when the document omits it
const DEFAULT_EPSILON: f32 = 0.001;

// ============================================================================
// Layer trait
// ============================================================================

/// One stage of a network, advanced once per sample
pub trait Layer: Send {
    fn in_size(&self) -> usize;

    fn out_size(&self) -> usize;

    /// Layer kind, as written in the document
    fn kind(&self) -> &'static str;

    /// Compute `out_size()` outputs from `in_size()` inputs
    fn forward(&mut self, input: &[f32], output: &mut [f32]);

    /// Clear any state carried between samples
    fn reset(&mut self) {}
}

// ============================================================================
// Activations
// ============================================================================

/// Element-wise nonlinearity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Linear,
    Tanh,
    Relu,
    Sigmoid,
    Elu,
}

impl Activation {
    /// Parse an activation name; empty means linear
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "" | "linear" => Some(Activation::Linear),
            "tanh" => Some(Activation::Tanh),
            "relu" => Some(Activation::Relu),
            "sigmoid" => Some(Activation::Sigmoid),
            "elu" => Some(Activation::Elu),
            _ => None,
        }
    }

    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Elu => {
                if x > 0.0 {
                    x
                } else {
                    x.exp() - 1.0
                }
            }
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Standalone activation layer
pub struct ActivationLayer {
    size: usize,
    activation: Activation,
    kind: &'static str,
}

impl ActivationLayer {
    pub fn new(size: usize, activation: Activation, kind: &'static str) -> Self {
        Self {
            size,
            activation,
            kind,
        }
    }
}

impl Layer for ActivationLayer {
    fn in_size(&self) -> usize {
        self.size
    }

    fn out_size(&self) -> usize {
        self.size
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        for (y, &x) in output.iter_mut().zip(input) {
            *y = self.activation.apply(x);
        }
    }
}

// ============================================================================
// Dense
// ============================================================================

/// Fully connected layer
pub struct Dense {
    in_size: usize,
    out_size: usize,
    /// Row-major `[out][in]`
    weights: Vec<f32>,
    bias: Vec<f32>,
    activation: Activation,
}

impl Dense {
    /// Build from a kernel laid out `[in][out]`
    pub fn new(kernel: &[Vec<f32>], bias: Vec<f32>, activation: Activation) -> Self {
        let in_size = kernel.len();
        let out_size = bias.len();
        let mut weights = vec![0.0; out_size * in_size];
        for (i, row) in kernel.iter().enumerate() {
            for (o, &w) in row.iter().enumerate().take(out_size) {
                weights[o * in_size + i] = w;
            }
        }
        Self {
            in_size,
            out_size,
            weights,
            bias,
            activation,
        }
    }
}

impl Layer for Dense {
    fn in_size(&self) -> usize {
        self.in_size
    }

    fn out_size(&self) -> usize {
        self.out_size
    }

    fn kind(&self) -> &'static str {
        "dense"
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        for (o, y) in output.iter_mut().enumerate() {
            let row = &self.weights[o * self.in_size..(o + 1) * self.in_size];
            *y = self.activation.apply(self.bias[o] + dot(row, input));
        }
    }
}

// ============================================================================
// GRU
// ============================================================================

/// Gated recurrent unit (reset gate applied after the recurrent matmul)
pub struct Gru {
    in_size: usize,
    hidden: usize,
    /// `[3h][in]`, gate order z, r, candidate
    kernel: Vec<f32>,
    /// `[3h][h]`
    recurrent: Vec<f32>,
    input_bias: Vec<f32>,
    recurrent_bias: Vec<f32>,
    state: Vec<f32>,
    xw: Vec<f32>,
    hu: Vec<f32>,
}

impl Gru {
    pub fn new(
        kernel: &[Vec<f32>],
        recurrent: &[Vec<f32>],
        input_bias: Vec<f32>,
        recurrent_bias: Vec<f32>,
    ) -> Self {
        let in_size = kernel.len();
        let hidden = recurrent.len();
        Self {
            in_size,
            hidden,
            kernel: transpose(kernel, 3 * hidden),
            recurrent: transpose(recurrent, 3 * hidden),
            input_bias,
            recurrent_bias,
            state: vec![0.0; hidden],
            xw: vec![0.0; 3 * hidden],
            hu: vec![0.0; 3 * hidden],
        }
    }
}

impl Layer for Gru {
    fn in_size(&self) -> usize {
        self.in_size
    }

    fn out_size(&self) -> usize {
        self.hidden
    }

    fn kind(&self) -> &'static str {
        "gru"
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let h = self.hidden;
        for k in 0..3 * h {
            let w = &self.kernel[k * self.in_size..(k + 1) * self.in_size];
            let u = &self.recurrent[k * h..(k + 1) * h];
            self.xw[k] = self.input_bias[k] + dot(w, input);
            self.hu[k] = self.recurrent_bias[k] + dot(u, &self.state);
        }

        for j in 0..h {
            let z = sigmoid(self.xw[j] + self.hu[j]);
            let r = sigmoid(self.xw[h + j] + self.hu[h + j]);
            let c = (self.xw[2 * h + j] + r * self.hu[2 * h + j]).tanh();
            self.state[j] = (1.0 - z) * c + z * self.state[j];
        }

        output.copy_from_slice(&self.state);
    }

    fn reset(&mut self) {
        self.state.fill(0.0);
    }
}

// ============================================================================
// LSTM
// ============================================================================

/// Long short-term memory cell
pub struct Lstm {
    in_size: usize,
    hidden: usize,
    /// `[4h][in]`, gate order i, f, c, o
    kernel: Vec<f32>,
    /// `[4h][h]`
    recurrent: Vec<f32>,
    bias: Vec<f32>,
    hidden_state: Vec<f32>,
    cell_state: Vec<f32>,
    gates: Vec<f32>,
}

impl Lstm {
    pub fn new(kernel: &[Vec<f32>], recurrent: &[Vec<f32>], bias: Vec<f32>) -> Self {
        let in_size = kernel.len();
        let hidden = recurrent.len();
        Self {
            in_size,
            hidden,
            kernel: transpose(kernel, 4 * hidden),
            recurrent: transpose(recurrent, 4 * hidden),
            bias,
            hidden_state: vec![0.0; hidden],
            cell_state: vec![0.0; hidden],
            gates: vec![0.0; 4 * hidden],
        }
    }
}

impl Layer for Lstm {
    fn in_size(&self) -> usize {
        self.in_size
    }

    fn out_size(&self) -> usize {
        self.hidden
    }

    fn kind(&self) -> &'static str {
        "lstm"
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let h = self.hidden;
        for k in 0..4 * h {
            let w = &self.kernel[k * self.in_size..(k + 1) * self.in_size];
            let u = &self.recurrent[k * h..(k + 1) * h];
            self.gates[k] = self.bias[k] + dot(w, input) + dot(u, &self.hidden_state);
        }

        for j in 0..h {
            let i = sigmoid(self.gates[j]);
            let f = sigmoid(self.gates[h + j]);
            let g = self.gates[2 * h + j].tanh();
            let o = sigmoid(self.gates[3 * h + j]);
            self.cell_state[j] = f * self.cell_state[j] + i * g;
            self.hidden_state[j] = o * self.cell_state[j].tanh();
        }

        output.copy_from_slice(&self.hidden_state);
    }

    fn reset(&mut self) {
        self.hidden_state.fill(0.0);
        self.cell_state.fill(0.0);
    }
}

// ============================================================================
// Conv1D
// ============================================================================

/// Causal dilated 1-D convolution over time
///
/// The last kernel tap multiplies the current frame, tap `t` the frame
/// `(k - 1 - t) * dilation` samples back.
pub struct Conv1d {
    in_size: usize,
    out_size: usize,
    kernel_size: usize,
    dilation: usize,
    /// `[tap][out][in]`
    weights: Vec<f32>,
    bias: Vec<f32>,
    activation: Activation,
    /// Ring of past input frames, `history_len * in_size`
    history: Vec<f32>,
    history_len: usize,
    write_pos: usize,
}

impl Conv1d {
    /// Build from a kernel laid out `[k][in][out]`
    pub fn new(
        kernel: &[Vec<Vec<f32>>],
        bias: Vec<f32>,
        dilation: usize,
        activation: Activation,
    ) -> Self {
        let kernel_size = kernel.len();
        let in_size = kernel.first().map_or(0, |tap| tap.len());
        let out_size = bias.len();
        let dilation = dilation.max(1);

        let mut weights = vec![0.0; kernel_size * out_size * in_size];
        for (t, tap) in kernel.iter().enumerate() {
            for (i, row) in tap.iter().enumerate() {
                for (o, &w) in row.iter().enumerate().take(out_size) {
                    weights[(t * out_size + o) * in_size + i] = w;
                }
            }
        }

        let history_len = (kernel_size.saturating_sub(1)) * dilation + 1;
        Self {
            in_size,
            out_size,
            kernel_size,
            dilation,
            weights,
            bias,
            activation,
            history: vec![0.0; history_len * in_size],
            history_len,
            write_pos: 0,
        }
    }
}

impl Layer for Conv1d {
    fn in_size(&self) -> usize {
        self.in_size
    }

    fn out_size(&self) -> usize {
        self.out_size
    }

    fn kind(&self) -> &'static str {
        "conv1d"
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let n = self.in_size;
        let start = self.write_pos * n;
        self.history[start..start + n].copy_from_slice(&input[..n]);

        for (o, y) in output.iter_mut().enumerate() {
            let mut sum = self.bias[o];
            for t in 0..self.kernel_size {
                let lag = (self.kernel_size - 1 - t) * self.dilation;
                let frame = (self.write_pos + self.history_len - lag) % self.history_len;
                let x = &self.history[frame * n..(frame + 1) * n];
                let w = &self.weights[(t * self.out_size + o) * n..(t * self.out_size + o + 1) * n];
                sum += dot(w, x);
            }
            *y = self.activation.apply(sum);
        }

        self.write_pos = (self.write_pos + 1) % self.history_len;
    }

    fn reset(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0;
    }
}

// ============================================================================
// BatchNorm
// ============================================================================

/// Inference-time batch normalisation folded into scale and offset
pub struct BatchNorm {
    scale: Vec<f32>,
    offset: Vec<f32>,
}

impl BatchNorm {
    pub fn new(gamma: &[f32], beta: &[f32], mean: &[f32], variance: &[f32], epsilon: f32) -> Self {
        let scale: Vec<f32> = gamma
            .iter()
            .zip(variance)
            .map(|(g, v)| g / (v + epsilon).sqrt())
            .collect();
        let offset = beta
            .iter()
            .zip(mean)
            .zip(&scale)
            .map(|((b, m), s)| b - m * s)
            .collect();
        Self { scale, offset }
    }
}

impl Layer for BatchNorm {
    fn in_size(&self) -> usize {
        self.scale.len()
    }

    fn out_size(&self) -> usize {
        self.scale.len()
    }

    fn kind(&self) -> &'static str {
        "batchnorm"
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        for ((y, &x), (s, b)) in output
            .iter_mut()
            .zip(input)
            .zip(self.scale.iter().zip(&self.offset))
        {
            *y = x * s + b;
        }
    }
}

// ============================================================================
// Construction from a document
// ============================================================================

/// Build the layer at `index` whose input width is `in_size`
pub fn build_layer(
    index: usize,
    spec: &LayerSpec,
    in_size: usize,
) -> Result<Box<dyn Layer>, LoadError> {
    let out_size = spec.width(index)?;
    let layer_type = spec.layer_type.to_lowercase();
    let activation = parse_activation(index, spec.activation.as_deref().unwrap_or(""))?;

    let layer: Box<dyn Layer> = match layer_type.as_str() {
        "dense" | "time-distributed-dense" => {
            let kernel = matrix(index, "kernel", weight(index, spec, 0)?, in_size, out_size)?;
            let bias = vector(index, "bias", weight(index, spec, 1)?, out_size)?;
            Box::new(Dense::new(&kernel, bias, activation))
        }
        "gru" => {
            let gates = 3 * out_size;
            let kernel = matrix(index, "kernel", weight(index, spec, 0)?, in_size, gates)?;
            let recurrent = matrix(index, "recurrent", weight(index, spec, 1)?, out_size, gates)?;
            let (input_bias, recurrent_bias) = gru_bias(index, weight(index, spec, 2)?, gates)?;
            Box::new(Gru::new(&kernel, &recurrent, input_bias, recurrent_bias))
        }
        "lstm" => {
            let gates = 4 * out_size;
            let kernel = matrix(index, "kernel", weight(index, spec, 0)?, in_size, gates)?;
            let recurrent = matrix(index, "recurrent", weight(index, spec, 1)?, out_size, gates)?;
            let bias = vector(index, "bias", weight(index, spec, 2)?, gates)?;
            Box::new(Lstm::new(&kernel, &recurrent, bias))
        }
        "conv1d" => {
            let kernel_size = scalar_param(index, "kernel_size", spec.kernel_size.as_ref())?
                .ok_or_else(|| LoadError::missing(format!("layers[{}].kernel_size", index)))?;
            let dilation = scalar_param(index, "dilation", spec.dilation.as_ref())?.unwrap_or(1);
            let kernel: Vec<Vec<Vec<f32>>> = parse(index, "kernel", weight(index, spec, 0)?)?;
            if kernel.len() != kernel_size
                || kernel
                    .iter()
                    .any(|tap| tap.len() != in_size || tap.iter().any(|row| row.len() != out_size))
            {
                return Err(LoadError::InvalidWeights {
                    index,
                    reason: format!(
                        "kernel must be [{}][{}][{}]",
                        kernel_size, in_size, out_size
                    ),
                });
            }
            let bias = vector(index, "bias", weight(index, spec, 1)?, out_size)?;
            Box::new(Conv1d::new(&kernel, bias, dilation, activation))
        }
        "batchnorm" => {
            expect_same_width(index, in_size, out_size)?;
            let epsilon = spec.epsilon.unwrap_or(DEFAULT_EPSILON);
            let tensors = spec
                .weights
                .iter()
                .map(|w| vector(index, "batchnorm", w, out_size))
                .collect::<Result<Vec<_>, _>>()?;
            match tensors.as_slice() {
                [gamma, beta, mean, var] => Box::new(BatchNorm::new(gamma, beta, mean, var, epsilon)),
                [mean, var] => {
                    let ones = vec![1.0; out_size];
                    let zeros = vec![0.0; out_size];
                    Box::new(BatchNorm::new(&ones, &zeros, mean, var, epsilon))
                }
                _ => {
                    return Err(LoadError::InvalidWeights {
                        index,
                        reason: format!("expected 2 or 4 tensors, found {}", tensors.len()),
                    })
                }
            }
        }
        "tanh" => activation_layer(index, in_size, out_size, Activation::Tanh, "tanh")?,
        "relu" => activation_layer(index, in_size, out_size, Activation::Relu, "relu")?,
        "sigmoid" => activation_layer(index, in_size, out_size, Activation::Sigmoid, "sigmoid")?,
        "elu" => activation_layer(index, in_size, out_size, Activation::Elu, "elu")?,
        _ => {
            return Err(LoadError::UnsupportedLayer {
                index,
                layer_type: spec.layer_type.clone(),
            })
        }
    };

    Ok(layer)
}

fn activation_layer(
    index: usize,
    in_size: usize,
    out_size: usize,
    activation: Activation,
    kind: &'static str,
) -> Result<Box<dyn Layer>, LoadError> {
    expect_same_width(index, in_size, out_size)?;
    Ok(Box::new(ActivationLayer::new(in_size, activation, kind)))
}

fn expect_same_width(index: usize, in_size: usize, out_size: usize) -> Result<(), LoadError> {
    if in_size != out_size {
        return Err(LoadError::ShapeMismatch {
            index,
            expected: in_size,
            found: out_size,
        });
    }
    Ok(())
}

fn parse_activation(index: usize, name: &str) -> Result<Activation, LoadError> {
    Activation::parse(name).ok_or_else(|| {
        LoadError::invalid(
            format!("layers[{}].activation", index),
            format!("unknown activation '{}'", name),
        )
    })
}

fn weight<'a>(index: usize, spec: &'a LayerSpec, slot: usize) -> Result<&'a Value, LoadError> {
    spec.weights.get(slot).ok_or_else(|| LoadError::InvalidWeights {
        index,
        reason: format!("missing weight tensor {}", slot),
    })
}

fn parse<T: serde::de::DeserializeOwned>(
    index: usize,
    what: &str,
    value: &Value,
) -> Result<T, LoadError> {
    T::deserialize(value).map_err(|e| LoadError::InvalidWeights {
        index,
        reason: format!("{}: {}", what, e),
    })
}

fn vector(index: usize, what: &str, value: &Value, len: usize) -> Result<Vec<f32>, LoadError> {
    let v: Vec<f32> = parse(index, what, value)?;
    if v.len() != len {
        return Err(LoadError::InvalidWeights {
            index,
            reason: format!("{} has {} values, expected {}", what, v.len(), len),
        });
    }
    Ok(v)
}

fn matrix(
    index: usize,
    what: &str,
    value: &Value,
    rows: usize,
    cols: usize,
) -> Result<Vec<Vec<f32>>, LoadError> {
    let m: Vec<Vec<f32>> = parse(index, what, value)?;
    if m.len() != rows || m.iter().any(|row| row.len() != cols) {
        return Err(LoadError::InvalidWeights {
            index,
            reason: format!("{} must be [{}][{}]", what, rows, cols),
        });
    }
    Ok(m)
}

/// GRU bias is `[2][3h]` (input, recurrent) or a single `[3h]` input bias
fn gru_bias(index: usize, value: &Value, gates: usize) -> Result<(Vec<f32>, Vec<f32>), LoadError> {
    if let Ok(rows) = Vec::<Vec<f32>>::deserialize(value) {
        if rows.len() == 2 && rows.iter().all(|r| r.len() == gates) {
            let mut rows = rows.into_iter();
            if let (Some(input), Some(recurrent)) = (rows.next(), rows.next()) {
                return Ok((input, recurrent));
            }
        }
        return Err(LoadError::InvalidWeights {
            index,
            reason: format!("bias must be [2][{}] or [{}]", gates, gates),
        });
    }
    let input = vector(index, "bias", value, gates)?;
    Ok((input, vec![0.0; gates]))
}

/// Integer parameter written either bare or as a one-element list
fn scalar_param(index: usize, name: &str, value: Option<&Value>) -> Result<Option<usize>, LoadError> {
    let value = match value {
        Some(v) => v,
        None => return Ok(None),
    };
    let scalar = match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    scalar
        .and_then(Value::as_u64)
        .filter(|&v| v > 0)
        .map(|v| Some(v as usize))
        .ok_or_else(|| {
            LoadError::invalid(
                format!("layers[{}].{}", index, name),
                format!("expected a positive integer, got {}", value),
            )
        })
}

/// `[rows][cols]` to row-major `[cols][rows]`
fn transpose(m: &[Vec<f32>], cols: usize) -> Vec<f32> {
    let rows = m.len();
    let mut out = vec![0.0; rows * cols];
    for (r, row) in m.iter().enumerate() {
        for (c, &v) in row.iter().enumerate().take(cols) {
            out[c * rows + r] = v;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn spec(value: Value) -> LayerSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_activation_parse() {
        assert_eq!(Activation::parse(""), Some(Activation::Linear));
        assert_eq!(Activation::parse("tanh"), Some(Activation::Tanh));
        assert_eq!(Activation::parse("softmax"), None);
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_relative_eq!(Activation::Sigmoid.apply(0.0), 0.5);
    }

    #[test]
    fn test_dense_matches_kernel_layout() {
        // kernel [in=2][out=2]
        let layer = spec(json!({
            "type": "dense",
            "activation": "",
            "shape": [null, null, 2],
            "weights": [[[1.0, 2.0], [3.0, 4.0]], [0.5, -0.5]]
        }));
        let mut dense = build_layer(0, &layer, 2).unwrap();
        let mut out = [0.0f32; 2];
        dense.forward(&[1.0, 1.0], &mut out);

        // out0 = 1*1 + 1*3 + 0.5, out1 = 1*2 + 1*4 - 0.5
        assert_relative_eq!(out[0], 4.5);
        assert_relative_eq!(out[1], 5.5);
    }

    #[test]
    fn test_dense_rejects_wrong_kernel() {
        let layer = spec(json!({
            "type": "dense",
            "shape": [1],
            "weights": [[[1.0, 2.0]], [0.0]]
        }));
        let err = build_layer(3, &layer, 1).err().unwrap();
        assert!(matches!(err, LoadError::InvalidWeights { index: 3, .. }));
    }

    #[test]
    fn test_gru_zero_weights_holds_half_state() {
        // With all weights zero: z = r = 0.5, candidate = 0 -> h = 0.5 * h
        let layer = spec(json!({
            "type": "gru",
            "shape": [null, null, 1],
            "weights": [[[0.0, 0.0, 0.0]], [[0.0, 0.0, 0.0]], [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]]
        }));
        let mut gru = build_layer(0, &layer, 1).unwrap();
        let mut out = [0.0f32; 1];
        gru.forward(&[1.0], &mut out);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_gru_candidate_follows_input() {
        // Candidate weight 1 on the input, update gate forced closed by a large
        // negative bias: h ~= tanh(x)
        let layer = spec(json!({
            "type": "gru",
            "shape": [1],
            "weights": [[[0.0, 0.0, 1.0]], [[0.0, 0.0, 0.0]], [-30.0, 0.0, 0.0]]
        }));
        let mut gru = build_layer(0, &layer, 1).unwrap();
        let mut out = [0.0f32; 1];
        gru.forward(&[0.5], &mut out);
        assert_relative_eq!(out[0], 0.5f32.tanh(), epsilon = 1e-6);

        gru.reset();
        gru.forward(&[0.0], &mut out);
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lstm_single_step() {
        // i = f = o = sigmoid(0) = 0.5, g = tanh(x)
        let layer = spec(json!({
            "type": "lstm",
            "shape": [1],
            "weights": [[[0.0, 0.0, 1.0, 0.0]], [[0.0, 0.0, 0.0, 0.0]], [0.0, 0.0, 0.0, 0.0]]
        }));
        let mut lstm = build_layer(0, &layer, 1).unwrap();
        let mut out = [0.0f32; 1];
        lstm.forward(&[1.0], &mut out);

        let c = 0.5 * 1.0f32.tanh();
        assert_relative_eq!(out[0], 0.5 * c.tanh(), epsilon = 1e-6);

        // State carries: c' = 0.5 * c + 0.5 * tanh(1)
        lstm.forward(&[1.0], &mut out);
        let c2 = 0.5 * c + 0.5 * 1.0f32.tanh();
        assert_relative_eq!(out[0], 0.5 * c2.tanh(), epsilon = 1e-6);
    }

    #[test]
    fn test_conv1d_dilated_taps() {
        // k = 2, dilation 2: y[t] = 1 * x[t - 2] + 10 * x[t]
        let layer = spec(json!({
            "type": "conv1d",
            "shape": [1],
            "kernel_size": [2],
            "dilation": 2,
            "weights": [[[[1.0]], [[10.0]]], [0.0]]
        }));
        let mut conv = build_layer(0, &layer, 1).unwrap();
        let mut out = [0.0f32; 1];
        let mut ys = Vec::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            conv.forward(&[x], &mut out);
            ys.push(out[0]);
        }
        assert_eq!(ys, vec![10.0, 20.0, 31.0, 42.0]);
    }

    #[test]
    fn test_batchnorm_two_tensor_form() {
        let layer = spec(json!({
            "type": "batchnorm",
            "shape": [1],
            "epsilon": 0.0,
            "weights": [[1.0], [4.0]]
        }));
        let mut bn = build_layer(0, &layer, 1).unwrap();
        let mut out = [0.0f32; 1];
        bn.forward(&[3.0], &mut out);
        assert_relative_eq!(out[0], 1.0);
    }

    #[test]
    fn test_activation_layer_width_must_match() {
        let layer = spec(json!({ "type": "tanh", "shape": [4] }));
        let err = build_layer(2, &layer, 8).err().unwrap();
        assert!(matches!(
            err,
            LoadError::ShapeMismatch {
                index: 2,
                expected: 8,
                found: 4
            }
        ));
    }

    #[test]
    fn test_unknown_layer_type() {
        let layer = spec(json!({ "type": "attention", "shape": [1] }));
        let err = build_layer(0, &layer, 1).err().unwrap();
        assert_eq!(err.error_code(), "UNSUPPORTED_LAYER");
    }
}
