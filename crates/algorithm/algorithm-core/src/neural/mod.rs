//! Neural autoregressive forecaster
//!
//! A single hidden layer followed by a linear output unit. The layer is
//! either dense over the whole lag window or a recurrent cell (Elman, LSTM or
//! GRU) stepping through it one value at a time. Inputs are min-max scaled
//! with the training range. Training runs Adam on the squared one-step error,
//! one sample at a time, with samples shuffled every epoch by a seeded
//! generator so that fits are reproducible.

use algorithm_spi::{
    Activation, HistoryForecaster, NeuralParams, NnType, Predictor, Result, TsError,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;
const CLIP_NORM: f64 = 1.0;

// LSTM gate blocks
const LSTM_INPUT: usize = 0;
const LSTM_FORGET: usize = 1;
const LSTM_CELL: usize = 2;
const LSTM_OUTPUT: usize = 3;

// GRU gate blocks
const GRU_UPDATE: usize = 0;
const GRU_RESET: usize = 1;
const GRU_CANDIDATE: usize = 2;

fn sigmoid(x: f64) -> f64 {
    Activation::Sigmoid.apply(x)
}

fn add_into(target: &mut [f64], values: &[f64]) {
    for (t, v) in target.iter_mut().zip(values) {
        *t += v;
    }
}

/// Offsets of each parameter block in the flat weight vector
///
/// Recurrent layers hold `gates` blocks of `units` rows; row `g * units + u`
/// of the input, recurrent and bias parts belongs to unit `u` of gate `g`.
#[derive(Debug, Clone, Copy)]
struct Layout {
    nn_type: NnType,
    inputs: usize,
    units: usize,
}

impl Layout {
    fn new(params: &NeuralParams) -> Self {
        Self {
            nn_type: params.nn_type,
            inputs: params.n_inputs,
            units: params.n_units,
        }
    }

    fn rows(&self) -> usize {
        self.nn_type.gates() * self.units
    }

    /// Input weights: `units x inputs` for dense, one per row otherwise
    fn input_len(&self) -> usize {
        if self.nn_type.is_recurrent() {
            self.rows()
        } else {
            self.units * self.inputs
        }
    }

    fn recurrent_len(&self) -> usize {
        if self.nn_type.is_recurrent() {
            self.rows() * self.units
        } else {
            0
        }
    }

    fn recurrent(&self) -> usize {
        self.input_len()
    }

    fn hidden_bias(&self) -> usize {
        self.recurrent() + self.recurrent_len()
    }

    fn output(&self) -> usize {
        self.hidden_bias() + self.rows()
    }

    fn output_bias(&self) -> usize {
        self.output() + self.units
    }

    fn total(&self) -> usize {
        self.output_bias() + 1
    }
}

/// Recurrent weights borrowed from the flat vector
struct Cell<'a> {
    units: usize,
    input: &'a [f64],
    recurrent: &'a [f64],
    bias: &'a [f64],
}

impl<'a> Cell<'a> {
    fn new(layout: &Layout, weights: &'a [f64]) -> Self {
        Self {
            units: layout.units,
            input: &weights[..layout.recurrent()],
            recurrent: &weights[layout.recurrent()..layout.hidden_bias()],
            bias: &weights[layout.hidden_bias()..layout.output()],
        }
    }

    /// Pre-activations of gate `gate` for input `x` and recurrent input `h`
    fn gate(&self, gate: usize, x: f64, h: &[f64]) -> Vec<f64> {
        (0..self.units)
            .map(|u| {
                let row = gate * self.units + u;
                let weights = &self.recurrent[row * self.units..(row + 1) * self.units];
                self.input[row] * x
                    + weights.iter().zip(h).map(|(w, h)| w * h).sum::<f64>()
                    + self.bias[row]
            })
            .collect()
    }
}

/// Add the gradient of gate `gate` given its pre-activation gradient `dz`,
/// and return the gradient reaching the recurrent input `h`
fn accumulate_gate(
    layout: &Layout,
    weights: &[f64],
    grad: &mut [f64],
    gate: usize,
    dz: &[f64],
    x: f64,
    h: &[f64],
) -> Vec<f64> {
    let units = layout.units;
    let mut dh = vec![0.0; units];
    for (u, &d) in dz.iter().enumerate() {
        let row = gate * units + u;
        grad[row] += d * x;
        grad[layout.hidden_bias() + row] += d;
        let offset = layout.recurrent() + row * units;
        for v in 0..units {
            grad[offset + v] += d * h[v];
            dh[v] += weights[offset + v] * d;
        }
    }
    dh
}

/// Activations kept from the forward pass for backpropagation
struct Trace {
    /// Pre-activations per step, `gates` blocks of `units` (one step for dense)
    pre: Vec<Vec<f64>>,
    /// Hidden states per step, starting with the zero state for recurrent cells
    hidden: Vec<Vec<f64>>,
    /// LSTM cell states, starting with the zero state; empty for other layers
    cells: Vec<Vec<f64>>,
    output: f64,
}

/// Pre-activations, hidden states and cell states of a forward pass
type Pass = (Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<Vec<f64>>);

/// Adam optimizer with bias corrections kept as running products
struct Adam {
    learning_rate: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    beta1_t: f64,
    beta2_t: f64,
}

impl Adam {
    fn new(len: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            m: vec![0.0; len],
            v: vec![0.0; len],
            beta1_t: 1.0,
            beta2_t: 1.0,
        }
    }

    fn update(&mut self, weights: &mut [f64], grad: &[f64]) {
        self.beta1_t *= ADAM_BETA1;
        self.beta2_t *= ADAM_BETA2;
        let bias1 = 1.0 - self.beta1_t;
        let bias2 = 1.0 - self.beta2_t;
        for (k, (w, g)) in weights.iter_mut().zip(grad).enumerate() {
            self.m[k] = ADAM_BETA1 * self.m[k] + (1.0 - ADAM_BETA1) * g;
            self.v[k] = ADAM_BETA2 * self.v[k] + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = self.m[k] / bias1;
            let v_hat = self.v[k] / bias2;
            *w -= self.learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPS);
        }
    }
}

fn clip_gradient(grad: &mut [f64]) {
    let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm > CLIP_NORM {
        let factor = CLIP_NORM / norm;
        grad.iter_mut().for_each(|g| *g *= factor);
    }
}

fn check_params(params: &NeuralParams) -> Result<()> {
    if params.n_units == 0 {
        return Err(TsError::invalid_parameter("n_units", "must be positive"));
    }
    if params.n_inputs == 0 {
        return Err(TsError::invalid_parameter("n_inputs", "must be positive"));
    }
    if params.epochs == 0 {
        return Err(TsError::invalid_parameter("epochs", "must be positive"));
    }
    if !(params.learning_rate > 0.0 && params.learning_rate.is_finite()) {
        return Err(TsError::invalid_parameter(
            "learning_rate",
            "must be a positive number",
        ));
    }
    Ok(())
}

/// Dense or recurrent one-hidden-layer autoregressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralForecaster {
    params: NeuralParams,
    weights: Vec<f64>,
    scale_min: f64,
    scale_range: f64,
    /// Last `n_inputs` training values, the default history for `predict`
    tail: Vec<f64>,
    fitted: bool,
}

impl NeuralForecaster {
    /// Create an unfitted model
    pub fn new(params: NeuralParams) -> Result<Self> {
        check_params(&params)?;
        Ok(Self {
            params,
            weights: Vec::new(),
            scale_min: 0.0,
            scale_range: 1.0,
            tail: Vec::new(),
            fitted: false,
        })
    }

    /// Model parameters
    pub fn params(&self) -> &NeuralParams {
        &self.params
    }

    /// Number of trainable weights
    pub fn weight_count(&self) -> usize {
        Layout::new(&self.params).total()
    }

    /// Check that deserialized state matches the parameters it claims.
    ///
    /// A fitted model must carry exactly [`weight_count`](Self::weight_count)
    /// finite weights, a full lag window and a usable scaling range.
    pub fn validate(&self) -> Result<()> {
        check_params(&self.params)?;
        if !self.fitted {
            return Ok(());
        }
        let expected = self.weight_count();
        if self.weights.len() != expected {
            return Err(TsError::InvalidData(format!(
                "{} network expects {} weights, found {}",
                self.params.nn_type,
                expected,
                self.weights.len()
            )));
        }
        if self.weights.iter().any(|w| !w.is_finite()) {
            return Err(TsError::InvalidData("non-finite network weights".to_string()));
        }
        if self.tail.len() != self.params.n_inputs {
            return Err(TsError::InvalidData(format!(
                "lag window holds {} values, expected {}",
                self.tail.len(),
                self.params.n_inputs
            )));
        }
        let range_ok = self.scale_range.is_finite() && self.scale_range > 0.0;
        if !self.scale_min.is_finite() || !range_ok {
            return Err(TsError::InvalidData("invalid scaling range".to_string()));
        }
        Ok(())
    }

    fn scale(&self, x: f64) -> f64 {
        (x - self.scale_min) / self.scale_range
    }

    fn unscale(&self, x: f64) -> f64 {
        x * self.scale_range + self.scale_min
    }

    fn init_weights(&self, rng: &mut StdRng) -> Vec<f64> {
        let layout = Layout::new(&self.params);
        let units = layout.units as f64;
        let mut weights = vec![0.0; layout.total()];

        let input_limit = if layout.nn_type.is_recurrent() {
            (6.0 / (1.0 + units)).sqrt()
        } else {
            (6.0 / (layout.inputs as f64 + units)).sqrt()
        };
        for w in &mut weights[..layout.input_len()] {
            *w = rng.gen_range(-input_limit..input_limit);
        }

        let recurrent_limit = (6.0 / (2.0 * units)).sqrt();
        for w in &mut weights[layout.recurrent()..layout.hidden_bias()] {
            *w = rng.gen_range(-recurrent_limit..recurrent_limit);
        }

        // Forget gates start open
        if layout.nn_type == NnType::Lstm {
            let start = layout.hidden_bias() + LSTM_FORGET * layout.units;
            weights[start..start + layout.units].fill(1.0);
        }

        let output_limit = (6.0 / (units + 1.0)).sqrt();
        for w in &mut weights[layout.output()..layout.output_bias()] {
            *w = rng.gen_range(-output_limit..output_limit);
        }
        weights
    }

    fn forward(&self, weights: &[f64], window: &[f64]) -> Trace {
        let layout = Layout::new(&self.params);
        let (pre, hidden, cells) = if layout.nn_type.is_recurrent() {
            self.forward_recurrent(&layout, weights, window)
        } else {
            self.forward_dense(&layout, weights, window)
        };

        let out_w = &weights[layout.output()..layout.output_bias()];
        let last = &hidden[hidden.len() - 1];
        let output = out_w.iter().zip(last).map(|(w, h)| w * h).sum::<f64>()
            + weights[layout.output_bias()];
        Trace {
            pre,
            hidden,
            cells,
            output,
        }
    }

    fn forward_dense(&self, layout: &Layout, weights: &[f64], window: &[f64]) -> Pass {
        let activation = self.params.activation;
        let bias = &weights[layout.hidden_bias()..layout.output()];
        let pre: Vec<f64> = (0..layout.units)
            .map(|u| {
                let row = &weights[u * layout.inputs..(u + 1) * layout.inputs];
                row.iter().zip(window).map(|(w, x)| w * x).sum::<f64>() + bias[u]
            })
            .collect();
        let h: Vec<f64> = pre.iter().map(|&z| activation.apply(z)).collect();
        (vec![pre], vec![h], Vec::new())
    }

    fn forward_recurrent(&self, layout: &Layout, weights: &[f64], window: &[f64]) -> Pass {
        let units = layout.units;
        let activation = self.params.activation;
        let cell = Cell::new(layout, weights);

        let mut pres = Vec::with_capacity(window.len());
        let mut hidden = Vec::with_capacity(window.len() + 1);
        let mut cells = Vec::new();
        hidden.push(vec![0.0; units]);
        if layout.nn_type == NnType::Lstm {
            cells.push(vec![0.0; units]);
        }

        for &x in window {
            let prev = &hidden[hidden.len() - 1];
            let (pre, h) = match layout.nn_type {
                NnType::Lstm => {
                    let pre: Vec<f64> = (0..4).flat_map(|g| cell.gate(g, x, prev)).collect();
                    let c_prev = &cells[cells.len() - 1];
                    let mut c = vec![0.0; units];
                    let mut h = vec![0.0; units];
                    for u in 0..units {
                        let i = sigmoid(pre[LSTM_INPUT * units + u]);
                        let f = sigmoid(pre[LSTM_FORGET * units + u]);
                        let g = activation.apply(pre[LSTM_CELL * units + u]);
                        let o = sigmoid(pre[LSTM_OUTPUT * units + u]);
                        c[u] = f * c_prev[u] + i * g;
                        h[u] = o * activation.apply(c[u]);
                    }
                    cells.push(c);
                    (pre, h)
                }
                NnType::Gru => {
                    let mut pre = cell.gate(GRU_UPDATE, x, prev);
                    pre.extend(cell.gate(GRU_RESET, x, prev));
                    let reset_prev: Vec<f64> = (0..units)
                        .map(|u| sigmoid(pre[GRU_RESET * units + u]) * prev[u])
                        .collect();
                    pre.extend(cell.gate(GRU_CANDIDATE, x, &reset_prev));
                    let h: Vec<f64> = (0..units)
                        .map(|u| {
                            let z = sigmoid(pre[GRU_UPDATE * units + u]);
                            let candidate = activation.apply(pre[GRU_CANDIDATE * units + u]);
                            z * prev[u] + (1.0 - z) * candidate
                        })
                        .collect();
                    (pre, h)
                }
                NnType::Dense | NnType::Rnn => {
                    let pre = cell.gate(0, x, prev);
                    let h: Vec<f64> = pre.iter().map(|&z| activation.apply(z)).collect();
                    (pre, h)
                }
            };
            pres.push(pre);
            hidden.push(h);
        }
        (pres, hidden, cells)
    }

    /// Gradient of the squared error of one sample
    fn backward(&self, weights: &[f64], window: &[f64], trace: &Trace, target: f64) -> Vec<f64> {
        let layout = Layout::new(&self.params);
        let units = layout.units;
        let mut grad = vec![0.0; layout.total()];

        let dy = 2.0 * (trace.output - target);
        let last = &trace.hidden[trace.hidden.len() - 1];
        for u in 0..units {
            grad[layout.output() + u] = dy * last[u];
        }
        grad[layout.output_bias()] = dy;

        let out_w = &weights[layout.output()..layout.output_bias()];
        let dh: Vec<f64> = out_w.iter().map(|w| dy * w).collect();

        if layout.nn_type.is_recurrent() {
            self.backward_through_time(&layout, weights, window, trace, dh, &mut grad);
        } else {
            let activation = self.params.activation;
            for u in 0..units {
                let dz = dh[u] * activation.derivative(trace.pre[0][u]);
                for (i, &x) in window.iter().enumerate() {
                    grad[u * layout.inputs + i] = dz * x;
                }
                grad[layout.hidden_bias() + u] = dz;
            }
        }
        grad
    }

    fn backward_through_time(
        &self,
        layout: &Layout,
        weights: &[f64],
        window: &[f64],
        trace: &Trace,
        mut dh: Vec<f64>,
        grad: &mut [f64],
    ) {
        let units = layout.units;
        let activation = self.params.activation;
        // Gradient reaching the LSTM cell state from later steps
        let mut dc = vec![0.0; units];

        for t in (0..window.len()).rev() {
            let x = window[t];
            let pre = &trace.pre[t];
            let prev = &trace.hidden[t];

            dh = match layout.nn_type {
                NnType::Lstm => {
                    let c_prev = &trace.cells[t];
                    let c = &trace.cells[t + 1];
                    let mut dz = vec![0.0; 4 * units];
                    for u in 0..units {
                        let i = sigmoid(pre[LSTM_INPUT * units + u]);
                        let f = sigmoid(pre[LSTM_FORGET * units + u]);
                        let g_pre = pre[LSTM_CELL * units + u];
                        let g = activation.apply(g_pre);
                        let o = sigmoid(pre[LSTM_OUTPUT * units + u]);

                        let dcell = dc[u] + dh[u] * o * activation.derivative(c[u]);
                        dz[LSTM_INPUT * units + u] = dcell * g * i * (1.0 - i);
                        dz[LSTM_FORGET * units + u] = dcell * c_prev[u] * f * (1.0 - f);
                        dz[LSTM_CELL * units + u] = dcell * i * activation.derivative(g_pre);
                        dz[LSTM_OUTPUT * units + u] =
                            dh[u] * activation.apply(c[u]) * o * (1.0 - o);
                        dc[u] = dcell * f;
                    }
                    let mut dprev = vec![0.0; units];
                    for gate in 0..4 {
                        let block = &dz[gate * units..(gate + 1) * units];
                        let flow = accumulate_gate(layout, weights, grad, gate, block, x, prev);
                        add_into(&mut dprev, &flow);
                    }
                    dprev
                }
                NnType::Gru => {
                    let reset: Vec<f64> = (0..units)
                        .map(|u| sigmoid(pre[GRU_RESET * units + u]))
                        .collect();
                    let reset_prev: Vec<f64> =
                        reset.iter().zip(prev).map(|(r, h)| r * h).collect();

                    let mut dprev = vec![0.0; units];
                    let mut dupdate = vec![0.0; units];
                    let mut dcandidate = vec![0.0; units];
                    for u in 0..units {
                        let z = sigmoid(pre[GRU_UPDATE * units + u]);
                        let c_pre = pre[GRU_CANDIDATE * units + u];
                        let candidate = activation.apply(c_pre);
                        dprev[u] = dh[u] * z;
                        dupdate[u] = dh[u] * (prev[u] - candidate) * z * (1.0 - z);
                        dcandidate[u] = dh[u] * (1.0 - z) * activation.derivative(c_pre);
                    }

                    let dreset_prev = accumulate_gate(
                        layout,
                        weights,
                        grad,
                        GRU_CANDIDATE,
                        &dcandidate,
                        x,
                        &reset_prev,
                    );
                    let mut dreset = vec![0.0; units];
                    for u in 0..units {
                        dprev[u] += dreset_prev[u] * reset[u];
                        dreset[u] = dreset_prev[u] * prev[u] * reset[u] * (1.0 - reset[u]);
                    }

                    for (gate, dz) in [(GRU_UPDATE, &dupdate), (GRU_RESET, &dreset)] {
                        let flow = accumulate_gate(layout, weights, grad, gate, dz, x, prev);
                        add_into(&mut dprev, &flow);
                    }
                    dprev
                }
                NnType::Dense | NnType::Rnn => {
                    let dz: Vec<f64> = (0..units)
                        .map(|u| dh[u] * activation.derivative(pre[u]))
                        .collect();
                    accumulate_gate(layout, weights, grad, 0, &dz, x, prev)
                }
            };
        }
    }
}

impl Predictor for NeuralForecaster {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let n_inputs = self.params.n_inputs;
        if data.len() <= n_inputs {
            return Err(TsError::InsufficientData {
                required: n_inputs + 1,
                actual: data.len(),
            });
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(TsError::InvalidData(
                "Data contains NaN or infinite values".to_string(),
            ));
        }

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        self.scale_min = min;
        self.scale_range = if max - min > 1e-12 { max - min } else { 1.0 };

        let scaled: Vec<f64> = data.iter().map(|&x| self.scale(x)).collect();
        let mut order: Vec<usize> = (n_inputs..scaled.len()).collect();

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut weights = self.init_weights(&mut rng);
        let mut adam = Adam::new(weights.len(), self.params.learning_rate);
        let mut loss = 0.0;

        for _ in 0..self.params.epochs {
            order.shuffle(&mut rng);
            loss = 0.0;
            for &i in &order {
                let window = &scaled[i - n_inputs..i];
                let trace = self.forward(&weights, window);
                loss += (trace.output - scaled[i]).powi(2);
                let mut grad = self.backward(&weights, window, &trace, scaled[i]);
                clip_gradient(&mut grad);
                adam.update(&mut weights, &grad);
            }
            loss /= order.len() as f64;
        }

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(TsError::NumericalError(
                "Training diverged to non-finite weights".to_string(),
            ));
        }
        debug!(
            nn_type = %self.params.nn_type,
            epochs = self.params.epochs,
            samples = order.len(),
            loss,
            "neural forecaster trained"
        );

        self.weights = weights;
        self.tail = data[data.len() - n_inputs..].to_vec();
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        self.forecast_from(&self.tail, steps)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

impl HistoryForecaster for NeuralForecaster {
    fn forecast_from(&self, history: &[f64], steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(TsError::NotFitted);
        }
        let n_inputs = self.params.n_inputs;
        if history.len() < n_inputs {
            return Err(TsError::InsufficientData {
                required: n_inputs,
                actual: history.len(),
            });
        }

        let mut window: Vec<f64> = history[history.len() - n_inputs..]
            .iter()
            .map(|&x| self.scale(x))
            .collect();
        let mut forecasts = Vec::with_capacity(steps);
        for _ in 0..steps {
            let next = self.forward(&self.weights, &window).output;
            window.remove(0);
            window.push(next);
            forecasts.push(self.unscale(next));
        }

        if forecasts.iter().any(|x| !x.is_finite()) {
            return Err(TsError::NumericalError(
                "Forecast produced non-finite values".to_string(),
            ));
        }
        Ok(forecasts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params(nn_type: NnType) -> NeuralParams {
        NeuralParams {
            nn_type,
            n_units: 8,
            activation: Activation::Tanh,
            epochs: 200,
            n_inputs: 4,
            learning_rate: 0.01,
            seed: 7,
        }
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 20.0 + 10.0 * (i as f64 * std::f64::consts::FRAC_PI_4).sin())
            .collect()
    }

    #[test]
    fn test_layout_sizes() {
        let dense = NeuralForecaster::new(NeuralParams {
            nn_type: NnType::Dense,
            n_units: 4,
            n_inputs: 3,
            ..NeuralParams::default()
        })
        .unwrap();
        // 4x3 + 4 + 4 + 1
        assert_eq!(dense.weight_count(), 21);

        let rnn = NeuralForecaster::new(NeuralParams {
            nn_type: NnType::Rnn,
            n_units: 4,
            n_inputs: 3,
            ..NeuralParams::default()
        })
        .unwrap();
        // 4 + 4x4 + 4 + 4 + 1
        assert_eq!(rnn.weight_count(), 29);

        let lstm = NeuralForecaster::new(NeuralParams {
            nn_type: NnType::Lstm,
            n_units: 4,
            n_inputs: 3,
            ..NeuralParams::default()
        })
        .unwrap();
        // 4 gates: 16 + 16x4 + 16, then 4 + 1
        assert_eq!(lstm.weight_count(), 101);

        let gru = NeuralForecaster::new(NeuralParams {
            nn_type: NnType::Gru,
            n_units: 4,
            n_inputs: 3,
            ..NeuralParams::default()
        })
        .unwrap();
        // 3 gates: 12 + 12x4 + 12, then 4 + 1
        assert_eq!(gru.weight_count(), 77);
    }

    fn squared_error(
        model: &NeuralForecaster,
        weights: &[f64],
        window: &[f64],
        target: f64,
    ) -> f64 {
        (model.forward(weights, window).output - target).powi(2)
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let window = [0.2, 0.7, 0.4, 0.9];
        let target = 0.5;
        let eps = 1e-6;

        for nn_type in [NnType::Dense, NnType::Rnn, NnType::Lstm, NnType::Gru] {
            let model = NeuralForecaster::new(NeuralParams {
                nn_type,
                n_units: 3,
                activation: Activation::Tanh,
                n_inputs: 4,
                ..NeuralParams::default()
            })
            .unwrap();
            let mut rng = StdRng::seed_from_u64(11);
            let weights = model.init_weights(&mut rng);
            let trace = model.forward(&weights, &window);
            let grad = model.backward(&weights, &window, &trace, target);

            for k in 0..weights.len() {
                let mut plus = weights.clone();
                plus[k] += eps;
                let mut minus = weights.clone();
                minus[k] -= eps;
                let numeric = (squared_error(&model, &plus, &window, target)
                    - squared_error(&model, &minus, &window, target))
                    / (2.0 * eps);
                assert!(
                    (numeric - grad[k]).abs() < 1e-6 * (1.0 + numeric.abs()),
                    "{} weight {}: analytic {} numeric {}",
                    nn_type,
                    k,
                    grad[k],
                    numeric
                );
            }
        }
    }

    #[test]
    fn test_adam_step_and_long_runs() {
        let mut adam = Adam::new(1, 0.01);
        let mut weights = [1.0];

        // The bias-corrected first step moves by the learning rate
        adam.update(&mut weights, &[4.0]);
        assert!((weights[0] - 0.99).abs() < 1e-9);

        // Correction powers decay towards zero instead of overflowing a counter
        for _ in 0..200_000 {
            adam.update(&mut weights, &[1.0]);
        }
        assert!(weights[0].is_finite());
        assert!(weights[0] < -1000.0);
        assert!(adam.beta1_t >= 0.0 && adam.beta2_t < 1e-12);
    }

    #[test]
    fn test_validate_rejects_inconsistent_state() {
        let mut model = NeuralForecaster::new(small_params(NnType::Gru)).unwrap();
        assert!(model.validate().is_ok());
        model.fit(&wave(30)).unwrap();
        assert!(model.validate().is_ok());

        let mut truncated = model.clone();
        truncated.weights.clear();
        assert!(matches!(truncated.validate(), Err(TsError::InvalidData(_))));

        let mut short_window = model.clone();
        short_window.tail.pop();
        assert!(short_window.validate().is_err());

        let mut flat = model.clone();
        flat.scale_range = 0.0;
        assert!(flat.validate().is_err());

        let mut bad_params = model;
        bad_params.params.n_units = 0;
        assert!(bad_params.validate().is_err());
    }

    #[test]
    fn test_gated_cells_learn_wave() {
        let data = wave(80);
        let expected = &wave(88)[80..];
        for nn_type in [NnType::Lstm, NnType::Gru] {
            let mut model = NeuralForecaster::new(small_params(nn_type)).unwrap();
            model.fit(&data).unwrap();

            let forecast = model.predict(8).unwrap();
            assert!(forecast.iter().all(|x| x.is_finite()));
            let mae: f64 = forecast
                .iter()
                .zip(expected)
                .map(|(f, e)| (f - e).abs())
                .sum::<f64>()
                / 8.0;
            assert!(mae < 4.0, "{} mean absolute error {}", nn_type, mae);
        }
    }

    #[test]
    fn test_lstm_serde_roundtrip() {
        let mut model = NeuralForecaster::new(small_params(NnType::Lstm)).unwrap();
        model.fit(&wave(30)).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: NeuralForecaster = serde_json::from_str(&json).unwrap();
        assert!(restored.validate().is_ok());
        let before = model.predict(4).unwrap();
        let after = restored.predict(4).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_params() {
        let params = NeuralParams {
            n_units: 0,
            ..NeuralParams::default()
        };
        assert!(NeuralForecaster::new(params).is_err());

        let params = NeuralParams {
            learning_rate: -0.1,
            ..NeuralParams::default()
        };
        assert!(NeuralForecaster::new(params).is_err());
    }

    #[test]
    fn test_dense_learns_wave() {
        let data = wave(80);
        let mut model = NeuralForecaster::new(small_params(NnType::Dense)).unwrap();
        model.fit(&data).unwrap();

        let forecast = model.predict(8).unwrap();
        let expected = &wave(88)[80..];
        let mae: f64 = forecast
            .iter()
            .zip(expected)
            .map(|(f, e)| (f - e).abs())
            .sum::<f64>()
            / 8.0;
        assert!(mae < 3.0, "mean absolute error {}", mae);
    }

    #[test]
    fn test_rnn_forecast_shape() {
        let data = wave(60);
        let mut model = NeuralForecaster::new(small_params(NnType::Rnn)).unwrap();
        model.fit(&data).unwrap();

        let forecast = model.predict(10).unwrap();
        assert_eq!(forecast.len(), 10);
        assert!(forecast.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_constant_series() {
        let data = vec![5.0; 20];
        let mut model = NeuralForecaster::new(small_params(NnType::Dense)).unwrap();
        model.fit(&data).unwrap();
        for value in model.predict(3).unwrap() {
            assert!((value - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let data = wave(40);
        let mut a = NeuralForecaster::new(small_params(NnType::Rnn)).unwrap();
        let mut b = NeuralForecaster::new(small_params(NnType::Rnn)).unwrap();
        a.fit(&data).unwrap();
        b.fit(&data).unwrap();
        assert_eq!(a.predict(5).unwrap(), b.predict(5).unwrap());
    }

    #[test]
    fn test_insufficient_history() {
        let mut model = NeuralForecaster::new(small_params(NnType::Dense)).unwrap();
        assert!(matches!(
            model.fit(&[1.0, 2.0, 3.0, 4.0]),
            Err(TsError::InsufficientData { required: 5, .. })
        ));
        assert_eq!(model.predict(1), Err(TsError::NotFitted));

        model.fit(&wave(20)).unwrap();
        assert!(matches!(
            model.forecast_from(&[1.0, 2.0], 1),
            Err(TsError::InsufficientData { required: 4, .. })
        ));
    }

    #[test]
    fn test_default_params_train() {
        let data: Vec<f64> = (0..40).map(|i| 100.0 + (i % 7) as f64).collect();
        let mut model = NeuralForecaster::new(NeuralParams::default()).unwrap();
        model.fit(&data).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.predict(5).unwrap().len(), 5);
    }
}
