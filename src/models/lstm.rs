//! LSTM layer with backpropagation through time.
//!
//! Activations are laid out column-per-sample: an input step is `input_size × batch`,
//! hidden and cell states are `hidden_size × batch`. Gates are stacked in one
//! `4·hidden × batch` pre-activation in the order input, forget, cell, output:
//!
//! ```text
//! a_t = W_ih x_t + W_hh h_{t-1} + b_ih + b_hh
//! i = σ(a_i)   f = σ(a_f)   g = tanh(a_g)   o = σ(a_o)
//! c_t = f ⊙ c_{t-1} + i ⊙ g
//! h_t = o ⊙ tanh(c_t)
//! ```

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::distributions::Uniform;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    pub w_ih: DMatrix<f64>,
    pub w_hh: DMatrix<f64>,
    pub b_ih: DVector<f64>,
    pub b_hh: DVector<f64>,
}

/// Gate activations and states produced by one time step.
#[derive(Debug, Clone)]
struct Step {
    i: DMatrix<f64>,
    f: DMatrix<f64>,
    g: DMatrix<f64>,
    o: DMatrix<f64>,
    c: DMatrix<f64>,
    h: DMatrix<f64>,
}

#[derive(Debug, Clone)]
struct StepCache {
    x: DMatrix<f64>,
    h_prev: DMatrix<f64>,
    c_prev: DMatrix<f64>,
    step: Step,
}

/// Everything `backward` needs from a cached forward pass.
#[derive(Debug, Clone)]
pub struct LayerCache {
    steps: Vec<StepCache>,
}

#[derive(Debug, Clone)]
pub struct LstmGradients {
    pub w_ih: DMatrix<f64>,
    pub w_hh: DMatrix<f64>,
    pub b_ih: DVector<f64>,
    pub b_hh: DVector<f64>,
}

impl LstmLayer {
    /// New layer with every weight and bias drawn from U(-1/√hidden, 1/√hidden).
    pub fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let k = 1.0 / (hidden_size as f64).sqrt();
        let dist = Uniform::new_inclusive(-k, k);
        let gates = 4 * hidden_size;
        Self {
            input_size,
            hidden_size,
            w_ih: DMatrix::from_fn(gates, input_size, |_, _| rng.sample(dist)),
            w_hh: DMatrix::from_fn(gates, hidden_size, |_, _| rng.sample(dist)),
            b_ih: DVector::from_fn(gates, |_, _| rng.sample(dist)),
            b_hh: DVector::from_fn(gates, |_, _| rng.sample(dist)),
        }
    }

    fn step(&self, x: &DMatrix<f64>, h_prev: &DMatrix<f64>, c_prev: &DMatrix<f64>) -> Step {
        let h = self.hidden_size;
        let mut a = &self.w_ih * x + &self.w_hh * h_prev;
        let bias = &self.b_ih + &self.b_hh;
        for mut col in a.column_iter_mut() {
            col += &bias;
        }

        let i = a.rows(0, h).map(sigmoid);
        let f = a.rows(h, h).map(sigmoid);
        let g = a.rows(2 * h, h).map(f64::tanh);
        let o = a.rows(3 * h, h).map(sigmoid);

        let c = f.component_mul(c_prev) + i.component_mul(&g);
        let h_next = o.component_mul(&c.map(f64::tanh));

        Step { i, f, g, o, c, h: h_next }
    }

    /// Run the layer over a sequence starting from zero state and return the hidden
    /// state at every step.
    pub fn forward(&self, inputs: &[DMatrix<f64>]) -> Vec<DMatrix<f64>> {
        let batch = inputs.first().map_or(0, |x| x.ncols());
        let mut h = DMatrix::zeros(self.hidden_size, batch);
        let mut c = DMatrix::zeros(self.hidden_size, batch);
        let mut outputs = Vec::with_capacity(inputs.len());
        for x in inputs {
            let step = self.step(x, &h, &c);
            h = step.h;
            c = step.c;
            outputs.push(h.clone());
        }
        outputs
    }

    /// Like [`forward`](Self::forward), keeping the per-step activations for `backward`.
    pub fn forward_cached(&self, inputs: &[DMatrix<f64>]) -> (Vec<DMatrix<f64>>, LayerCache) {
        let batch = inputs.first().map_or(0, |x| x.ncols());
        let mut h = DMatrix::zeros(self.hidden_size, batch);
        let mut c = DMatrix::zeros(self.hidden_size, batch);
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut steps = Vec::with_capacity(inputs.len());
        for x in inputs {
            let step = self.step(x, &h, &c);
            outputs.push(step.h.clone());
            let next_h = step.h.clone();
            let next_c = step.c.clone();
            steps.push(StepCache {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                step,
            });
            h = next_h;
            c = next_c;
        }
        (outputs, LayerCache { steps })
    }

    /// Backpropagate through time.
    ///
    /// `dh_out[t]` is the loss gradient flowing into `h_t` from outside the
    /// recurrence (the next layer or the output head). Returns the parameter
    /// gradients and the gradient with respect to each input step.
    pub fn backward(&self, cache: &LayerCache, dh_out: &[DMatrix<f64>]) -> (LstmGradients, Vec<DMatrix<f64>>) {
        let h = self.hidden_size;
        let batch = dh_out.first().map_or(0, |d| d.ncols());

        let mut grads = LstmGradients {
            w_ih: DMatrix::zeros(4 * h, self.input_size),
            w_hh: DMatrix::zeros(4 * h, h),
            b_ih: DVector::zeros(4 * h),
            b_hh: DVector::zeros(4 * h),
        };
        let mut dx = vec![DMatrix::<f64>::zeros(self.input_size, batch); cache.steps.len()];
        let mut dh_next = DMatrix::<f64>::zeros(h, batch);
        let mut dc_next = DMatrix::<f64>::zeros(h, batch);

        for (t, sc) in cache.steps.iter().enumerate().rev() {
            let s = &sc.step;
            let dh = &dh_out[t] + &dh_next;
            let tanh_c = s.c.map(f64::tanh);

            let d_o = dh.component_mul(&tanh_c);
            let dc = &dc_next + dh.component_mul(&s.o).component_mul(&tanh_c.map(|v| 1.0 - v * v));

            let d_i = dc.component_mul(&s.g);
            let d_g = dc.component_mul(&s.i);
            let d_f = dc.component_mul(&sc.c_prev);
            dc_next = dc.component_mul(&s.f);

            let mut da = DMatrix::<f64>::zeros(4 * h, batch);
            da.rows_mut(0, h)
                .copy_from(&d_i.zip_map(&s.i, |d, v| d * v * (1.0 - v)));
            da.rows_mut(h, h)
                .copy_from(&d_f.zip_map(&s.f, |d, v| d * v * (1.0 - v)));
            da.rows_mut(2 * h, h)
                .copy_from(&d_g.zip_map(&s.g, |d, v| d * (1.0 - v * v)));
            da.rows_mut(3 * h, h)
                .copy_from(&d_o.zip_map(&s.o, |d, v| d * v * (1.0 - v)));

            grads.w_ih += &da * sc.x.transpose();
            grads.w_hh += &da * sc.h_prev.transpose();
            let db = da.column_sum();
            grads.b_ih += &db;
            grads.b_hh += &db;

            dx[t] = self.w_ih.tr_mul(&da);
            dh_next = self.w_hh.tr_mul(&da);
        }

        (grads, dx)
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn forward_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = LstmLayer::new(1, 6, &mut rng);
        let inputs = vec![DMatrix::from_element(1, 4, 0.1); 5];

        let outputs = layer.forward(&inputs);
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[4].shape(), (6, 4));
        // h = o * tanh(c) stays strictly inside (-1, 1).
        assert!(outputs.iter().flatten().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn cached_forward_matches_plain_forward() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(2, 3, &mut rng);
        let inputs: Vec<_> = (0..4)
            .map(|t| DMatrix::from_fn(2, 3, |r, c| (t + r + c) as f64 * 0.05))
            .collect();

        let plain = layer.forward(&inputs);
        let (cached, cache) = layer.forward_cached(&inputs);
        assert_eq!(plain, cached);
        assert_eq!(cache.steps.len(), 4);
    }

    #[test]
    fn weights_within_init_bound() {
        let mut rng = StdRng::seed_from_u64(2);
        let layer = LstmLayer::new(1, 50, &mut rng);
        let k = 1.0 / 50f64.sqrt();
        assert_eq!(layer.w_ih.shape(), (200, 1));
        assert_eq!(layer.w_hh.shape(), (200, 50));
        assert!(layer.w_hh.iter().all(|w| w.abs() <= k));
    }
}
