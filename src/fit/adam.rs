//! Adam optimizer over a list of flat parameter buffers.
//!
//! ```text
//! m = β1·m + (1 - β1)·g
//! v = β2·v + (1 - β2)·g²
//! m̂ = m / (1 - β1^t)
//! v̂ = v / (1 - β2^t)
//! θ = θ - lr · m̂ / (√v̂ + ε)
//! ```

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    /// First moment per parameter buffer; sized lazily on the first step.
    m: Vec<Vec<f64>>,
    /// Second moment per parameter buffer.
    v: Vec<Vec<f64>>,
    t: i32,
}

impl Adam {
    /// Adam with the usual defaults (β1 0.9, β2 0.999, ε 1e-8).
    pub fn new(learning_rate: f64) -> Self {
        Self::with_params(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn with_params(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update. `params[k]` and `grads[k]` must have equal lengths, and the
    /// buffer layout must stay the same across calls.
    pub fn step(&mut self, params: &mut [&mut [f64]], grads: &[&[f64]]) {
        debug_assert_eq!(params.len(), grads.len());
        if self.m.is_empty() {
            self.m = grads.iter().map(|g| vec![0.0; g.len()]).collect();
            self.v = grads.iter().map(|g| vec![0.0; g.len()]).collect();
        }

        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for (k, (param, grad)) in params.iter_mut().zip(grads).enumerate() {
            let m = &mut self.m[k];
            let v = &mut self.v[k];
            for i in 0..grad.len() {
                let g = grad[i];
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
                let m_hat = m[i] / bias1;
                let v_hat = v[i] / bias2;
                param[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_each_weight_by_lr() {
        // With bias correction, the first update is lr * g / (|g| + ε) ≈ lr * sign(g).
        let mut adam = Adam::new(0.01);
        let mut a = vec![1.0, 2.0];
        let mut b = vec![-1.0];
        let ga = vec![0.5, -3.0];
        let gb = vec![1e-3];

        adam.step(&mut [a.as_mut_slice(), b.as_mut_slice()], &[ga.as_slice(), gb.as_slice()]);

        assert!((a[0] - 0.99).abs() < 1e-8);
        assert!((a[1] - 2.01).abs() < 1e-8);
        assert!((b[0] + 1.01).abs() < 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn minimizes_a_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut x = vec![5.0];
        for _ in 0..500 {
            let g = vec![2.0 * (x[0] - 1.5)];
            adam.step(&mut [x.as_mut_slice()], &[g.as_slice()]);
        }
        assert!((x[0] - 1.5).abs() < 5e-2, "x = {}", x[0]);
    }
}
