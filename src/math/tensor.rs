use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Dense 2-D numeric buffer: `rows × cols`, flat row-major storage.
///
/// Weight tensors for the parameter layers are laid out with the bias in
/// column 0, so a row reads `[bias, w_1, ..., w_n]`. The matrix-vector
/// helpers below honour that layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(rows: usize, cols: usize) -> Tensor {
        Tensor {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Tensor {
        Tensor {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Glorot initialization: uniform samples from `[-r, r]` with
    /// `r = sqrt(6 / (rows + cols))`.
    ///
    /// `cols` includes the bias column, so fan-in is counted the same way
    /// the forward pass sees it.
    pub fn glorot(rows: usize, cols: usize, rng: &mut StdRng) -> Tensor {
        let r = (6.0 / (rows + cols) as f64).sqrt();
        let mut res = Tensor::zeros(rows, cols);

        for w in res.data.iter_mut() {
            let mut sample = rng.gen::<f64>() * r;
            if rng.gen::<bool>() {
                sample = -sample;
            }
            *w = sample;
        }

        res
    }

    /// Total number of elements.
    pub fn n(&self) -> usize {
        self.data.len()
    }

    pub fn zero(&mut self) {
        for w in self.data.iter_mut() {
            *w = 0.0;
        }
    }

    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }

    /// Row slice without the bias column.
    pub fn row_weights(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols + 1..(row + 1) * self.cols]
    }

    /// `out[i] = W[i][0] + Σ_j W[i][j+1] · x[j]` — the bias-aware product
    /// used by every parameter layer's forward pass.
    ///
    /// `x` must be `cols - 1` long and `out` must be `rows` long.
    pub fn matvec_bias(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.cols - 1);
        debug_assert_eq!(out.len(), self.rows);

        for (i, o) in out.iter_mut().enumerate() {
            let row = &self.data[i * self.cols..(i + 1) * self.cols];
            let mut acc = row[0];
            for (w, xi) in row[1..].iter().zip(x.iter()) {
                acc += w * xi;
            }
            *o = acc;
        }
    }

    /// `out[j] = Σ_i W[i][j+1] · delta[i]` — pushes a delta back through the
    /// transposed weights, skipping the bias column, which has no input.
    pub fn transpose_matvec(&self, delta: &[f64], out: &mut [f64]) {
        debug_assert_eq!(delta.len(), self.rows);
        debug_assert_eq!(out.len(), self.cols - 1);

        for o in out.iter_mut() {
            *o = 0.0;
        }

        for (i, d) in delta.iter().enumerate() {
            let row = &self.data[i * self.cols + 1..(i + 1) * self.cols];
            for (o, w) in out.iter_mut().zip(row.iter()) {
                *o += w * d;
            }
        }
    }
}
