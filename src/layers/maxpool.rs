use serde::{Deserialize, Serialize};

/// Strided max-pool over `channels` equal-length input channels.
///
/// Non-parametric. The forward pass records, per output position, the linear
/// input index that produced the max (`source`); the backward pass routes the
/// upstream gradient only to those positions, zero elsewhere. Ties break to
/// the first occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvMaxPool {
    channels: usize,
    width: usize,
    stride: usize,
    in_width: usize,
    chan_len: usize,
    out_per_chan: usize,
    response: Vec<f64>,
    delta: Vec<f64>,
    source: Vec<usize>,
}

impl ConvMaxPool {
    /// `in_width` must be divisible by `channels`; the model checks this at
    /// assembly time.
    pub fn new(channels: usize, width: usize, stride: usize, in_width: usize) -> ConvMaxPool {
        let chan_len = in_width / channels;
        let out_per_chan = (chan_len - width) / stride + 1;
        let out = channels * out_per_chan;

        ConvMaxPool {
            channels,
            width,
            stride,
            in_width,
            chan_len,
            out_per_chan,
            response: vec![0.0; out],
            delta: vec![0.0; out],
            source: vec![0; out],
        }
    }

    pub fn out_width(&self) -> usize {
        self.channels * self.out_per_chan
    }

    pub fn response(&self) -> &[f64] {
        &self.response
    }

    pub fn delta_mut(&mut self) -> &mut [f64] {
        &mut self.delta
    }

    pub fn forward(&mut self, x: &[f64]) {
        for c in 0..self.channels {
            for p in 0..self.out_per_chan {
                let base = c * self.chan_len + p * self.stride;
                let mut best = x[base];
                let mut best_idx = base;
                for j in 1..self.width {
                    // Strict comparison keeps the first occurrence on ties.
                    if x[base + j] > best {
                        best = x[base + j];
                        best_idx = base + j;
                    }
                }
                let out = c * self.out_per_chan + p;
                self.response[out] = best;
                self.source[out] = best_idx;
            }
        }
    }

    /// Routes each output's gradient back to the input that won the max.
    pub fn propagate_delta(&self, out: &mut [f64]) {
        for o in out.iter_mut() {
            *o = 0.0;
        }
        for (d, &src) in self.delta.iter().zip(self.source.iter()) {
            out[src] += d;
        }
    }
}
