//! Polyphase analysis filterbank.
//!
//! Each call consumes M new PCM samples of one channel and produces one block of
//! M sub-band samples:
//!
//! 1. age the 10·M sample history by M and insert the new samples, newest at
//!    position 0
//! 2. window the history with the prototype filter and fold it into 2·M partial
//!    sums
//! 3. project the partial sums onto M cosine-modulated basis vectors

use std::f64::consts::PI;

use crate::structs::frame::MAX_CHANNELS;
use crate::utils::numeric::Backend;
use crate::utils::ring::History;
use crate::utils::tables::prototype;

#[derive(Debug)]
pub struct Analysis<B: Backend> {
    subbands: usize,
    window: Vec<B::Coeff>,
    /// `M × 2M`, row-major by sub-band.
    matrix: Vec<B::Coeff>,
    history: [History<B::Sample>; MAX_CHANNELS],
}

impl<B: Backend> Analysis<B> {
    pub fn new(subbands: usize) -> Self {
        let m = subbands;
        let window = prototype(m).iter().map(|&c| B::coeff(c)).collect();

        let mut matrix = Vec::with_capacity(m * 2 * m);
        for k in 0..m {
            for i in 0..2 * m {
                let phase = (k as f64 + 0.5) * (i as f64 - m as f64 / 2.0) * PI / m as f64;
                matrix.push(B::coeff(phase.cos()));
            }
        }

        Self {
            subbands: m,
            window,
            matrix,
            history: [History::new(10 * m), History::new(10 * m)],
        }
    }

    pub fn subbands(&self) -> usize {
        self.subbands
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(History::clear);
    }

    /// Filters `pcm` (M samples of `channel`, oldest first) into `out`.
    pub fn process(&mut self, channel: usize, pcm: &[i16], out: &mut [B::Sample]) {
        let m = self.subbands;
        let x = &mut self.history[channel];

        x.shift(m);
        for (i, &sample) in pcm[..m].iter().enumerate() {
            x.set(m - 1 - i, B::from_pcm(sample));
        }

        let mut y = [B::Sample::default(); 16];
        for (i, y) in y[..2 * m].iter_mut().enumerate() {
            *y = (0..5).fold(B::Sample::default(), |acc, j| {
                let k = i + 2 * m * j;
                acc + B::mul_scale(x.get(k), self.window[k])
            });
        }

        for (k, out) in out[..m].iter_mut().enumerate() {
            let row = &self.matrix[k * 2 * m..(k + 1) * 2 * m];
            *out = row
                .iter()
                .zip(&y[..2 * m])
                .fold(B::Sample::default(), |acc, (&c, &y)| acc + B::mul_scale(y, c));
        }
    }
}
