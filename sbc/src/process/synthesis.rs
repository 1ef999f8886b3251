//! Polyphase synthesis filterbank, the inverse of [`Analysis`](super::analysis::Analysis).
//!
//! Per block and channel the M sub-band samples are matrixed into 2·M new
//! history entries. M PCM samples are then read out of the 20·M history through
//! the prototype window scaled by −M.

use std::f64::consts::PI;

use crate::structs::frame::MAX_CHANNELS;
use crate::utils::numeric::Backend;
use crate::utils::ring::History;
use crate::utils::tables::prototype;

#[derive(Debug)]
pub struct Synthesis<B: Backend> {
    subbands: usize,
    window: Vec<B::Coeff>,
    /// `2M × M`, row-major by history position.
    matrix: Vec<B::Coeff>,
    history: [History<B::Sample>; MAX_CHANNELS],
}

impl<B: Backend> Synthesis<B> {
    pub fn new(subbands: usize) -> Self {
        let m = subbands;
        let window = prototype(m)
            .iter()
            .map(|&c| B::coeff(-(m as f64) * c))
            .collect();

        let mut matrix = Vec::with_capacity(2 * m * m);
        for k in 0..2 * m {
            for i in 0..m {
                let phase = (i as f64 + 0.5) * (k as f64 + m as f64 / 2.0) * PI / m as f64;
                matrix.push(B::coeff(phase.cos()));
            }
        }

        Self {
            subbands: m,
            window,
            matrix,
            history: [History::new(20 * m), History::new(20 * m)],
        }
    }

    pub fn subbands(&self) -> usize {
        self.subbands
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(History::clear);
    }

    /// Reconstructs M PCM samples of `channel` from one block of sub-band samples.
    pub fn process(&mut self, channel: usize, subband_samples: &[B::Sample], pcm: &mut [i16]) {
        let m = self.subbands;
        let v = &mut self.history[channel];

        v.shift(2 * m);
        for k in 0..2 * m {
            let row = &self.matrix[k * m..(k + 1) * m];
            let value = row
                .iter()
                .zip(&subband_samples[..m])
                .fold(B::Sample::default(), |acc, (&c, &s)| acc + B::mul_scale(s, c));
            v.set(k, value);
        }

        for (j, pcm) in pcm[..m].iter_mut().enumerate() {
            let acc = (0..10).fold(B::Sample::default(), |acc, i| {
                let n = j + m * i;
                acc + B::mul_scale(v.get(Self::history_position(m, n)), self.window[n])
            });
            *pcm = B::to_pcm(acc);
        }
    }

    /// Maps window tap `n` onto the history: taps alternate between the first
    /// and last M entries of each 4·M group.
    #[inline(always)]
    fn history_position(m: usize, n: usize) -> usize {
        let group = n / (2 * m);
        let offset = n % (2 * m);
        if offset < m {
            group * 4 * m + offset
        } else {
            group * 4 * m + 2 * m + offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::analysis::Analysis;
    use crate::utils::numeric::{Fixed, Float};

    #[test]
    fn history_gathers_outer_quarters() {
        let m = 4;
        let positions: Vec<_> = (0..4 * m)
            .map(|n| Synthesis::<Float>::history_position(m, n))
            .collect();
        assert_eq!(
            positions,
            [0, 1, 2, 3, 12, 13, 14, 15, 16, 17, 18, 19, 28, 29, 30, 31]
        );
    }

    fn reconstruction_error<B: Backend>(subbands: usize, delay: usize) -> f64 {
        let mut analysis = Analysis::<B>::new(subbands);
        let mut synthesis = Synthesis::<B>::new(subbands);
        let mut input = Vec::new();
        let mut output = Vec::new();
        let mut sub = vec![B::Sample::default(); subbands];
        let mut pcm = vec![0i16; subbands];

        for block in 0..120 {
            let samples: Vec<i16> = (0..subbands)
                .map(|n| {
                    let t = (block * subbands + n) as f64 / 44100.0;
                    (10000.0 * (2.0 * PI * 440.0 * t).sin()).round() as i16
                })
                .collect();
            analysis.process(0, &samples, &mut sub);
            synthesis.process(0, &sub, &mut pcm);
            input.extend_from_slice(&samples);
            output.extend_from_slice(&pcm);
        }

        (200..input.len() - delay)
            .map(|n| (output[n + delay] as f64 - input[n] as f64).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn filterbank_reconstructs_delayed_input() {
        assert!(reconstruction_error::<Float>(4, 37) < 20.0);
        assert!(reconstruction_error::<Float>(8, 73) < 40.0);
        assert!(reconstruction_error::<Fixed>(4, 37) < 20.0);
        assert!(reconstruction_error::<Fixed>(8, 73) < 40.0);
    }
}
