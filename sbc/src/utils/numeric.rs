//! Numeric back-ends for the filterbanks and the quantizer.
//!
//! Everything between PCM and the bitstream is written against [`Backend`], so
//! the encoder and decoder pick floating-point or fixed-point arithmetic at
//! compile time through a type parameter.

use std::fmt::Debug;
use std::ops::{Add, Sub};

/// Arithmetic used by the sub-band pipeline.
///
/// Sample values are expressed in PCM units: a full-scale 16-bit input maps to
/// magnitudes up to 32768 and a sub-band sample with scale factor `sf` lies in
/// `(-2^(sf+1), 2^(sf+1))`.
pub trait Backend: Debug + Default + Clone + Copy + Send + Sync + 'static {
    type Sample: Copy
        + Default
        + Debug
        + PartialEq
        + Send
        + Sync
        + Add<Output = Self::Sample>
        + Sub<Output = Self::Sample>;
    type Coeff: Copy + Default + Debug + Send + Sync;

    /// Converts a filter or matrix coefficient.
    fn coeff(value: f64) -> Self::Coeff;

    fn from_pcm(pcm: i16) -> Self::Sample;

    /// Multiplies a sample by a coefficient and rescales to sample precision.
    fn mul_scale(sample: Self::Sample, coeff: Self::Coeff) -> Self::Sample;

    /// Rounds to the nearest PCM value, saturating to 16 bits.
    fn to_pcm(sample: Self::Sample) -> i16;

    /// Integer part of the absolute value, in PCM units.
    fn magnitude(sample: Self::Sample) -> u32;

    fn halve(sample: Self::Sample) -> Self::Sample;

    /// Maps a sample onto a `bits` wide code under scale factor `scale_factor`.
    fn quantize(sample: Self::Sample, scale_factor: u8, bits: u8) -> u16;

    /// Inverse of [`Backend::quantize`]; a zero width yields silence.
    fn dequantize(code: u16, scale_factor: u8, bits: u8) -> Self::Sample;
}

/// Smallest scale factor index whose range `2^(sf+1)` covers `magnitude`.
#[inline]
pub fn scale_factor_index(magnitude: u32) -> u8 {
    (u32::BITS - magnitude.leading_zeros()).saturating_sub(1).min(15) as u8
}

#[inline(always)]
fn levels(bits: u8) -> u32 {
    (1u32 << bits) - 1
}

/// Single precision floating-point arithmetic.
#[derive(Debug, Default, Clone, Copy)]
pub struct Float;

impl Backend for Float {
    type Sample = f32;
    type Coeff = f32;

    fn coeff(value: f64) -> f32 {
        value as f32
    }

    #[inline(always)]
    fn from_pcm(pcm: i16) -> f32 {
        pcm as f32
    }

    #[inline(always)]
    fn mul_scale(sample: f32, coeff: f32) -> f32 {
        sample * coeff
    }

    #[inline(always)]
    fn to_pcm(sample: f32) -> i16 {
        sample.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }

    #[inline(always)]
    fn magnitude(sample: f32) -> u32 {
        sample.abs() as u32
    }

    #[inline(always)]
    fn halve(sample: f32) -> f32 {
        sample * 0.5
    }

    fn quantize(sample: f32, scale_factor: u8, bits: u8) -> u16 {
        if bits == 0 {
            return 0;
        }
        let range = (1u32 << (scale_factor + 1)) as f32;
        let levels = levels(bits) as f32;
        let code = ((sample / range + 1.0) * levels / 2.0).floor();

        code.clamp(0.0, levels) as u16
    }

    fn dequantize(code: u16, scale_factor: u8, bits: u8) -> f32 {
        if bits == 0 {
            return 0.0;
        }
        let range = (1u32 << (scale_factor + 1)) as f32;
        let levels = levels(bits) as f32;

        range * ((2.0 * code as f32 + 1.0) / levels - 1.0)
    }
}

/// 32-bit fixed-point arithmetic.
///
/// Samples carry [`Fixed::FRACT_BITS`] fractional bits, coefficients carry
/// [`Fixed::COEFF_BITS`]. Products are formed in 64 bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fixed;

impl Fixed {
    pub const FRACT_BITS: u32 = 6;
    pub const COEFF_BITS: u32 = 28;
}

impl Backend for Fixed {
    type Sample = i32;
    type Coeff = i32;

    fn coeff(value: f64) -> i32 {
        (value * (1u64 << Self::COEFF_BITS) as f64).round() as i32
    }

    #[inline(always)]
    fn from_pcm(pcm: i16) -> i32 {
        (pcm as i32) << Self::FRACT_BITS
    }

    #[inline(always)]
    fn mul_scale(sample: i32, coeff: i32) -> i32 {
        let product = sample as i64 * coeff as i64;
        ((product + (1 << (Self::COEFF_BITS - 1))) >> Self::COEFF_BITS) as i32
    }

    #[inline(always)]
    fn to_pcm(sample: i32) -> i16 {
        let rounded = (sample as i64 + (1 << (Self::FRACT_BITS - 1))) >> Self::FRACT_BITS;
        rounded.clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }

    #[inline(always)]
    fn magnitude(sample: i32) -> u32 {
        sample.unsigned_abs() >> Self::FRACT_BITS
    }

    #[inline(always)]
    fn halve(sample: i32) -> i32 {
        sample >> 1
    }

    fn quantize(sample: i32, scale_factor: u8, bits: u8) -> u16 {
        if bits == 0 {
            return 0;
        }
        let shift = scale_factor as u32 + 1 + Self::FRACT_BITS;
        let range = 1i64 << shift;
        let levels = levels(bits) as i64;
        let code = ((sample as i64 + range) * levels) >> (shift + 1);

        code.clamp(0, levels) as u16
    }

    fn dequantize(code: u16, scale_factor: u8, bits: u8) -> i32 {
        if bits == 0 {
            return 0;
        }
        let range = 1i64 << (scale_factor as u32 + 1 + Self::FRACT_BITS);
        let levels = levels(bits) as i64;

        (range * (2 * code as i64 + 1) / levels - range) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_covers_magnitude() {
        assert_eq!(scale_factor_index(0), 0);
        assert_eq!(scale_factor_index(1), 0);
        assert_eq!(scale_factor_index(2), 1);
        assert_eq!(scale_factor_index(3), 1);
        assert_eq!(scale_factor_index(32767), 14);
        assert_eq!(scale_factor_index(32768), 15);
        assert_eq!(scale_factor_index(u32::MAX), 15);

        for magnitude in [5u32, 100, 1000, 20000] {
            let sf = scale_factor_index(magnitude);
            assert!(1u32 << (sf + 1) > magnitude);
            assert!(sf == 0 || 1u32 << sf <= magnitude);
        }
    }

    fn round_trip_error<B: Backend>(value: i16, scale_factor: u8, bits: u8) -> f64 {
        let sample = B::from_pcm(value);
        let code = B::quantize(sample, scale_factor, bits);
        assert!(u32::from(code) <= levels(bits));
        let restored = B::dequantize(code, scale_factor, bits);
        (B::to_pcm(restored) as f64 - value as f64).abs()
    }

    #[test]
    fn quantizer_error_is_within_one_step() {
        for bits in [2u8, 4, 8, 12, 16] {
            for value in [-1000i16, -3, 0, 7, 999] {
                let sf = scale_factor_index(value.unsigned_abs() as u32);
                let step = (1u32 << (sf + 2)) as f64 / levels(bits) as f64;
                assert!(round_trip_error::<Float>(value, sf, bits) <= step + 0.5);
                assert!(round_trip_error::<Fixed>(value, sf, bits) <= step + 0.5);
            }
        }
    }

    #[test]
    fn silence_survives_quantization() {
        for bits in 0u8..=16 {
            assert_eq!(Float::dequantize(Float::quantize(0.0, 0, bits), 0, bits), 0.0);
            assert_eq!(Fixed::dequantize(Fixed::quantize(0, 0, bits), 0, bits), 0);
        }
    }

    #[test]
    fn fixed_pcm_conversion_saturates() {
        assert_eq!(Fixed::to_pcm(Fixed::from_pcm(-1234)), -1234);
        assert_eq!(Fixed::to_pcm(i32::MAX), i16::MAX);
        assert_eq!(Fixed::to_pcm(i32::MIN), i16::MIN);
        assert_eq!(Float::to_pcm(1.0e9), i16::MAX);
        assert_eq!(Float::to_pcm(-2.5), -3);
    }

    #[test]
    fn fixed_multiply_tracks_float() {
        let coeff = 0.294315332;
        let sample = Fixed::from_pcm(12000);
        let fixed = Fixed::to_pcm(Fixed::mul_scale(sample, Fixed::coeff(coeff)));
        let float = Float::to_pcm(Float::mul_scale(12000.0, Float::coeff(coeff)));
        assert!((fixed as i32 - float as i32).abs() <= 1);
    }
}
