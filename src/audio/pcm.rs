//! Canonical PCM byte helpers.

use crate::constants::SAMPLE_RATE;
use byteorder::{LittleEndian, WriteBytesExt};
use bytes::Bytes;

/// A stereo sample pair (left, right) as 16-bit signed integers.
pub type Sample = (i16, i16);

const AMPLITUDE: f64 = 0.5; // 50% amplitude

/// Packs interleaved stereo samples into little-endian canonical PCM.
pub fn samples_to_bytes(samples: &[Sample]) -> Bytes {
    let mut data: Vec<u8> = Vec::with_capacity(samples.len() * 4);

    for (left, right) in samples {
        WriteBytesExt::write_i16::<LittleEndian>(&mut data, *left).unwrap();
        WriteBytesExt::write_i16::<LittleEndian>(&mut data, *right).unwrap();
    }

    data.into()
}

/// Synthesizes a sine tone of `freq` Hz lasting `secs` seconds, in
/// canonical PCM.
pub fn sine(freq: f64, secs: f64) -> Bytes {
    let total = (secs * SAMPLE_RATE as f64) as usize;
    let mut samples: Vec<Sample> = Vec::with_capacity(total);
    let mut phase = 0.0;

    for _ in 0..total {
        let sample = sine_sample(phase);
        samples.push((sample, sample));

        phase += freq / SAMPLE_RATE as f64;
        phase %= 1.0;
    }

    samples_to_bytes(&samples)
}

fn sine_sample(phase: f64) -> i16 {
    let sample = (phase * std::f64::consts::PI * 2.0).sin();
    (sample * i16::MAX as f64 * AMPLITUDE) as i16
}
