//! ToneSource - deterministic test tone generator
//!
//! Produces mono S16 buffers the way an audio test source does:
//! a phase accumulator advanced by `freq / sample_rate` per sample,
//! scaled by `volume`. White noise uses a fixed seed so runs repeat.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Waveform;
use crate::config::ToneConfig;
use crate::error::SinkError;

const NOISE_SEED: u64 = 42;

pub struct ToneSource {
    config: ToneConfig,
    /// Phase in cycles, kept in [0, 1)
    phase: f64,
    step: f64,
    produced: u64,
    rng: StdRng,
}

impl ToneSource {
    pub fn new(config: ToneConfig) -> Result<Self, SinkError> {
        validate(&config)?;
        let step = config.freq / f64::from(config.sample_rate);
        Ok(Self {
            config,
            phase: 0.0,
            step,
            produced: 0,
            rng: StdRng::seed_from_u64(NOISE_SEED),
        })
    }

    /// Buffers produced so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// True once `num_buffers` buffers have been produced
    pub fn is_eos(&self) -> bool {
        matches!(self.config.num_buffers, Some(n) if self.produced >= n)
    }

    /// Overwrite `buffer` with the next `samples_per_buffer` samples.
    ///
    /// Returns false at end of stream, leaving `buffer` untouched.
    pub fn fill(&mut self, buffer: &mut Vec<i16>) -> bool {
        if self.is_eos() {
            return false;
        }

        buffer.clear();
        for _ in 0..self.config.samples_per_buffer {
            let value = self.next_sample();
            buffer.push(to_s16(value));
        }
        self.produced += 1;
        true
    }

    fn next_sample(&mut self) -> f64 {
        let volume = self.config.volume;
        let value = match self.config.wave {
            Waveform::Sine => volume * (TAU * self.phase).sin(),
            Waveform::Square => {
                if self.phase < 0.5 {
                    volume
                } else {
                    -volume
                }
            }
            Waveform::Saw => volume * (2.0 * self.phase - 1.0),
            Waveform::Silence => 0.0,
            Waveform::WhiteNoise => self.rng.gen_range(-volume..=volume),
        };

        self.phase += self.step;
        self.phase -= self.phase.floor();
        value
    }
}

impl Iterator for ToneSource {
    type Item = Vec<i16>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = Vec::with_capacity(self.config.samples_per_buffer);
        self.fill(&mut buffer).then_some(buffer)
    }
}

fn to_s16(value: f64) -> i16 {
    (value * f64::from(i16::MAX))
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

fn validate(config: &ToneConfig) -> Result<(), SinkError> {
    let invalid = |what: &str| SinkError::Pipeline {
        src: "tonesrc".to_string(),
        error: format!("invalid {}", what),
        debug: None,
    };

    if config.sample_rate == 0 {
        return Err(invalid("sample rate"));
    }
    if config.samples_per_buffer == 0 {
        return Err(invalid("samples per buffer"));
    }
    if !(0.0..=1.0).contains(&config.volume) {
        return Err(invalid("volume"));
    }
    if !config.freq.is_finite() || config.freq < 0.0 {
        return Err(invalid("frequency"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rms_s16;

    fn tone(wave: Waveform) -> ToneConfig {
        ToneConfig {
            wave,
            freq: 1000.0,
            volume: 0.8,
            sample_rate: 8000,
            samples_per_buffer: 800,
            num_buffers: Some(4),
            sync: false,
        }
    }

    #[test]
    fn test_sine_rms_matches_amplitude() {
        let mut source = ToneSource::new(tone(Waveform::Sine)).unwrap();
        let buffer = source.next().unwrap();
        let rms = rms_s16(&buffer).unwrap();
        assert!((rms - 0.8 / 2f64.sqrt()).abs() < 1e-3, "rms {}", rms);
    }

    #[test]
    fn test_square_rms_equals_volume() {
        let mut source = ToneSource::new(tone(Waveform::Square)).unwrap();
        let rms = rms_s16(&source.next().unwrap()).unwrap();
        assert!((rms - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_silence_is_zero() {
        let mut source = ToneSource::new(tone(Waveform::Silence)).unwrap();
        assert!(source.next().unwrap().iter().all(|s| *s == 0));
    }

    #[test]
    fn test_white_noise_is_deterministic_and_bounded() {
        let a: Vec<i16> = ToneSource::new(tone(Waveform::WhiteNoise))
            .unwrap()
            .next()
            .unwrap();
        let b: Vec<i16> = ToneSource::new(tone(Waveform::WhiteNoise))
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(a, b);
        let limit = (0.8 * f64::from(i16::MAX)).round() as i16;
        assert!(a.iter().all(|s| s.abs() <= limit));
    }

    #[test]
    fn test_num_buffers_ends_stream() {
        let source = ToneSource::new(tone(Waveform::Sine)).unwrap();
        let buffers: Vec<_> = source.collect();
        assert_eq!(buffers.len(), 4);
        assert!(buffers.iter().all(|b| b.len() == 800));
    }

    #[test]
    fn test_unbounded_source_keeps_going() {
        let mut config = tone(Waveform::Sine);
        config.num_buffers = None;
        let source = ToneSource::new(config).unwrap();
        assert_eq!(source.take(10).count(), 10);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = tone(Waveform::Sine);
        config.sample_rate = 0;
        assert!(ToneSource::new(config).is_err());

        let mut config = tone(Waveform::Sine);
        config.volume = 1.5;
        assert!(ToneSource::new(config).is_err());
    }
}
