//! Synthetic multi-channel recordings for trying out the analysis tools
//! without recorder hardware.

use crate::riff::InfoList;
use crate::recording::Recording;

use rand::prelude::*;
use std::f64::consts::PI;

/// Sine waves of increasing frequency plus uniform noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestSignal {
    /// Sampling rate in Hertz.
    pub rate: f64,
    /// Number of channels.
    pub channels: usize,
    /// Sample width, 8 to 32 bits.
    pub bits: u16,
    /// Duration in seconds.
    pub duration: f64,
    /// Sine amplitude relative to the full integer range.
    pub amplitude: f64,
    /// Noise amplitude relative to the full integer range.
    pub noise: f64,
    /// Frequency of the first channel, channel `c` runs at `(c + 1)` times it.
    pub frequency: f64,
}

impl Default for TestSignal {
    fn default() -> Self {
        Self {
            rate: 44100.0,
            channels: 4,
            bits: 16,
            duration: 1.0,
            amplitude: 0.5,
            noise: 0.01,
            frequency: 500.0,
        }
    }
}

impl TestSignal {
    fn full_scale(&self) -> f64 {
        2f64.powi(i32::from(self.bits.clamp(8, 32)) - 1)
    }

    /// Metadata describing the generated signal.
    pub fn info(&self) -> InfoList {
        let pins: Vec<String> = (0..self.channels).map(|c| format!("A{}", c)).collect();
        InfoList::new()
            .with("PINS", pins.join(","))
            .with("BITS", self.bits.to_string())
            .with("GAIN", "1000.0mV")
            .with("ISFT", concat!("teerec-utils ", env!("CARGO_PKG_VERSION")))
    }

    /// Generates the recording with a randomly seeded generator.
    pub fn generate(&self) -> Recording {
        self.generate_with(&mut thread_rng())
    }

    /// Generates the recording with the noise drawn from `rng`.
    pub fn generate_with<R: Rng>(&self, rng: &mut R) -> Recording {
        let frames = (self.duration * self.rate).round().max(0.0) as usize;
        let full = self.full_scale();
        let (lo, hi) = (-full, full - 1.0);
        let columns = (0..self.channels)
            .map(|c| {
                let freq = (c + 1) as f64 * self.frequency;
                (0..frames)
                    .map(|i| {
                        let t = i as f64 / self.rate;
                        let mut v = self.amplitude * (2.0 * PI * freq * t).sin();
                        if self.noise > 0.0 {
                            v += rng.gen_range(-self.noise..self.noise);
                        }
                        (v * full).round().clamp(lo, hi) as i32
                    })
                    .collect()
            })
            .collect();
        Recording::from_channels(self.rate, self.bits, columns, self.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectra::{spectra_figure, SpectraOptions};
    use rand::rngs::StdRng;
    use std::path::Path;

    #[test]
    fn layout_and_metadata() {
        let signal = TestSignal {
            rate: 1000.0,
            channels: 3,
            duration: 0.5,
            ..TestSignal::default()
        };
        let rec = signal.generate_with(&mut StdRng::seed_from_u64(1));
        assert_eq!(rec.channels, 3);
        assert_eq!(rec.frames(), 500);
        assert_eq!(rec.info.get("PINS"), Some("A0,A1,A2"));
        assert_eq!(rec.info.get("BITS"), Some("16"));
        assert!(rec.info.get("ISFT").unwrap().starts_with("teerec-utils"));
    }

    #[test]
    fn overdriven_signal_is_clipped() {
        let signal = TestSignal {
            rate: 1000.0,
            channels: 1,
            amplitude: 2.0,
            noise: 0.0,
            frequency: 10.0,
            ..TestSignal::default()
        };
        let data = signal.generate().channel(0).unwrap();
        assert_eq!(data.iter().max(), Some(&32767));
        assert_eq!(data.iter().min(), Some(&-32768));
    }

    #[test]
    fn channels_carry_harmonics() {
        let signal = TestSignal {
            rate: 48000.0,
            channels: 2,
            frequency: 1000.0,
            ..TestSignal::default()
        };
        let rec = signal.generate_with(&mut StdRng::seed_from_u64(7));
        let (_, peaks) =
            spectra_figure(Path::new("test.wav"), &rec, &SpectraOptions::default()).unwrap();
        for (c, channel) in peaks.iter().enumerate() {
            let freq = (c + 1) as f64 * 1000.0;
            assert!(
                channel.freqs.iter().any(|f| (f - freq).abs() < 6.0),
                "{}",
                channel
            );
        }
    }
}
