//! Power spectral densities and peak detection.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Symmetric Hann window of length `n`.
pub fn hanning(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f64 / (n - 1) as f64).cos())
            .collect(),
    }
}

/// One-sided power spectral density.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Frequencies in Hertz, from zero to half the sampling rate.
    pub freqs: Vec<f64>,
    /// Power per Hertz.
    pub power: Vec<f64>,
}

impl Psd {
    /// Power in decibel relative to the full integer range:
    /// `10 log10(power / 2^14 / f_max)`.
    pub fn decibel(&self) -> Vec<f64> {
        let fmax = self.freqs.last().copied().unwrap_or(1.0);
        self.power
            .iter()
            .map(|p| 10.0 * (p / 16384.0 / fmax).log10())
            .collect()
    }

    /// Frequency resolution.
    pub fn resolution(&self) -> f64 {
        match self.freqs.as_slice() {
            [f0, f1, ..] => f1 - f0,
            _ => 0.0,
        }
    }
}

/// Welch estimate of the power spectral density of `data`.
///
/// Segments of `nfft` samples overlapping by `noverlap` are Hann-windowed
/// and their squared FFT magnitudes averaged. Data shorter than `nfft` is
/// zero padded. The result is scaled to a density: the sum over all bins
/// times the frequency resolution equals the mean power of the signal.
pub fn psd(data: &[f64], rate: f64, nfft: usize, noverlap: usize) -> Psd {
    assert!(nfft > 0 && noverlap < nfft, "invalid segment layout");

    let mut padded;
    let x = if data.len() < nfft {
        padded = data.to_vec();
        padded.resize(nfft, 0.0);
        padded.as_slice()
    } else {
        data
    };

    let window = hanning(nfft);
    let step = nfft - noverlap;
    let nseg = (x.len() - noverlap) / step;
    let nfreqs = nfft / 2 + 1;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nfft);
    let mut buffer = vec![Complex::new(0.0, 0.0); nfft];
    let mut power = vec![0.0; nfreqs];
    for segment in (0..nseg).map(|s| &x[s * step..s * step + nfft]) {
        for (b, (v, w)) in buffer.iter_mut().zip(segment.iter().zip(&window)) {
            *b = Complex::new(v * w, 0.0);
        }
        fft.process(&mut buffer);
        for (p, c) in power.iter_mut().zip(&buffer) {
            *p += c.norm_sqr();
        }
    }

    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let last_doubled = if nfft % 2 == 0 { nfreqs - 1 } else { nfreqs };
    for (k, p) in power.iter_mut().enumerate() {
        *p /= nseg as f64 * rate * window_power;
        if k > 0 && k < last_doubled {
            *p *= 2.0;
        }
    }

    let freqs = (0..nfreqs).map(|k| k as f64 * rate / nfft as f64).collect();
    Psd { freqs, power }
}

/// Detects peaks and troughs that stand out by at least `threshold`.
///
/// A running maximum becomes a peak as soon as the data drop `threshold`
/// below it, a running minimum becomes a trough as soon as they rise
/// `threshold` above it. Peaks and troughs therefore alternate.
pub fn detect_peaks(data: &[f64], threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let mut peaks = Vec::new();
    let mut troughs = Vec::new();
    let Some(&first) = data.first() else {
        return (peaks, troughs);
    };

    let mut direction = 0i8;
    let (mut min_idx, mut min_value) = (0, first);
    let (mut max_idx, mut max_value) = (0, first);
    for (idx, &value) in data.iter().enumerate() {
        match direction {
            1 => {
                if value > max_value {
                    max_idx = idx;
                    max_value = value;
                } else if max_value >= value + threshold {
                    peaks.push(max_idx);
                    min_idx = idx;
                    min_value = value;
                    direction = -1;
                }
            }
            -1 => {
                if value < min_value {
                    min_idx = idx;
                    min_value = value;
                } else if value >= min_value + threshold {
                    troughs.push(min_idx);
                    max_idx = idx;
                    max_value = value;
                    direction = 1;
                }
            }
            _ => {
                if max_value >= value + threshold {
                    direction = -1;
                } else if value >= min_value + threshold {
                    direction = 1;
                }
                if max_value < value {
                    max_idx = idx;
                    max_value = value;
                } else if value < min_value {
                    min_idx = idx;
                    min_value = value;
                }
            }
        }
    }
    (peaks, troughs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn hann_window_is_symmetric() {
        let w = hanning(5);
        assert_eq!(w.len(), 5);
        assert!(w[0].abs() < 1e-12 && w[4].abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert!((w[1] - w[3]).abs() < 1e-12);
        assert_eq!(hanning(1), vec![1.0]);
    }

    #[test]
    fn psd_layout() {
        let spec = psd(&vec![0.0; 1000], 1000.0, 256, 128);
        assert_eq!(spec.freqs.len(), 129);
        assert_eq!(spec.freqs[128], 500.0);
        assert!((spec.resolution() - 1000.0 / 256.0).abs() < 1e-12);
        assert!(spec.power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn psd_of_sine_peaks_at_its_frequency() {
        let rate = 48000.0;
        let spec = psd(&sine(1000.0, 1000.0, rate, 48000), rate, 8192, 4096);
        let (peak, _) = spec
            .power
            .iter()
            .enumerate()
            .fold((0, 0.0), |(bi, bp), (i, &p)| if p > bp { (i, p) } else { (bi, bp) });
        assert!((spec.freqs[peak] - 1000.0).abs() < spec.resolution());

        // density scaling: integrated power equals the mean square A²/2
        let total: f64 = spec.power.iter().sum::<f64>() * spec.resolution();
        assert!((total / 500_000.0 - 1.0).abs() < 0.02, "total power {}", total);
    }

    #[test]
    fn short_data_is_zero_padded() {
        let spec = psd(&sine(100.0, 1.0, 1000.0, 100), 1000.0, 512, 256);
        assert_eq!(spec.power.len(), 257);
        assert!(spec.power.iter().any(|&p| p > 0.0));
    }

    #[test]
    fn decibel_of_full_scale_reference() {
        let spec = Psd {
            freqs: vec![0.0, 500.0, 1000.0],
            power: vec![16384.0 * 1000.0, 16384.0 * 100.0, 0.0],
        };
        let db = spec.decibel();
        assert!(db[0].abs() < 1e-12);
        assert!((db[1] + 10.0).abs() < 1e-12);
        assert!(db[2].is_infinite());
    }

    #[test]
    fn peaks_and_troughs_alternate() {
        let data = [0.0, 1.0, 5.0, 2.0, 0.0, 3.0, 9.0, 1.0];
        let (peaks, troughs) = detect_peaks(&data, 2.0);
        assert_eq!(peaks, vec![2, 6]);
        assert_eq!(troughs, vec![4]);
    }

    #[test]
    fn small_wiggles_are_ignored() {
        let data = [0.0, 0.5, 0.2, 0.6, 0.1, 0.4];
        let (peaks, troughs) = detect_peaks(&data, 1.0);
        assert!(peaks.is_empty() && troughs.is_empty());
        assert_eq!(detect_peaks(&[], 1.0), (vec![], vec![]));
    }
}
