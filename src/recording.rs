//! Loading and writing multi-channel sample buffers.
//!
//! A [`Recording`] holds interleaved integer samples (frames × channels)
//! together with the sampling rate, the sample width and the `INFO`
//! metadata of the file it came from. Recordings come either from PCM WAV
//! files, read with hound, or from raw dumps of little-endian `i16` frames
//! behind a fixed header offset.

use crate::riff::{self, InfoList};
use crate::TransposableIter;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};

use std::{
    borrow::Cow,
    fmt,
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

/// Everything that can go wrong while reading or writing a [`Recording`].
#[derive(Debug)]
pub enum RecordingError {
    /// Returned when io fails when reading or writing files.
    IoError(io::Error),

    /// Returned when hound fails to decode or encode the wave data.
    HoundError(hound::Error),

    /// Returned when the RIFF chunk structure cannot be walked.
    Riff(String),

    /// Returned for files without a single complete frame.
    Empty,

    /// Returned for wave files that do not hold integer PCM samples.
    UnsupportedFormat(String),

    /// Returned when a channel beyond the recorded ones is requested.
    MissingChannel {
        /// The requested channel.
        channel: usize,
        /// Number of channels in the recording.
        channels: usize,
    },
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RecordingError as RE;
        let msg = match self {
            RE::IoError(error) => Cow::from(format!("io error: {}", error)),
            RE::HoundError(error) => Cow::from(format!("wave error: {}", error)),
            RE::Riff(msg) => Cow::from(format!("riff error: {}", msg)),
            RE::Empty => Cow::from("file is empty"),
            RE::UnsupportedFormat(msg) => Cow::from(format!("unsupported format: {}", msg)),
            RE::MissingChannel { channel, channels } => Cow::from(format!(
                "channel {} requested, but recording has only {} channels",
                channel, channels
            )),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for RecordingError {}

impl From<io::Error> for RecordingError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<hound::Error> for RecordingError {
    fn from(value: hound::Error) -> Self {
        match value {
            hound::Error::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof => Self::Empty,
            other => Self::HoundError(other),
        }
    }
}

/// Layout of a raw binary sample dump: interleaved little-endian `i16`
/// frames following a header of `offset` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct BinFormat {
    /// Bytes to skip at the start of the file.
    pub offset: u64,
    /// Number of interleaved channels.
    pub channels: usize,
    /// Sampling rate in Hertz.
    pub rate: f64,
}

impl Default for BinFormat {
    fn default() -> Self {
        Self {
            offset: 0,
            channels: 4,
            rate: 100_000.0,
        }
    }
}

/// Interleaved integer samples and their header metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Sampling rate in Hertz.
    pub rate: f64,
    /// Number of interleaved channels.
    pub channels: usize,
    /// Sample width in bits.
    pub bits: u16,
    /// Samples, frame after frame.
    pub samples: Vec<i32>,
    /// Metadata from the `INFO` list, empty for raw dumps.
    pub info: InfoList,
}

impl Recording {
    /// Loads `path` as a wave file, or as a raw dump when `bin` is given.
    pub fn load(path: impl AsRef<Path>, bin: Option<&BinFormat>) -> Result<Self, RecordingError> {
        match bin {
            Some(format) => Self::load_bin(path, format),
            None => Self::load_wave(path),
        }
    }

    /// Reads an integer PCM wave file including its `INFO` metadata.
    ///
    /// A data chunk that is cut short keeps all complete frames.
    pub fn load_wave(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let path = path.as_ref();
        let file_len = fs::metadata(path)?.len();
        if file_len == 0 {
            return Err(RecordingError::Empty);
        }

        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int {
            return Err(RecordingError::UnsupportedFormat(format!(
                "{} bit float samples",
                spec.bits_per_sample
            )));
        }
        let channels = spec.channels as usize;

        // the data size in the header is bogus in recordings that were cut short
        let sample_bytes = u64::from((spec.bits_per_sample + 7) / 8).max(1);
        let capacity = u64::from(reader.len()).min(file_len / sample_bytes);
        let mut samples = Vec::with_capacity(capacity as usize);
        for sample in reader.samples::<i32>() {
            match sample {
                Ok(s) => samples.push(s),
                Err(e) => {
                    warn!("{}: data chunk cut short ({})", path.display(), e);
                    break;
                }
            }
        }
        samples.truncate(samples.len() - samples.len() % channels.max(1));
        if samples.is_empty() {
            return Err(RecordingError::Empty);
        }

        let info = riff::read_info_path(path).unwrap_or_else(|e| {
            warn!("{}: failed to read metadata: {}", path.display(), e);
            InfoList::new()
        });
        debug!(
            "loaded {}: {} channels, {} bits, {} Hz, {} frames",
            path.display(),
            channels,
            spec.bits_per_sample,
            spec.sample_rate,
            samples.len() / channels
        );

        Ok(Self {
            rate: spec.sample_rate as f64,
            channels,
            bits: spec.bits_per_sample,
            samples,
            info,
        })
    }

    /// Reads a raw dump of little-endian `i16` frames. A trailing partial
    /// frame is dropped.
    pub fn load_bin(path: impl AsRef<Path>, format: &BinFormat) -> Result<Self, RecordingError> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(format.offset))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let frame_bytes = 2 * format.channels.max(1);
        let usable = buffer.len() - buffer.len() % frame_bytes;
        if usable == 0 {
            return Err(RecordingError::Empty);
        }
        let samples = buffer[..usable]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32)
            .collect();

        Ok(Self {
            rate: format.rate,
            channels: format.channels,
            bits: 16,
            samples,
            info: InfoList::new(),
        })
    }

    /// Builds a recording from per-channel columns, truncated to the
    /// shortest column.
    pub fn from_channels(rate: f64, bits: u16, columns: Vec<Vec<i32>>, info: InfoList) -> Self {
        let channels = columns.len();
        let samples = columns.into_iter().transpose().flatten().collect();
        Self {
            rate,
            channels,
            bits,
            samples,
            info,
        }
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.rate
    }

    /// A copy of the samples of channel `c`.
    pub fn channel(&self, c: usize) -> Result<Vec<i32>, RecordingError> {
        if c >= self.channels {
            return Err(RecordingError::MissingChannel {
                channel: c,
                channels: self.channels,
            });
        }
        Ok(self
            .samples
            .iter()
            .skip(c)
            .step_by(self.channels)
            .copied()
            .collect())
    }

    /// Channel `c` as floating point values.
    pub fn channel_f64(&self, c: usize) -> Result<Vec<f64>, RecordingError> {
        Ok(self.channel(c)?.into_iter().map(f64::from).collect())
    }

    /// All channels, de-interleaved.
    pub fn columns(&self) -> Vec<Vec<i32>> {
        (0..self.channels)
            .map(|c| {
                self.samples
                    .iter()
                    .skip(c)
                    .step_by(self.channels)
                    .copied()
                    .collect()
            })
            .collect()
    }

    /// Writes the recording as integer PCM wave file, followed by its
    /// `INFO` list if there is one.
    pub fn write_wave(&self, path: impl AsRef<Path>) -> Result<(), RecordingError> {
        let path = path.as_ref();
        let spec = WavSpec {
            channels: self.channels as u16,
            sample_rate: self.rate.round() as u32,
            bits_per_sample: self.bits,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        if !self.info.is_empty() {
            riff::append_info(path, &self.info)?;
        }
        Ok(())
    }
}
