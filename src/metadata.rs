//! Typed access to the recorder's metadata.
//!
//! The recorder describes its acquisition settings in the `INFO` list of
//! each wave file. Older recordings of the averaging sketch only encode
//! them in the file name, e.g. `avrg-100kHz-12bit-convhigh-samplmed-avrg04.wav`,
//! so both sources are parsed here.

use crate::riff::InfoList;

use nom::{
    bytes::complete::{is_a, is_not, tag},
    character::complete::{char, digit1},
    combinator::{map_res, opt, rest},
    multi::separated_list1,
    number::complete::double,
    sequence::{preceded, tuple},
    Finish, IResult,
};

use std::path::Path;

/// Full-scale value of the integer samples; gains are given for it.
pub const FULL_SCALE: f64 = 32768.0;

/// Physical value of the full integer range, as stored in `GAIN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gain {
    /// Value of the full integer range.
    pub value: f64,
    /// Physical unit, e.g. `mV`.
    pub unit: String,
}

impl Gain {
    /// Physical units per integer step.
    pub fn scale(&self) -> f64 {
        self.value / FULL_SCALE
    }
}

fn gain(s: &str) -> IResult<&str, Gain> {
    let (unit, number) = map_res(is_a("0123456789.e"), str::parse::<f64>)(s)?;
    Ok((
        "",
        Gain {
            value: number,
            unit: unit.trim().to_owned(),
        },
    ))
}

impl std::str::FromStr for Gain {
    type Err = nom::error::Error<String>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match gain(s.trim()).finish() {
            Ok((_remaining, gain)) if !gain.unit.is_empty() => Ok(gain),
            Ok(_) => Err(nom::error::Error {
                input: s.to_owned(),
                code: nom::error::ErrorKind::Alpha,
            }),
            Err(nom::error::Error { input, code }) => Err(nom::error::Error {
                input: input.to_owned(),
                code,
            }),
        }
    }
}

/// The metadata entries the analysis tools care about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingInfo {
    /// Input pins of the channels, from `PINS`.
    pub pins: Vec<String>,
    /// From `GAIN`.
    pub gain: Option<Gain>,
    /// From `BITS`.
    pub bits: Option<String>,
    /// Conversion speed, from `CNVS`.
    pub conversion: Option<String>,
    /// Sampling speed, from `SMPS`.
    pub sampling: Option<String>,
    /// From `AVRG`.
    pub averaging: Option<String>,
    /// From `IBRD`.
    pub board: Option<String>,
    /// From `DTIM`.
    pub datetime: Option<String>,
    /// From `ISFT`.
    pub software: Option<String>,
}

impl From<&InfoList> for RecordingInfo {
    fn from(info: &InfoList) -> Self {
        let text = |id: &str| {
            info.get(id)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            pins: info
                .get("PINS")
                .map(|p| {
                    p.split(',')
                        .map(|s| s.trim().to_owned())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            gain: info.get("GAIN").and_then(|g| g.parse().ok()),
            bits: text("BITS"),
            conversion: text("CNVS"),
            sampling: text("SMPS"),
            averaging: text("AVRG"),
            board: text("IBRD"),
            datetime: text("DTIM"),
            software: text("ISFT"),
        }
    }
}

impl RecordingInfo {
    /// Plot title built from the acquisition settings, if they are known.
    pub fn title(&self, rate: f64) -> Option<String> {
        let bits = self.bits.as_ref()?;
        match (&self.conversion, &self.sampling, &self.averaging) {
            (Some(conversion), Some(sampling), Some(averaging)) => Some(format!(
                "{:.0}kHz @ {}bits: {} conversion, {} sampling, avrg={}",
                0.001 * rate,
                bits,
                conversion,
                sampling,
                averaging
            )),
            _ => Some(format!("{:.1}kHz@{}bits", 0.001 * rate, bits)),
        }
    }

    /// Name of channel `c`: its analog pin if known, its index otherwise.
    pub fn channel_label(&self, c: usize) -> String {
        self.pins.get(c).cloned().unwrap_or_else(|| c.to_string())
    }
}

/// Acquisition settings of the averaging sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSettings {
    /// Sampling rate in Hertz.
    pub rate: f64,
    /// Resolution of the converter in bits.
    pub bits: u16,
    /// Conversion speed of the converter.
    pub conversion: String,
    /// Sampling speed of the converter.
    pub sampling: String,
    /// Number of averaged conversions per sample.
    pub averaging: u32,
}

fn name_fields(s: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('-'), is_not("-"))(s)
}

fn rate_khz(s: &str) -> IResult<&str, f64> {
    double(s)
}

fn bits(s: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse::<u16>)(s)
}

fn averaging(s: &str) -> IResult<&str, u32> {
    preceded(tag("avrg"), map_res(digit1, str::parse::<u32>))(s)
}

fn conversion(s: &str) -> IResult<&str, &str> {
    preceded(tag("conv"), rest)(s)
}

fn sampling(s: &str) -> IResult<&str, &str> {
    preceded(tag("sampl"), rest)(s)
}

impl FileSettings {
    /// Parses `<prefix>-<rate>kHz-<bits>bit-conv<speed>-sampl<speed>-avrg<n>[-...]`.
    pub fn from_file_name(path: impl AsRef<Path>) -> Option<Self> {
        let stem = path.as_ref().file_stem()?.to_str()?;
        let (_, fields) = name_fields(stem).ok()?;
        if fields.len() < 6 {
            return None;
        }
        let (_, (rate, _)) = tuple((rate_khz, opt(tag("kHz"))))(fields[1]).ok()?;
        let (_, bits) = bits(fields[2]).ok()?;
        let (_, conversion) = conversion(fields[3]).ok()?;
        let (_, sampling) = sampling(fields[4]).ok()?;
        let (_, averaging) = averaging(fields[5]).ok()?;
        Some(Self {
            rate: 1000.0 * rate,
            bits,
            conversion: conversion.to_owned(),
            sampling: sampling.to_owned(),
            averaging,
        })
    }

    /// Builds the settings from the `INFO` metadata.
    pub fn from_info(info: &RecordingInfo, rate: f64) -> Option<Self> {
        Some(Self {
            rate,
            bits: info.bits.as_ref()?.trim().parse().ok()?,
            conversion: info.conversion.clone()?,
            sampling: info.sampling.clone()?,
            averaging: info.averaging.as_ref()?.trim().parse().ok()?,
        })
    }

    /// Metadata first, file name second.
    pub fn resolve(path: impl AsRef<Path>, info: &RecordingInfo, rate: f64) -> Option<Self> {
        Self::from_info(info, rate).or_else(|| Self::from_file_name(path))
    }

    /// Figure title in the form used throughout the analysis plots.
    pub fn title(&self) -> String {
        format!(
            "{:.0}kHz @ {}bits: {} conversion, {} sampling, avrg={}",
            0.001 * self.rate,
            self.bits,
            self.conversion,
            self.sampling,
            self.averaging
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_with_unit() {
        let g: Gain = "20.0mV".parse().unwrap();
        assert_eq!(g.value, 20.0);
        assert_eq!(g.unit, "mV");
        assert_eq!(g.scale(), 20.0 / 32768.0);
    }

    #[test]
    fn gain_with_exponent() {
        let g: Gain = "1.5e3uV".parse().unwrap();
        assert_eq!(g.value, 1500.0);
        assert_eq!(g.unit, "uV");
    }

    #[test]
    fn gain_without_unit_is_rejected() {
        assert!("42".parse::<Gain>().is_err());
        assert!("mV".parse::<Gain>().is_err());
    }

    #[test]
    fn info_to_recording_info() {
        let info = InfoList::new()
            .with("PINS", "A4,A5, A6")
            .with("GAIN", "1.65V")
            .with("BITS", "12")
            .with("CNVS", "high")
            .with("SMPS", "veryhigh")
            .with("AVRG", "4");
        let ri = RecordingInfo::from(&info);
        assert_eq!(ri.pins, vec!["A4", "A5", "A6"]);
        assert_eq!(ri.gain.as_ref().map(|g| g.unit.as_str()), Some("V"));
        assert_eq!(ri.channel_label(2), "A6");
        assert_eq!(ri.channel_label(3), "3");
        assert_eq!(
            ri.title(100_000.0).unwrap(),
            "100kHz @ 12bits: high conversion, veryhigh sampling, avrg=4"
        );
        let settings = FileSettings::from_info(&ri, 100_000.0).unwrap();
        assert_eq!(settings.averaging, 4);
        assert_eq!(settings.title(), ri.title(100_000.0).unwrap());
    }

    #[test]
    fn short_title_with_bits_only() {
        let ri = RecordingInfo {
            bits: Some("16".to_owned()),
            ..RecordingInfo::default()
        };
        assert_eq!(ri.title(44_100.0).unwrap(), "44.1kHz@16bits");
        assert_eq!(RecordingInfo::default().title(44_100.0), None);
    }

    #[test]
    fn settings_from_file_name() {
        let s = FileSettings::from_file_name(
            "data/avrg-100kHz-12bit-convhigh-samplveryhigh-avrg04-2021-06-05.wav",
        )
        .unwrap();
        assert_eq!(
            s,
            FileSettings {
                rate: 100_000.0,
                bits: 12,
                conversion: "high".to_owned(),
                sampling: "veryhigh".to_owned(),
                averaging: 4,
            }
        );
    }

    #[test]
    fn unrelated_file_name() {
        assert_eq!(FileSettings::from_file_name("recording-2021.wav"), None);
        assert_eq!(
            FileSettings::from_file_name("a-b-c-d-e-f.wav"),
            None
        );
    }

    #[test]
    fn metadata_wins_over_file_name() {
        let ri = RecordingInfo::from(
            &InfoList::new()
                .with("BITS", "16")
                .with("CNVS", "low")
                .with("SMPS", "low")
                .with("AVRG", "1"),
        );
        let s = FileSettings::resolve(
            "avrg-100kHz-12bit-convhigh-samplhigh-avrg04.wav",
            &ri,
            48_000.0,
        )
        .unwrap();
        assert_eq!(s.bits, 16);
        assert_eq!(s.rate, 48_000.0);
    }
}
