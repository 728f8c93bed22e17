//! Merges single channels of several recordings into one multi-channel
//! recording.

use crate::recording::Recording;

use log::debug;

use std::cmp::Ordering;

/// Output channel `c` is channel `c` of the `c`-th recording.
///
/// The first recording provides the sampling rate, the sample width, the
/// metadata and the channel layout. The result has one channel per
/// recording, at most as many as the first one has, and is as long as the
/// shortest recording. Channels of other sample widths are rescaled to the
/// width of the first recording. Mismatches are collected as warnings and
/// never abort the merge. Returns `None` for an empty list.
pub fn merge_channels(recordings: &[Recording]) -> Option<(Recording, Vec<String>)> {
    let (first, rest) = recordings.split_first()?;
    let mut warnings = Vec::new();
    let mut columns = first.columns();
    columns.truncate(recordings.len());
    let mut frames = first.frames();

    for (k, rec) in rest.iter().enumerate() {
        let c = k + 1;
        if c >= columns.len() {
            warnings.push(format!(
                "file {} has no output channel, the first file has only {} channels",
                c,
                columns.len()
            ));
            continue;
        }
        if (rec.rate - first.rate).abs() > 1.0 {
            warnings.push(format!(
                "sampling rate of file {} ({:.0}Hz) differs from {:.0}Hz",
                c, rec.rate, first.rate
            ));
        }
        if rec.bits != first.bits {
            warnings.push(format!(
                "sample width of file {} ({} bits) differs from {} bits",
                c, rec.bits, first.bits
            ));
        }
        frames = frames.min(rec.frames());
        match rec.channel(c) {
            Ok(data) => {
                debug!("channel {} taken from file {}", c, c);
                columns[c] = rescale(data, rec.bits, first.bits);
            }
            Err(_) => warnings.push(format!(
                "file {} has only {} channels, keeping channel {} of the first file",
                c, rec.channels, c
            )),
        }
    }

    columns.iter_mut().for_each(|column| column.truncate(frames));
    let merged = Recording::from_channels(first.rate, first.bits, columns, first.info.clone());
    Some((merged, warnings))
}

/// Shifts samples of width `from` to width `to`.
fn rescale(data: Vec<i32>, from: u16, to: u16) -> Vec<i32> {
    match from.cmp(&to) {
        Ordering::Equal => data,
        Ordering::Greater => {
            let shift = u32::from(from - to);
            data.into_iter().map(|v| v >> shift).collect()
        }
        Ordering::Less => {
            let shift = u32::from(to - from);
            data.into_iter().map(|v| v << shift).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riff::InfoList;

    fn rec(rate: f64, bits: u16, base: i32, channels: usize, frames: usize) -> Recording {
        let columns = (0..channels)
            .map(|c| (0..frames).map(|i| base + 10 * c as i32 + i as i32).collect())
            .collect();
        Recording::from_channels(rate, bits, columns, InfoList::new().with("PINS", "A0,A1,A2"))
    }

    #[test]
    fn channels_come_from_successive_files() {
        let files = vec![
            rec(44100.0, 16, 0, 3, 5),
            rec(44100.0, 16, 100, 3, 4),
            rec(44100.0, 16, 200, 3, 6),
        ];
        let (merged, warnings) = merge_channels(&files).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(merged.channels, 3);
        assert_eq!(merged.frames(), 4);
        assert_eq!(merged.channel(0).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(merged.channel(1).unwrap(), vec![110, 111, 112, 113]);
        assert_eq!(merged.channel(2).unwrap(), vec![220, 221, 222, 223]);
        assert_eq!(merged.info.get("PINS"), Some("A0,A1,A2"));
    }

    #[test]
    fn mismatches_are_warnings() {
        let files = vec![
            rec(44100.0, 16, 0, 3, 5),
            rec(48000.0, 24, 100, 1, 5),
        ];
        let (merged, warnings) = merge_channels(&files).unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("sampling rate"));
        assert!(warnings[1].contains("sample width"));
        assert!(warnings[2].contains("keeping channel 1"));
        assert_eq!(merged.channels, 2);
        assert_eq!(merged.rate, 44100.0);
        assert_eq!(merged.channel(1).unwrap(), vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn one_channel_per_file() {
        let files = vec![rec(44100.0, 16, 0, 4, 3), rec(44100.0, 16, 100, 4, 3)];
        let (merged, warnings) = merge_channels(&files).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(merged.channels, 2);
        assert_eq!(merged.columns(), vec![vec![0, 1, 2], vec![110, 111, 112]]);
    }

    #[test]
    fn wider_samples_are_scaled_down() {
        let files = vec![
            rec(44100.0, 16, 0, 2, 3),
            Recording::from_channels(
                44100.0,
                24,
                vec![vec![0; 3], vec![8_388_607, -8_388_608, 256]],
                InfoList::new(),
            ),
        ];
        let (merged, warnings) = merge_channels(&files).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("sample width"));
        assert_eq!(merged.channel(1).unwrap(), vec![32767, -32768, 1]);

        let out = tempfile::NamedTempFile::new().unwrap();
        merged.write_wave(out.path()).unwrap();
        let loaded = Recording::load_wave(out.path()).unwrap();
        assert_eq!(loaded.bits, 16);
        assert_eq!(loaded.samples, merged.samples);
    }

    #[test]
    fn narrower_samples_are_scaled_up() {
        assert_eq!(rescale(vec![1, -1], 16, 24), vec![256, -256]);
        assert_eq!(rescale(vec![5], 16, 16), vec![5]);
    }

    #[test]
    fn surplus_files_are_reported() {
        let files = vec![rec(1000.0, 16, 0, 1, 3), rec(1000.0, 16, 5, 2, 2)];
        let (merged, warnings) = merge_channels(&files).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(merged.frames(), 3);
        assert!(merge_channels(&[]).is_none());
    }
}
