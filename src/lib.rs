//! Host-side tools for the multi-channel recordings of a Teensy based data
//! acquisition rig.
//!
//! The recorder writes PCM wave files with a `LIST`/`INFO` chunk describing
//! the acquisition settings. This crate reads them ([recording], [riff],
//! [metadata]), runs the analyses of the `teerec` binary on them ([noise],
//! [spectra], [traces], [merge], [cycles], [sensors], [datarates]) and
//! shows the resulting [plot]s in the terminal ([gui]).
//!
//! The `serialmonitor` binary finds recorder boards by their USB ids and
//! relays their console output ([serial]).

#![warn(missing_docs)]

use env_logger::{Builder, Env};

pub mod args;
pub mod cycles;
pub mod datarates;
pub mod gui;
pub mod merge;
pub mod metadata;
pub mod noise;
pub mod plot;
pub mod recording;
pub mod riff;
pub mod sensors;
pub mod serial;
pub mod spectra;
pub mod spectrum;
pub mod stats;
pub mod test_signal;
pub mod traces;

/// Log level of the binaries when the environment does not set one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Logger of the binaries, filtered by the environment variable `var`
/// (usually `RUST_LOG`) or else by [DEFAULT_LOG_FILTER].
pub fn logger(var: &str) -> Builder {
    Builder::from_env(Env::default().filter_or(var, DEFAULT_LOG_FILTER))
}

/// An iterator function that transposes the order of iteration based on
/// [this StackOverflow answer](https://stackoverflow.com/a/75477884/17443903).
/// Ends as soon as the shortest of the inner iterators ends, or right away
/// if there are none.
pub struct TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    iterators: Vec<I::IntoIter>,
}

/// Turns an iterator of iterators inside out, see [TransposeIter].
pub trait TransposableIter<I, T>
where
    Self: Sized,
    Self: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
    /// Iterates over the inner iterators side by side.
    fn transpose(self) -> TransposeIter<I, T> {
        let iterators: Vec<_> = self.into_iter().map(|i| i.into_iter()).collect();
        TransposeIter { iterators }
    }
}

impl<I, T> Iterator for TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    type Item = Vec<T>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.iterators.is_empty() {
            return None;
        }
        self.iterators.iter_mut().map(|iter| iter.next()).collect()
    }
}

impl<I, T, Any> TransposableIter<I, T> for Any
where
    Any: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn transpose_columns_to_frames() {
        let frames: Vec<Vec<i32>> = vec![vec![1, 2, 3], vec![4, 5]].into_iter().transpose().collect();
        assert_eq!(frames, vec![vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn warnings_are_logged_by_default() {
        let logger = logger("TEEREC_LOG_NOT_SET").build();
        assert_eq!(logger.filter(), log::LevelFilter::Warn);
        assert!(logger.enabled(&log::Metadata::builder().level(log::Level::Warn).build()));
        assert!(!logger.enabled(&log::Metadata::builder().level(log::Level::Info).build()));
    }

    #[test]
    fn transpose_nothing() {
        let empty: Vec<Vec<i32>> = Vec::new();
        assert_eq!(empty.into_iter().transpose().count(), 0);
    }
}
