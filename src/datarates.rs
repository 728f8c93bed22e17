//! Data rates and storage needs of multi-channel recordings, as Markdown
//! tables.

use std::fmt::Write;

/// Sampling rates in kHz listed in the tables.
pub const SAMPLING_RATES: [u32; 6] = [8, 16, 24, 48, 96, 192];

/// Channel counts listed in the tables.
pub const CHANNELS: [u32; 11] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

/// Sample widths a report covers by default.
pub const BITS: [u32; 3] = [16, 24, 32];

const UNITS: [(f64, &str); 6] = [
    (1e15, "PB"),
    (1e12, "TB"),
    (1e9, "GB"),
    (1e6, "MB"),
    (1e3, "kB"),
    (1e0, "B"),
];

/// Three significant digits without trailing zeros, like `%.3g` for
/// values between 1 and 1000.
fn three_digits(x: f64) -> String {
    let s = if x >= 100.0 {
        format!("{:.0}", x)
    } else if x >= 10.0 {
        format!("{:.1}", x)
    } else {
        format!("{:.2}", x)
    };
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        s
    }
}

/// Formats a number of bytes with the largest fitting decimal unit.
pub fn format_bytes(n: f64) -> String {
    UNITS
        .iter()
        .find(|(factor, _)| n >= *factor)
        .map(|(factor, unit)| format!("{}{}", three_digits(n / factor), unit))
        .unwrap_or_else(|| "0B".to_owned())
}

/// Bytes per second for the given sample width, channels and sampling
/// rate in kHz.
pub fn data_rate(bits: u32, channels: u32, rate_khz: u32) -> f64 {
    bits as f64 / 8.0 * channels as f64 * rate_khz as f64 * 1000.0
}

/// Markdown table of data rates for sample width `bits`.
pub fn make_table(bits: u32) -> String {
    let mut table = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        table,
        "| {:8} | {:4} | {:13} | {:9} | {:8} | {:7} |",
        "channels", "bits", "sampling rate", "data rate", "per hour", "per day"
    );
    let _ = writeln!(
        table,
        "| {:->8} | {:->4} | {:->13} | {:->9} | {:->8} | {:->7} |",
        ":", ":", ":", ":", ":", ":"
    );
    for (i, &rate) in SAMPLING_RATES.iter().enumerate() {
        if i > 0 {
            let _ = writeln!(
                table,
                "| {:8} | {:4} | {:13} | {:9} | {:8} | {:7} |",
                "", "", "", "", "", ""
            );
        }
        for &channels in &CHANNELS {
            let rate_bytes = data_rate(bits, channels, rate);
            let _ = writeln!(
                table,
                "| {:8} | {:4} | {:10}kHz | {:>9} | {:>8} | {:>7} |",
                channels,
                bits,
                rate,
                format_bytes(rate_bytes) + "/s",
                format_bytes(rate_bytes * 3600.0),
                format_bytes(rate_bytes * 3600.0 * 24.0)
            );
        }
    }
    table
}

/// One section with heading and table per sample width.
pub fn make_report(bits: &[u32]) -> String {
    bits.iter()
        .map(|&b| format!("## {} bits\n\n{}\n\n", b, make_table(b)))
        .collect()
}
