//! Download progress reported by the update provider.
//!
//! The provider computes every field; the session stores the latest tick
//! as-is and never recomputes or validates it. Formatting helpers here are
//! for presentation only.

use serde::{Deserialize, Serialize};

/// A single download progress tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Percentage complete, nominally `100 * transferred / total`.
    pub percent: f64,
    /// Bytes received so far.
    pub transferred_bytes: u64,
    /// Total size of the artifact in bytes.
    pub total_bytes: u64,
    /// Current transfer rate.
    pub bytes_per_second: f64,
}

impl DownloadProgress {
    /// Build a tick from byte counts, deriving the percentage.
    ///
    /// A zero total yields 0 %.
    pub fn from_bytes(transferred_bytes: u64, total_bytes: u64, bytes_per_second: f64) -> Self {
        let percent = if total_bytes == 0 {
            0.0
        } else {
            (transferred_bytes as f64 / total_bytes as f64 * 100.0).min(100.0)
        };
        Self {
            percent,
            transferred_bytes,
            total_bytes,
            bytes_per_second,
        }
    }

    /// Percentage clamped to `[0, 100]` for progress bars.
    ///
    /// Provider values outside the range (or NaN) are tolerated, not rejected.
    pub fn clamped_percent(&self) -> f64 {
        if self.percent.is_nan() {
            return 0.0;
        }
        self.percent.clamp(0.0, 100.0)
    }

    /// One-line summary, e.g. `"55.0% - 1.5 MB / 3 MB (512 KB/s)"`.
    pub fn summary(&self) -> String {
        format!(
            "{:.1}% - {} / {} ({}/s)",
            self.percent,
            format_bytes(self.transferred_bytes as f64),
            format_bytes(self.total_bytes as f64),
            format_bytes(self.bytes_per_second),
        )
    }
}

const BYTE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with base-1024 units and at most two decimals.
///
/// Values beyond gigabytes stay in `GB`.
pub fn format_bytes(bytes: f64) -> String {
    if bytes <= 0.0 || bytes.is_nan() {
        return "0 Bytes".to_owned();
    }

    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", BYTE_UNITS[unit])
}
