// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler configuration.

use crate::frame::DEFAULT_SKIP_WARNING_THRESHOLD;
use crate::time::{DEFAULT_REFRESH_RATE_HZ, Duration};

/// Configuration for a frame scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChoreographerConfig {
    /// Drive frames from the configured vsync source. When `false`, or when
    /// no source is installed, frames are paced by a software timer.
    pub use_vsync: bool,
    /// Minimum spacing between software-timed frames.
    pub frame_delay: Duration,
    /// Skipped-frame count at which a late frame is logged.
    pub skip_warning_threshold: u64,
    /// Refresh rate used when no vsync source reports one.
    pub refresh_rate_hz: f64,
    /// Initial throttling factor (`1` runs a frame on every pulse).
    pub fps_divisor: u32,
}

impl ChoreographerConfig {
    /// Default software frame delay.
    pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(10);

    /// Frames driven by a vsync source.
    #[must_use]
    pub const fn vsync() -> Self {
        Self {
            use_vsync: true,
            frame_delay: Self::DEFAULT_FRAME_DELAY,
            skip_warning_threshold: DEFAULT_SKIP_WARNING_THRESHOLD,
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            fps_divisor: 1,
        }
    }

    /// Frames paced by the software timer only.
    #[must_use]
    pub const fn software() -> Self {
        Self {
            use_vsync: false,
            ..Self::vsync()
        }
    }
}

impl Default for ChoreographerConfig {
    fn default() -> Self {
        Self::vsync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_source() {
        let vsync = ChoreographerConfig::vsync();
        let software = ChoreographerConfig::software();
        assert!(vsync.use_vsync);
        assert!(!software.use_vsync);
        assert_eq!(software.frame_delay, Duration::from_millis(10));
        assert_eq!(software.skip_warning_threshold, 30);
        assert_eq!(ChoreographerConfig::default(), vsync);
    }
}
