// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration: freshness and timeout policy plus the hints passed to
// the OS location provider.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LocationError, Result};

/// First OS API level with a usable telephony cell-info API (Lollipop).
pub const DEFAULT_MIN_SDK_LEVEL: u32 = 21;

/// Tunable bridge settings. Every duration is in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// A cached fix younger than this is returned without a live subscription.
    pub freshness_threshold_ms: u64,
    /// Deadline of a live GPS acquisition.
    pub gps_timeout_ms: u64,
    /// Interval hint for the one-shot acquisition subscription.
    pub acquisition_interval_ms: u64,
    /// Interval hint for the push stream subscription.
    pub stream_interval_ms: u64,
    /// Displacement hint (metres) for both subscriptions.
    pub stream_min_distance_m: f32,
    /// Cell queries below this OS API level fail without touching the radio.
    pub min_sdk_level: u32,
    /// OS location provider name.
    pub provider: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            freshness_threshold_ms: 10_000,
            gps_timeout_ms: 30_000,
            acquisition_interval_ms: 5_000,
            stream_interval_ms: 2_500,
            stream_min_distance_m: 0.0,
            min_sdk_level: DEFAULT_MIN_SDK_LEVEL,
            provider: "gps".into(),
        }
    }
}

impl BridgeConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gps_timeout_ms == 0 {
            return Err(LocationError::Config("gps_timeout_ms must be non-zero".into()));
        }
        if self.stream_interval_ms == 0 {
            return Err(LocationError::Config(
                "stream_interval_ms must be non-zero".into(),
            ));
        }
        if !self.stream_min_distance_m.is_finite() || self.stream_min_distance_m < 0.0 {
            return Err(LocationError::Config(format!(
                "stream_min_distance_m must be a finite, non-negative distance (got {})",
                self.stream_min_distance_m
            )));
        }
        if self.provider.is_empty() {
            return Err(LocationError::Config("provider must not be empty".into()));
        }
        Ok(())
    }

    pub fn freshness_threshold(&self) -> Duration {
        Duration::from_millis(self.freshness_threshold_ms)
    }

    pub fn gps_timeout(&self) -> Duration {
        Duration::from_millis(self.gps_timeout_ms)
    }

    pub fn acquisition_interval(&self) -> Duration {
        Duration::from_millis(self.acquisition_interval_ms)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}
