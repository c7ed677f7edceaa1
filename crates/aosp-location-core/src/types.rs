// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the location bridge: raw OS readings, the samples
// published to the host, and the flat cell identity record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for an operator code the OS did not report.
pub const NO_MCC: &str = "no_mcc";
/// Sentinel for a network code the OS did not report.
pub const NO_MNC: &str = "no_mnc";
/// Sentinel for every numeric field outside the populated group.
pub const UNSET: i32 = -1;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position fix as reported by the OS location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Wall-clock time at which the fix was taken.
    pub time: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, time: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            time,
        }
    }

    /// Age of the fix relative to `now`. Fixes stamped in the future have age zero.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.time).max(chrono::Duration::zero())
    }
}

/// A fix enriched with the battery charge at the moment it was published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Charge percentage, 0..=100.
    pub battery_level: u8,
}

impl PositionSample {
    pub fn new(fix: &LocationFix, battery_level: u8) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            battery_level,
        }
    }

    /// Colon-delimited wire form: `"<latitude>:<longitude>:<batteryLevel>"`.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PositionSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            host_double(self.latitude),
            host_double(self.longitude),
            self.battery_level
        )
    }
}

/// Render a coordinate the way the host runtime prints a double: plain
/// decimal with at least one fractional digit inside `[1e-3, 1e7)`, and
/// `<mantissa>E<exponent>` (mantissa always with a decimal point) outside it.
fn host_double(value: f64) -> String {
    let magnitude = value.abs();
    if !value.is_finite() || magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{value:?}");
    }
    let scientific = format!("{value:E}");
    match scientific.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            format!("{mantissa}.0E{exponent}")
        }
        _ => scientific,
    }
}

// ---------------------------------------------------------------------------
// Cellular identity
// ---------------------------------------------------------------------------

/// Radio technology of the serving cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    #[serde(rename = "CDMA")]
    Cdma,
    #[serde(rename = "GSM")]
    Gsm,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "NR")]
    Nr,
    #[serde(rename = "TDSCDMA")]
    Tdscdma,
    #[serde(rename = "WCDMA")]
    Wcdma,
    #[serde(rename = "no_type")]
    Unknown,
}

impl NetworkType {
    /// Tag used in the serialized record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdma => "CDMA",
            Self::Gsm => "GSM",
            Self::Lte => "LTE",
            Self::Nr => "NR",
            Self::Tdscdma => "TDSCDMA",
            Self::Wcdma => "WCDMA",
            Self::Unknown => "no_type",
        }
    }

    /// Parse a tag as accepted on the command line (case-insensitive).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "CDMA" => Some(Self::Cdma),
            "GSM" => Some(Self::Gsm),
            "LTE" => Some(Self::Lte),
            "NR" => Some(Self::Nr),
            "TDSCDMA" => Some(Self::Tdscdma),
            "WCDMA" => Some(Self::Wcdma),
            "NO_TYPE" | "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Technology-specific identity of the serving cell, as the OS reports it.
///
/// Each variant carries only the fields that technology defines. Operator
/// codes are `None` when the OS has no value for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellIdentityRecord {
    Cdma {
        /// Base station latitude in quarter-seconds.
        latitude: i32,
        /// Base station longitude in quarter-seconds.
        longitude: i32,
    },
    Gsm {
        mcc: Option<String>,
        mnc: Option<String>,
        cid: i32,
        lac: i32,
    },
    Lte {
        mcc: Option<String>,
        mnc: Option<String>,
        ci: i32,
        tac: i32,
    },
    Nr {
        mcc: Option<String>,
        mnc: Option<String>,
        nci: i64,
        tac: i32,
    },
    Tdscdma {
        mcc: Option<String>,
        mnc: Option<String>,
        cid: i32,
        lac: i32,
    },
    Wcdma {
        mcc: Option<String>,
        mnc: Option<String>,
        cid: i32,
        lac: i32,
    },
    /// A technology this bridge does not recognise.
    Unknown,
}

impl CellIdentityRecord {
    pub fn network_type(&self) -> NetworkType {
        match self {
            Self::Cdma { .. } => NetworkType::Cdma,
            Self::Gsm { .. } => NetworkType::Gsm,
            Self::Lte { .. } => NetworkType::Lte,
            Self::Nr { .. } => NetworkType::Nr,
            Self::Tdscdma { .. } => NetworkType::Tdscdma,
            Self::Wcdma { .. } => NetworkType::Wcdma,
            Self::Unknown => NetworkType::Unknown,
        }
    }
}

/// Flat, technology-agnostic cell identity published to the host.
///
/// Fields outside the group meaningful for `network_type` hold the sentinels
/// [`NO_MCC`], [`NO_MNC`] and [`UNSET`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellIdentity {
    pub network_type: NetworkType,
    pub mcc: String,
    pub mnc: String,
    pub cid: i64,
    pub lac: i32,
    pub lat: i32,
    pub long: i32,
    pub battery_level: i32,
}

impl CellIdentity {
    /// A record of the given type with every field at its sentinel.
    pub fn unset(network_type: NetworkType, battery_level: u8) -> Self {
        Self {
            network_type,
            mcc: NO_MCC.to_string(),
            mnc: NO_MNC.to_string(),
            cid: i64::from(UNSET),
            lac: UNSET,
            lat: UNSET,
            long: UNSET,
            battery_level: i32::from(battery_level),
        }
    }

    /// JSON object string as sent on the method channel.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
