// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the location bridge.

use thiserror::Error;

/// Error code reported on the method channel for GPS failures.
pub const GPS_LOCATION_ERROR: &str = "GPS_LOCATION_ERROR";

/// Error code reported on the method channel for every cell query failure.
pub const CELL_INFO_ERROR: &str = "CELL_INFO_ERROR";

/// Top-level error type for all location bridge operations.
#[derive(Debug, Error)]
pub enum LocationError {
    // -- GPS --
    #[error("GPS Timeout")]
    GpsTimeout,

    #[error("{0}")]
    GpsAcquisitionFailed(String),

    // -- Cell info --
    #[error("empty cell info data")]
    CellInfoEmpty,

    #[error("{0}")]
    CellInfoError(String),

    #[error("android version not supported")]
    CellInfoUnsupported { sdk_level: u32, min_sdk_level: u32 },

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Internal failure kind. Finer grained than the channel code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    GpsTimeout,
    GpsAcquisitionFailed,
    CellInfoEmpty,
    CellInfoError,
    CellInfoUnsupported,
    Config,
    Platform,
}

impl LocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GpsTimeout => ErrorKind::GpsTimeout,
            Self::GpsAcquisitionFailed(_) => ErrorKind::GpsAcquisitionFailed,
            Self::CellInfoEmpty => ErrorKind::CellInfoEmpty,
            Self::CellInfoError(_) => ErrorKind::CellInfoError,
            Self::CellInfoUnsupported { .. } => ErrorKind::CellInfoUnsupported,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Serialization(_) | Self::Bridge(_) | Self::PlatformUnavailable => {
                ErrorKind::Platform
            }
        }
    }

    /// The code the host sees. Empty, unsupported and provider failures of a
    /// cell query all collapse to `CELL_INFO_ERROR`.
    pub fn channel_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::CellInfoEmpty | ErrorKind::CellInfoError | ErrorKind::CellInfoUnsupported => {
                CELL_INFO_ERROR
            }
            _ => GPS_LOCATION_ERROR,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LocationError>;
