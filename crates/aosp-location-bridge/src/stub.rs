// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// Every trait method returns `PlatformUnavailable`. The real implementation
// lives in the `android` module.

use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::types::LocationFix;

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl LocationServices for StubBridge {
    fn last_known_location(&self, _provider: &str) -> Result<Option<LocationFix>> {
        tracing::warn!("LocationServices::last_known_location called on stub bridge");
        Err(LocationError::PlatformUnavailable)
    }

    fn request_location_updates(
        &self,
        _request: &UpdateRequest,
        _listener: LocationListener,
    ) -> Result<ListenerId> {
        tracing::warn!("LocationServices::request_location_updates called on stub bridge");
        Err(LocationError::PlatformUnavailable)
    }

    fn remove_updates(&self, _id: ListenerId) -> Result<()> {
        Err(LocationError::PlatformUnavailable)
    }
}

impl Telephony for StubBridge {
    fn sdk_level(&self) -> Result<u32> {
        Err(LocationError::PlatformUnavailable)
    }

    fn request_cell_info_update(&self, _callback: CellInfoCallback) -> Result<()> {
        tracing::warn!("Telephony::request_cell_info_update called on stub bridge");
        Err(LocationError::PlatformUnavailable)
    }
}

impl BatteryStatus for StubBridge {
    fn battery_level(&self) -> Result<u8> {
        Err(LocationError::PlatformUnavailable)
    }
}
