// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sample enrichment: stamp a fix with the battery charge at publish time.

use aosp_location_bridge::traits::BatteryStatus;
use aosp_location_core::error::Result;
use aosp_location_core::types::{LocationFix, PositionSample};

/// Read the battery now and attach it to `fix`.
pub fn enrich<B: BatteryStatus + ?Sized>(battery: &B, fix: &LocationFix) -> Result<PositionSample> {
    let level = battery.battery_level()?;
    Ok(PositionSample::new(fix, level))
}
