// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the OS services the location
// bridge consumes.
//
// The OS delivers results through callbacks on its own dispatch thread. The
// traits keep that shape: listeners and callbacks are plain closures that may
// be invoked from any thread, and every live registration is identified by a
// `ListenerId` the caller must hand back to cancel it.

use std::sync::Arc;
use std::time::Duration;

use aosp_location_core::error::Result;
use aosp_location_core::types::{CellIdentityRecord, LocationFix};

/// Unified bridge that groups all native capabilities.
pub trait PlatformBridge: LocationServices + Telephony + BatteryStatus + Send + Sync {
    /// Human-readable platform name (e.g. "Android", "Simulated").
    fn platform_name(&self) -> &str;
}

/// Receives every position update of a live registration.
pub type LocationListener = Arc<dyn Fn(LocationFix) + Send + Sync>;

/// Handle of a live position registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Hints passed to the OS when registering for live updates.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// OS provider name (e.g. "gps").
    pub provider: String,
    /// Minimum time between updates. The OS treats it as a hint.
    pub min_interval: Duration,
    /// Minimum displacement in metres between updates.
    pub min_distance_m: f32,
}

/// OS location services.
pub trait LocationServices {
    /// The position cached by the OS from a previous fix, if any.
    fn last_known_location(&self, provider: &str) -> Result<Option<LocationFix>>;

    /// Start delivering live updates to `listener` until [`remove_updates`]
    /// is called with the returned id.
    ///
    /// [`remove_updates`]: LocationServices::remove_updates
    fn request_location_updates(
        &self,
        request: &UpdateRequest,
        listener: LocationListener,
    ) -> Result<ListenerId>;

    /// Cancel a live registration. Unknown ids are ignored.
    fn remove_updates(&self, id: ListenerId) -> Result<()>;
}

/// Outcome of a single cell-info request.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInfoEvent {
    /// Identities of every visible cell, serving cell first.
    CellInfo(Vec<CellIdentityRecord>),
    /// The telephony provider failed.
    Error { code: i32, detail: Option<String> },
}

/// Invoked exactly once with the outcome of a cell-info request.
pub type CellInfoCallback = Box<dyn FnOnce(CellInfoEvent) + Send>;

/// OS telephony services.
pub trait Telephony {
    /// API level of the running OS.
    fn sdk_level(&self) -> Result<u32>;

    /// Ask the radio for a fresh snapshot of visible cells. The answer arrives
    /// asynchronously through `callback`.
    fn request_cell_info_update(&self, callback: CellInfoCallback) -> Result<()>;
}

/// OS battery status.
pub trait BatteryStatus {
    /// Instantaneous charge percentage, 0..=100.
    fn battery_level(&self) -> Result<u8>;
}
