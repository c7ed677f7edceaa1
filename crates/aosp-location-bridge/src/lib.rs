// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AOSP location bridge — native platform abstractions.
//
// Defines the OS services the bridge consumes (location, telephony, battery)
// and picks the implementation for the target operating system. Android goes
// through JNI into the ART runtime; every other target gets a stub so the
// workspace builds and tests on desktop/CI.

pub mod simulated;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

use std::sync::Arc;

pub use simulated::{CellScript, Scenario, SimulatedBridge};
pub use traits::*;

/// Retrieves the bridge implementation for the target operating system.
pub fn platform_bridge() -> Arc<dyn PlatformBridge> {
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidBridge::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        Arc::new(stub::StubBridge)
    }
}
