// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned handle for a live OS location registration.

use std::sync::Arc;

use aosp_location_bridge::traits::{ListenerId, LocationListener, PlatformBridge, UpdateRequest};
use aosp_location_core::error::Result;
use tracing::{debug, warn};

/// A live position registration that is removed exactly once: either by an
/// explicit [`release`](SubscriptionGuard::release) or when the guard drops.
pub struct SubscriptionGuard {
    bridge: Arc<dyn PlatformBridge>,
    id: Option<ListenerId>,
}

impl SubscriptionGuard {
    /// Register `listener` with the OS. Nothing is held if registration fails.
    pub fn register(
        bridge: Arc<dyn PlatformBridge>,
        request: &UpdateRequest,
        listener: LocationListener,
    ) -> Result<Self> {
        let id = bridge.request_location_updates(request, listener)?;
        debug!(%id, provider = %request.provider, "location subscription opened");
        Ok(Self {
            bridge,
            id: Some(id),
        })
    }

    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    /// Remove the registration now and report whether the OS accepted it.
    pub fn release(mut self) -> Result<()> {
        match self.id.take() {
            Some(id) => {
                debug!(%id, "location subscription released");
                self.bridge.remove_updates(id)
            }
            None => Ok(()),
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            debug!(%id, "location subscription dropped");
            if let Err(e) = self.bridge.remove_updates(id) {
                warn!(%id, error = %e, "failed to remove location updates");
            }
        }
    }
}
