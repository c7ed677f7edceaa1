// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Position acquirer: one current position, from the OS cache when it is fresh
// enough, otherwise from a live subscription raced against a deadline.
//
// The live path holds three things for the duration of the race: a
// completion token both sides must claim before acting, the subscription
// guard, and the deadline. Whichever side claims the token first decides the
// outcome; the other side becomes a no-op. The guard removes the OS
// registration on every exit path, including the caller dropping the future.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use aosp_location_bridge::traits::{LocationListener, PlatformBridge, UpdateRequest};
use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::types::{LocationFix, PositionSample};
use aosp_location_core::BridgeConfig;

use crate::battery;
use crate::completion::CompletionToken;
use crate::subscription::SubscriptionGuard;

/// Whether a cached fix is recent enough to skip the sensor. The boundary is
/// strict: a fix exactly `threshold` old is stale.
pub fn is_fresh(fix: &LocationFix, now: DateTime<Utc>, threshold: Duration) -> bool {
    fix.age(now)
        .to_std()
        .map(|age| age < threshold)
        .unwrap_or(false)
}

/// Resolves single position requests against the platform bridge.
pub struct PositionAcquirer {
    bridge: Arc<dyn PlatformBridge>,
    config: BridgeConfig,
}

impl PositionAcquirer {
    pub fn new(bridge: Arc<dyn PlatformBridge>, config: BridgeConfig) -> Self {
        Self { bridge, config }
    }

    /// Resolve the current position.
    ///
    /// # Errors
    ///
    /// [`LocationError::GpsTimeout`] if no live fix arrived before the
    /// deadline; [`LocationError::GpsAcquisitionFailed`] carrying the
    /// provider's message for any other failure.
    pub async fn acquire_current_position(&self) -> Result<PositionSample> {
        let request_id = Uuid::new_v4();
        match self.acquire(request_id).await {
            Ok(sample) => {
                info!(%request_id, sample = %sample, "GPS position acquired");
                Ok(sample)
            }
            Err(LocationError::GpsTimeout) => {
                warn!(%request_id, timeout_ms = self.config.gps_timeout_ms, "GPS acquisition timed out");
                Err(LocationError::GpsTimeout)
            }
            Err(e) => {
                warn!(%request_id, error = %e, "GPS acquisition failed");
                Err(match e {
                    LocationError::GpsAcquisitionFailed(_) => e,
                    other => LocationError::GpsAcquisitionFailed(other.to_string()),
                })
            }
        }
    }

    async fn acquire(&self, request_id: Uuid) -> Result<PositionSample> {
        if let Some(fix) = self.bridge.last_known_location(&self.config.provider)? {
            if is_fresh(&fix, Utc::now(), self.config.freshness_threshold()) {
                debug!(%request_id, "cached fix is fresh, skipping live acquisition");
                return battery::enrich(self.bridge.as_ref(), &fix);
            }
            debug!(%request_id, fix_time = %fix.time, "cached fix is stale");
        }

        let request = AcquisitionRequest::start(request_id, Arc::clone(&self.bridge), &self.config)?;
        let fix = request.race().await?;
        battery::enrich(self.bridge.as_ref(), &fix)
    }
}

/// One in-flight live acquisition.
struct AcquisitionRequest {
    id: Uuid,
    token: Arc<CompletionToken>,
    subscription: SubscriptionGuard,
    deadline: Instant,
    fixes: mpsc::UnboundedReceiver<LocationFix>,
}

impl AcquisitionRequest {
    /// Subscribe to live updates, then arm the deadline.
    fn start(id: Uuid, bridge: Arc<dyn PlatformBridge>, config: &BridgeConfig) -> Result<Self> {
        let token = Arc::new(CompletionToken::new());
        let (tx, fixes) = mpsc::unbounded_channel();

        let listener_token = Arc::clone(&token);
        let listener: LocationListener = Arc::new(move |fix| {
            if listener_token.try_complete() {
                let _ = tx.send(fix);
            } else {
                debug!(request_id = %id, "late GPS fix discarded");
            }
        });

        let request = UpdateRequest {
            provider: config.provider.clone(),
            min_interval: config.acquisition_interval(),
            min_distance_m: config.stream_min_distance_m,
        };
        let subscription = SubscriptionGuard::register(bridge, &request, listener)?;
        let deadline = Instant::now() + config.gps_timeout();

        debug!(request_id = %id, timeout_ms = config.gps_timeout_ms, "live GPS acquisition started");
        Ok(Self {
            id,
            token,
            subscription,
            deadline,
            fixes,
        })
    }

    /// Wait for the first live fix or the deadline, whichever claims the
    /// token first, then release the subscription.
    async fn race(mut self) -> Result<LocationFix> {
        let outcome = tokio::select! {
            Some(fix) = self.fixes.recv() => Ok(fix),
            () = time::sleep_until(self.deadline) => {
                if self.token.try_complete() {
                    Err(LocationError::GpsTimeout)
                } else {
                    // The listener claimed the token first; its fix is already queued.
                    self.fixes.recv().await.ok_or_else(|| {
                        LocationError::GpsAcquisitionFailed("location listener dropped".into())
                    })
                }
            }
        };

        if let Err(e) = self.subscription.release() {
            warn!(request_id = %self.id, error = %e, "failed to release GPS subscription");
        }
        outcome
    }
}
