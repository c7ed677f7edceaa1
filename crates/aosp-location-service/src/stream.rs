// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Position stream publisher: republishes every live fix to the host's event
// sink, stamped with the battery level. No caching, no timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use aosp_location_bridge::traits::{LocationListener, PlatformBridge, UpdateRequest};
use aosp_location_core::error::{GPS_LOCATION_ERROR, Result};
use aosp_location_core::BridgeConfig;

use crate::battery;
use crate::subscription::SubscriptionGuard;

/// Host side of the push channel.
pub trait EventSink: Send + Sync {
    fn success(&self, event: String);
    fn error(&self, code: &str, message: &str);
}

struct ActiveStream {
    subscription: SubscriptionGuard,
    /// Cleared on cancel so deliveries racing the unregistration are dropped.
    open: Arc<AtomicBool>,
}

pub struct PositionStreamPublisher {
    bridge: Arc<dyn PlatformBridge>,
    config: BridgeConfig,
    active: Mutex<Option<ActiveStream>>,
}

impl PositionStreamPublisher {
    pub fn new(bridge: Arc<dyn PlatformBridge>, config: BridgeConfig) -> Self {
        Self {
            bridge,
            config,
            active: Mutex::new(None),
        }
    }

    /// Start publishing to `sink`. A previous stream is torn down first.
    pub fn listen(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            debug!("replacing existing position stream");
            close(previous);
        }

        let open = Arc::new(AtomicBool::new(true));
        let listener: LocationListener = {
            let open = Arc::clone(&open);
            let bridge = Arc::clone(&self.bridge);
            Arc::new(move |fix| {
                if !open.load(Ordering::Acquire) {
                    debug!("position after unsubscribe dropped");
                    return;
                }
                match battery::enrich(bridge.as_ref(), &fix) {
                    Ok(sample) => sink.success(sample.to_wire()),
                    Err(e) => {
                        warn!(error = %e, "failed to enrich streamed position");
                        sink.error(GPS_LOCATION_ERROR, &e.to_string());
                    }
                }
            })
        };

        let request = UpdateRequest {
            provider: self.config.provider.clone(),
            min_interval: self.config.stream_interval(),
            min_distance_m: self.config.stream_min_distance_m,
        };
        let subscription = SubscriptionGuard::register(Arc::clone(&self.bridge), &request, listener)?;

        info!(
            interval_ms = self.config.stream_interval_ms,
            min_distance_m = self.config.stream_min_distance_m,
            "position stream started"
        );
        *active = Some(ActiveStream { subscription, open });
        Ok(())
    }

    /// Stop publishing. Returns `false` if no stream was active.
    pub fn cancel(&self) -> bool {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(stream) => {
                close(stream);
                info!("position stream stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn close(stream: ActiveStream) {
    stream.open.store(false, Ordering::Release);
    if let Err(e) = stream.subscription.release() {
        warn!(error = %e, "failed to remove stream location updates");
    }
}
