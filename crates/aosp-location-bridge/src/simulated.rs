// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted bridge for desktop runs of the probe binary.
//
// Live updates are produced by a tokio task per registration, so a runtime
// must be active when `request_location_updates` or
// `request_cell_info_update` is called.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::types::{CellIdentityRecord, LocationFix};

use crate::traits::*;

/// Degrees added to the latitude on every simulated live tick.
const DRIFT_PER_TICK: f64 = 0.0001;

/// What the simulated telephony provider answers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellScript {
    Cells(Vec<CellIdentityRecord>),
    Error { code: i32, detail: Option<String> },
}

/// Everything the simulated OS will report.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub latitude: f64,
    pub longitude: f64,
    /// Age of the OS-cached fix. `None` means nothing is cached.
    pub cached_fix_age: Option<Duration>,
    /// Delay before the first live fix. `None` means the receiver never locks.
    pub live_fix_delay: Option<Duration>,
    pub battery_level: u8,
    pub sdk_level: u32,
    pub cells: CellScript,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            latitude: 48.8566,
            longitude: 2.3522,
            cached_fix_age: None,
            live_fix_delay: Some(Duration::from_secs(1)),
            battery_level: 77,
            sdk_level: 34,
            cells: CellScript::Cells(vec![CellIdentityRecord::Gsm {
                mcc: Some("208".into()),
                mnc: Some("10".into()),
                cid: 12345,
                lac: 6789,
            }]),
        }
    }
}

/// Bridge answering from a [`Scenario`].
pub struct SimulatedBridge {
    scenario: Scenario,
    next_id: AtomicU64,
    live: Mutex<HashMap<ListenerId, JoinHandle<()>>>,
}

impl SimulatedBridge {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            next_id: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live registrations not yet removed.
    pub fn active_registrations(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    fn runtime() -> Result<tokio::runtime::Handle> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| LocationError::Bridge(format!("simulated bridge needs a tokio runtime: {e}")))
    }
}

impl Drop for SimulatedBridge {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            for (_, handle) in live.drain() {
                handle.abort();
            }
        }
    }
}

impl PlatformBridge for SimulatedBridge {
    fn platform_name(&self) -> &str {
        "Simulated"
    }
}

impl LocationServices for SimulatedBridge {
    fn last_known_location(&self, _provider: &str) -> Result<Option<LocationFix>> {
        Ok(self.scenario.cached_fix_age.map(|age| {
            let time = chrono::Duration::from_std(age)
                .ok()
                .and_then(|age| Utc::now().checked_sub_signed(age))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            LocationFix::new(self.scenario.latitude, self.scenario.longitude, time)
        }))
    }

    fn request_location_updates(
        &self,
        request: &UpdateRequest,
        listener: LocationListener,
    ) -> Result<ListenerId> {
        let runtime = Self::runtime()?;
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let (latitude, longitude) = (self.scenario.latitude, self.scenario.longitude);
        let first_delay = self.scenario.live_fix_delay;
        let interval = request.min_interval.max(Duration::from_millis(1));

        let handle = runtime.spawn(async move {
            let Some(first_delay) = first_delay else {
                // No lock: stay registered and silent until removed.
                std::future::pending::<()>().await;
                return;
            };
            tokio::time::sleep(first_delay).await;
            let mut tick: u64 = 0;
            loop {
                let drift = DRIFT_PER_TICK * tick as f64;
                listener(LocationFix::new(latitude + drift, longitude, Utc::now()));
                tick += 1;
                tokio::time::sleep(interval).await;
            }
        });

        self.live
            .lock()
            .map_err(|_| LocationError::Bridge("simulated registry lock poisoned".into()))?
            .insert(id, handle);

        info!(%id, provider = %request.provider, "simulated location updates requested");
        Ok(id)
    }

    fn remove_updates(&self, id: ListenerId) -> Result<()> {
        let handle = self
            .live
            .lock()
            .map_err(|_| LocationError::Bridge("simulated registry lock poisoned".into()))?
            .remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            debug!(%id, "simulated location updates removed");
        }
        Ok(())
    }
}

impl Telephony for SimulatedBridge {
    fn sdk_level(&self) -> Result<u32> {
        Ok(self.scenario.sdk_level)
    }

    fn request_cell_info_update(&self, callback: CellInfoCallback) -> Result<()> {
        let runtime = Self::runtime()?;
        let event = match &self.scenario.cells {
            CellScript::Cells(cells) => CellInfoEvent::CellInfo(cells.clone()),
            CellScript::Error { code, detail } => CellInfoEvent::Error {
                code: *code,
                detail: detail.clone(),
            },
        };
        runtime.spawn(async move {
            callback(event);
        });
        Ok(())
    }
}

impl BatteryStatus for SimulatedBridge {
    fn battery_level(&self) -> Result<u8> {
        Ok(self.scenario.battery_level)
    }
}
