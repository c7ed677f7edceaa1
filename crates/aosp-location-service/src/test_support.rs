// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording fakes of the OS collaborators, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use aosp_location_bridge::traits::*;
use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::types::LocationFix;

use crate::stream::EventSink;

/// What the fake telephony provider does with a cell-info callback.
pub enum CellBehaviour {
    /// Answer synchronously, inside `request_cell_info_update`.
    Answer(CellInfoEvent),
    /// Drop the callback without calling it.
    Drop,
}

pub struct FakeBridge {
    cached: Option<LocationFix>,
    last_known_error: Option<String>,
    registration_error: Option<String>,
    battery: std::result::Result<u8, String>,
    sdk_level: u32,
    cell: Mutex<Option<CellBehaviour>>,

    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, LocationListener>>,
    /// Listeners already removed, kept to simulate late OS deliveries.
    retired: Mutex<Vec<LocationListener>>,
    requests: Mutex<Vec<UpdateRequest>>,
    removals: AtomicUsize,
    cell_requests: AtomicUsize,
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBridge {
    pub fn new() -> Self {
        Self {
            cached: None,
            last_known_error: None,
            registration_error: None,
            battery: Ok(77),
            sdk_level: 34,
            cell: Mutex::new(None),
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            removals: AtomicUsize::new(0),
            cell_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_cached(mut self, fix: LocationFix) -> Self {
        self.cached = Some(fix);
        self
    }

    pub fn failing_last_known(mut self, message: &str) -> Self {
        self.last_known_error = Some(message.into());
        self
    }

    pub fn failing_registration(mut self, message: &str) -> Self {
        self.registration_error = Some(message.into());
        self
    }

    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery = Ok(level);
        self
    }

    pub fn failing_battery(mut self, message: &str) -> Self {
        self.battery = Err(message.into());
        self
    }

    pub fn with_sdk_level(mut self, level: u32) -> Self {
        self.sdk_level = level;
        self
    }

    pub fn with_cells(self, behaviour: CellBehaviour) -> Self {
        *self.cell.lock().unwrap_or_else(PoisonError::into_inner) = Some(behaviour);
        self
    }

    /// Deliver `fix` to every live listener. Returns how many were called.
    pub fn emit(&self, fix: LocationFix) -> usize {
        let listeners: Vec<LocationListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for listener in &listeners {
            listener(fix);
        }
        listeners.len()
    }

    /// Deliver `fix` to listeners that were already removed, as an OS racing
    /// its own unregistration would.
    pub fn emit_late(&self, fix: LocationFix) -> usize {
        let retired = self
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &retired {
            listener(fix);
        }
        retired.len()
    }

    pub fn registrations(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn last_request(&self) -> Option<UpdateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn cell_requests(&self) -> usize {
        self.cell_requests.load(Ordering::SeqCst)
    }
}

impl PlatformBridge for FakeBridge {
    fn platform_name(&self) -> &str {
        "Fake"
    }
}

impl LocationServices for FakeBridge {
    fn last_known_location(&self, _provider: &str) -> Result<Option<LocationFix>> {
        match &self.last_known_error {
            Some(message) => Err(LocationError::Bridge(message.clone())),
            None => Ok(self.cached),
        }
    }

    fn request_location_updates(
        &self,
        request: &UpdateRequest,
        listener: LocationListener,
    ) -> Result<ListenerId> {
        if let Some(message) = &self.registration_error {
            return Err(LocationError::Bridge(message.clone()));
        }
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        Ok(id)
    }

    fn remove_updates(&self, id: ListenerId) -> Result<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        let removed = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(listener) = removed {
            self.retired
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(listener);
        }
        Ok(())
    }
}

impl Telephony for FakeBridge {
    fn sdk_level(&self) -> Result<u32> {
        Ok(self.sdk_level)
    }

    fn request_cell_info_update(&self, callback: CellInfoCallback) -> Result<()> {
        self.cell_requests.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.cell.lock().unwrap_or_else(PoisonError::into_inner).take();
        match behaviour {
            Some(CellBehaviour::Answer(event)) => callback(event),
            Some(CellBehaviour::Drop) => drop(callback),
            None => return Err(LocationError::Bridge("telephony service unavailable".into())),
        }
        Ok(())
    }
}

impl BatteryStatus for FakeBridge {
    fn battery_level(&self) -> Result<u8> {
        self.battery
            .clone()
            .map_err(LocationError::Bridge)
    }
}

/// One event pushed to a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Success(String),
    Error { code: String, message: String },
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl EventSink for RecordingSink {
    fn success(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SinkEvent::Success(event));
    }

    fn error(&self, code: &str, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SinkEvent::Error {
                code: code.into(),
                message: message.into(),
            });
    }
}
