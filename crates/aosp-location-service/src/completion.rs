// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// At-most-once completion token shared by the two sides of a race.

use std::sync::atomic::{AtomicBool, Ordering};

/// Decides which of several racing callers gets to act.
///
/// Sensor callbacks and the deadline timer may run on different threads, so
/// the check and the set are one atomic step.
#[derive(Debug, Default)]
pub struct CompletionToken {
    completed: AtomicBool,
}

impl CompletionToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the token. Returns `true` for exactly one caller over the
    /// token's lifetime.
    pub fn try_complete(&self) -> bool {
        self.completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}
