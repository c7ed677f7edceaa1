// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AOSP location service — bounded-wait GPS acquisition, cell identity
// normalisation and position streaming on top of the platform bridge, plus
// the channel facade the host application talks to.

pub mod acquirer;
pub mod battery;
pub mod cell;
pub mod completion;
pub mod plugin;
pub mod stream;
pub mod subscription;

#[cfg(test)]
mod test_support;

pub use acquirer::PositionAcquirer;
pub use cell::CellIdentityNormalizer;
pub use plugin::{LocationPlugin, MethodReply};
pub use stream::{EventSink, PositionStreamPublisher};
