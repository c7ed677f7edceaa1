// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Channel facade registered with the host application: method-call dispatch
// on `aosp_location` and the stream handler for `aosp_location_stream`.
//
// The host transport (call correlation, codec, threads) is opaque; this type
// only turns a method name into exactly one reply and a listen/cancel pair
// into a live or torn-down stream.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use aosp_location_bridge::traits::PlatformBridge;
use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::BridgeConfig;

use crate::acquirer::PositionAcquirer;
use crate::cell::CellIdentityNormalizer;
use crate::stream::{EventSink, PositionStreamPublisher};

/// Request/response channel name.
pub const METHOD_CHANNEL: &str = "aosp_location";
/// Push channel name.
pub const EVENT_CHANNEL: &str = "aosp_location_stream";

pub const GET_CELL_INFO: &str = "getCellInfo";
pub const GET_POSITION_FROM_GPS: &str = "getPositionFromGPS";

/// The single reply to a method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodReply {
    Success(String),
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodReply {
    fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(e) => Self::from_error(&e),
        }
    }

    fn from_error(err: &LocationError) -> Self {
        Self::Error {
            code: err.channel_code().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for MethodReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(payload) => write!(f, "success: {payload}"),
            Self::Error { code, message } => write!(f, "error {code}: {message}"),
            Self::NotImplemented => f.write_str("not implemented"),
        }
    }
}

/// Everything the host needs from the bridge, behind its two channels.
pub struct LocationPlugin {
    platform: String,
    acquirer: PositionAcquirer,
    normalizer: CellIdentityNormalizer,
    stream: PositionStreamPublisher,
}

impl LocationPlugin {
    pub fn new(bridge: Arc<dyn PlatformBridge>, config: BridgeConfig) -> Self {
        let platform = bridge.platform_name().to_string();
        info!(
            platform = %platform,
            method_channel = METHOD_CHANNEL,
            event_channel = EVENT_CHANNEL,
            "location plugin attached"
        );
        Self {
            platform,
            acquirer: PositionAcquirer::new(Arc::clone(&bridge), config.clone()),
            normalizer: CellIdentityNormalizer::new(Arc::clone(&bridge), config.clone()),
            stream: PositionStreamPublisher::new(bridge, config),
        }
    }

    pub fn platform_name(&self) -> &str {
        &self.platform
    }

    /// Dispatch one call on the method channel.
    pub async fn on_method_call(&self, method: &str) -> MethodReply {
        debug!(method, "method call");
        match method {
            GET_CELL_INFO => MethodReply::from_result(
                self.normalizer
                    .query_cell_identity()
                    .await
                    .and_then(|cell| cell.to_json()),
            ),
            GET_POSITION_FROM_GPS => MethodReply::from_result(
                self.acquirer
                    .acquire_current_position()
                    .await
                    .map(|sample| sample.to_wire()),
            ),
            _ => MethodReply::NotImplemented,
        }
    }

    /// The host subscribed to the push channel.
    pub fn on_listen(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        self.stream.listen(sink)
    }

    /// The host unsubscribed from the push channel.
    pub fn on_cancel(&self) {
        self.stream.cancel();
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_active()
    }

    /// The host engine is going away.
    pub fn detach(&self) {
        info!("location plugin detached");
        self.on_cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CellBehaviour, FakeBridge, RecordingSink, SinkEvent};
    use aosp_location_bridge::traits::CellInfoEvent;
    use aosp_location_core::error::{CELL_INFO_ERROR, GPS_LOCATION_ERROR};
    use aosp_location_core::types::{CellIdentityRecord, LocationFix};
    use chrono::Utc;

    fn plugin(fake: &Arc<FakeBridge>) -> LocationPlugin {
        LocationPlugin::new(fake.clone(), BridgeConfig::default())
    }

    #[tokio::test]
    async fn position_reply_is_colon_delimited() {
        let cached = LocationFix::new(
            48.8566,
            2.3522,
            Utc::now() - chrono::Duration::seconds(3),
        );
        let fake = Arc::new(FakeBridge::new().with_cached(cached).with_battery(77));

        let reply = plugin(&fake).on_method_call(GET_POSITION_FROM_GPS).await;
        assert_eq!(reply, MethodReply::Success("48.8566:2.3522:77".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn position_timeout_reply() {
        let fake = Arc::new(FakeBridge::new());

        let reply = plugin(&fake).on_method_call(GET_POSITION_FROM_GPS).await;
        assert_eq!(
            reply,
            MethodReply::Error {
                code: GPS_LOCATION_ERROR.into(),
                message: "GPS Timeout".into(),
            }
        );
        assert_eq!(reply.to_string(), "error GPS_LOCATION_ERROR: GPS Timeout");
    }

    #[tokio::test]
    async fn cell_reply_is_flat_json() {
        let fake = Arc::new(FakeBridge::new().with_battery(50).with_cells(
            CellBehaviour::Answer(CellInfoEvent::CellInfo(vec![CellIdentityRecord::Gsm {
                mcc: Some("208".into()),
                mnc: Some("10".into()),
                cid: 12345,
                lac: 6789,
            }])),
        ));

        let reply = plugin(&fake).on_method_call(GET_CELL_INFO).await;
        assert_eq!(
            reply,
            MethodReply::Success(
                r#"{"network_type":"GSM","mcc":"208","mnc":"10","cid":12345,"lac":6789,"lat":-1,"long":-1,"battery_level":50}"#
                    .into()
            )
        );
    }

    #[tokio::test]
    async fn empty_cells_reply_error_never_sentinels() {
        let fake = Arc::new(
            FakeBridge::new().with_cells(CellBehaviour::Answer(CellInfoEvent::CellInfo(vec![]))),
        );

        let reply = plugin(&fake).on_method_call(GET_CELL_INFO).await;
        assert_eq!(
            reply,
            MethodReply::Error {
                code: CELL_INFO_ERROR.into(),
                message: "empty cell info data".into(),
            }
        );
    }

    #[tokio::test]
    async fn unsupported_os_reply() {
        let fake = Arc::new(FakeBridge::new().with_sdk_level(16));

        let reply = plugin(&fake).on_method_call(GET_CELL_INFO).await;
        assert_eq!(
            reply,
            MethodReply::Error {
                code: CELL_INFO_ERROR.into(),
                message: "android version not supported".into(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_method_is_not_implemented() {
        let fake = Arc::new(FakeBridge::new());
        assert_eq!(
            plugin(&fake).on_method_call("getAltitude").await,
            MethodReply::NotImplemented
        );
        assert_eq!(fake.registrations(), 0);
    }

    #[test]
    fn detach_stops_the_stream() {
        let fake = Arc::new(FakeBridge::new().with_battery(20));
        let sink = Arc::new(RecordingSink::default());
        let plugin = plugin(&fake);

        plugin.on_listen(sink.clone()).unwrap();
        assert!(plugin.is_streaming());
        fake.emit(LocationFix::new(1.0, 2.0, Utc::now()));

        plugin.detach();
        fake.emit_late(LocationFix::new(3.0, 4.0, Utc::now()));

        assert!(!plugin.is_streaming());
        assert_eq!(fake.removals(), 1);
        assert_eq!(sink.events(), vec![SinkEvent::Success("1.0:2.0:20".into())]);
    }
}
