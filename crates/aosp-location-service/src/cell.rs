// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cell identity normaliser: one telephony snapshot, serving cell only,
// projected into the flat record the host consumes.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use aosp_location_bridge::traits::{CellInfoEvent, PlatformBridge};
use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::types::{CellIdentity, CellIdentityRecord, NO_MCC, NO_MNC};
use aosp_location_core::BridgeConfig;

/// Project a technology-specific record into the flat shape. Fields the
/// technology does not define keep their sentinels.
pub fn normalize(record: &CellIdentityRecord, battery_level: u8) -> CellIdentity {
    let mut cell = CellIdentity::unset(record.network_type(), battery_level);

    match record {
        CellIdentityRecord::Cdma {
            latitude,
            longitude,
        } => {
            cell.lat = *latitude;
            cell.long = *longitude;
        }
        CellIdentityRecord::Gsm { mcc, mnc, cid, lac }
        | CellIdentityRecord::Tdscdma { mcc, mnc, cid, lac }
        | CellIdentityRecord::Wcdma { mcc, mnc, cid, lac } => {
            set_operator(&mut cell, mcc, mnc);
            cell.cid = i64::from(*cid);
            cell.lac = *lac;
        }
        CellIdentityRecord::Lte { mcc, mnc, ci, tac } => {
            set_operator(&mut cell, mcc, mnc);
            cell.cid = i64::from(*ci);
            cell.lac = *tac;
        }
        CellIdentityRecord::Nr { mcc, mnc, nci, tac } => {
            set_operator(&mut cell, mcc, mnc);
            cell.cid = *nci;
            cell.lac = *tac;
        }
        CellIdentityRecord::Unknown => {}
    }

    cell
}

fn set_operator(cell: &mut CellIdentity, mcc: &Option<String>, mnc: &Option<String>) {
    cell.mcc = mcc.clone().unwrap_or_else(|| NO_MCC.to_string());
    cell.mnc = mnc.clone().unwrap_or_else(|| NO_MNC.to_string());
}

/// Answers cell identity queries against the platform bridge.
pub struct CellIdentityNormalizer {
    bridge: Arc<dyn PlatformBridge>,
    config: BridgeConfig,
}

impl CellIdentityNormalizer {
    pub fn new(bridge: Arc<dyn PlatformBridge>, config: BridgeConfig) -> Self {
        Self { bridge, config }
    }

    /// Identity of the serving cell, stamped with the battery level.
    ///
    /// # Errors
    ///
    /// [`LocationError::CellInfoUnsupported`] below the minimum OS level
    /// (no request is issued), [`LocationError::CellInfoEmpty`] when the
    /// radio reports no cells, [`LocationError::CellInfoError`] for any
    /// provider failure.
    pub async fn query_cell_identity(&self) -> Result<CellIdentity> {
        let sdk_level = self.bridge.sdk_level().map_err(provider_error)?;
        if sdk_level < self.config.min_sdk_level {
            warn!(
                sdk_level,
                min_sdk_level = self.config.min_sdk_level,
                "cell info not supported on this OS version"
            );
            return Err(LocationError::CellInfoUnsupported {
                sdk_level,
                min_sdk_level: self.config.min_sdk_level,
            });
        }

        let (tx, rx) = oneshot::channel();
        self.bridge
            .request_cell_info_update(Box::new(move |event| {
                let _ = tx.send(event);
            }))
            .map_err(provider_error)?;

        let event = rx
            .await
            .map_err(|_| LocationError::CellInfoError("cell info callback dropped".into()))?;

        let cells = match event {
            CellInfoEvent::CellInfo(cells) => cells,
            CellInfoEvent::Error { code, detail } => {
                let message = detail.unwrap_or_else(|| format!("cell info error {code}"));
                warn!(code, %message, "telephony provider reported an error");
                return Err(LocationError::CellInfoError(message));
            }
        };

        debug!(candidates = cells.len(), "cell info received");
        let Some(serving) = cells.into_iter().next() else {
            return Err(LocationError::CellInfoEmpty);
        };

        let battery_level = self.bridge.battery_level().map_err(provider_error)?;
        let cell = normalize(&serving, battery_level);
        info!(network_type = %cell.network_type, cid = cell.cid, "cell identity resolved");
        Ok(cell)
    }
}

fn provider_error(e: LocationError) -> LocationError {
    match e {
        LocationError::CellInfoError(_) => e,
        other => LocationError::CellInfoError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CellBehaviour, FakeBridge};
    use aosp_location_core::types::{NetworkType, UNSET};
    use aosp_location_core::error::{CELL_INFO_ERROR, ErrorKind};

    fn op(code: &str) -> Option<String> {
        Some(code.to_string())
    }

    fn normalizer(fake: &Arc<FakeBridge>) -> CellIdentityNormalizer {
        CellIdentityNormalizer::new(fake.clone(), BridgeConfig::default())
    }

    #[test]
    fn gsm_example_serializes_exactly() {
        let record = CellIdentityRecord::Gsm {
            mcc: op("208"),
            mnc: op("10"),
            cid: 12345,
            lac: 6789,
        };
        assert_eq!(
            normalize(&record, 50).to_json().unwrap(),
            r#"{"network_type":"GSM","mcc":"208","mnc":"10","cid":12345,"lac":6789,"lat":-1,"long":-1,"battery_level":50}"#
        );
    }

    #[test]
    fn cdma_fills_only_coordinates() {
        let cell = normalize(
            &CellIdentityRecord::Cdma {
                latitude: 175_000,
                longitude: -42_000,
            },
            9,
        );
        assert_eq!(
            cell,
            CellIdentity {
                lat: 175_000,
                long: -42_000,
                ..CellIdentity::unset(NetworkType::Cdma, 9)
            }
        );
        assert_eq!((cell.mcc.as_str(), cell.mnc.as_str()), (NO_MCC, NO_MNC));
        assert_eq!((cell.cid, cell.lac), (-1, UNSET));
    }

    #[test]
    fn lte_uses_ci_and_tac() {
        let cell = normalize(
            &CellIdentityRecord::Lte {
                mcc: op("310"),
                mnc: op("260"),
                ci: 26_000_001,
                tac: 1234,
            },
            80,
        );
        assert_eq!(
            cell,
            CellIdentity {
                mcc: "310".into(),
                mnc: "260".into(),
                cid: 26_000_001,
                lac: 1234,
                ..CellIdentity::unset(NetworkType::Lte, 80)
            }
        );
        assert_eq!((cell.lat, cell.long), (UNSET, UNSET));
    }

    #[test]
    fn nr_keeps_full_64_bit_nci() {
        let cell = normalize(
            &CellIdentityRecord::Nr {
                mcc: op("208"),
                mnc: op("01"),
                nci: 68_719_476_735,
                tac: 77,
            },
            80,
        );
        assert_eq!(
            cell,
            CellIdentity {
                mcc: "208".into(),
                mnc: "01".into(),
                cid: 68_719_476_735,
                lac: 77,
                ..CellIdentity::unset(NetworkType::Nr, 80)
            }
        );
        assert_eq!((cell.lat, cell.long), (UNSET, UNSET));
    }

    #[test]
    fn tdscdma_and_wcdma_use_cid_and_lac() {
        for record in [
            CellIdentityRecord::Tdscdma {
                mcc: op("460"),
                mnc: op("00"),
                cid: 4242,
                lac: 17,
            },
            CellIdentityRecord::Wcdma {
                mcc: op("460"),
                mnc: op("00"),
                cid: 4242,
                lac: 17,
            },
        ] {
            assert_eq!(
                normalize(&record, 33),
                CellIdentity {
                    mcc: "460".into(),
                    mnc: "00".into(),
                    cid: 4242,
                    lac: 17,
                    ..CellIdentity::unset(record.network_type(), 33)
                }
            );
        }
    }

    #[test]
    fn gsm_sets_operator_cid_and_lac_only() {
        let cell = normalize(
            &CellIdentityRecord::Gsm {
                mcc: op("208"),
                mnc: op("10"),
                cid: 12345,
                lac: 6789,
            },
            50,
        );
        assert_eq!(
            cell,
            CellIdentity {
                mcc: "208".into(),
                mnc: "10".into(),
                cid: 12345,
                lac: 6789,
                ..CellIdentity::unset(NetworkType::Gsm, 50)
            }
        );
    }

    #[test]
    fn missing_operator_codes_fall_back_to_sentinels() {
        let cell = normalize(
            &CellIdentityRecord::Wcdma {
                mcc: None,
                mnc: op("15"),
                cid: 1,
                lac: 2,
            },
            10,
        );
        assert_eq!(cell.mcc, NO_MCC);
        assert_eq!(cell.mnc, "15");
    }

    #[test]
    fn unknown_technology_is_all_sentinels() {
        let cell = normalize(&CellIdentityRecord::Unknown, 42);
        assert_eq!(cell, CellIdentity::unset(NetworkType::Unknown, 42));
        assert!(cell.to_json().unwrap().contains(r#""network_type":"no_type""#));
    }

    #[tokio::test]
    async fn first_candidate_is_the_serving_cell() {
        let fake = Arc::new(
            FakeBridge::new()
                .with_battery(50)
                .with_cells(CellBehaviour::Answer(CellInfoEvent::CellInfo(vec![
                    CellIdentityRecord::Lte {
                        mcc: op("208"),
                        mnc: op("20"),
                        ci: 1,
                        tac: 2,
                    },
                    CellIdentityRecord::Gsm {
                        mcc: op("208"),
                        mnc: op("10"),
                        cid: 3,
                        lac: 4,
                    },
                ]))),
        );

        let cell = normalizer(&fake).query_cell_identity().await.unwrap();

        assert_eq!(cell.network_type, NetworkType::Lte);
        assert_eq!(cell.cid, 1);
        assert_eq!(cell.battery_level, 50);
        assert_eq!(fake.cell_requests(), 1);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_an_error() {
        let fake = Arc::new(
            FakeBridge::new().with_cells(CellBehaviour::Answer(CellInfoEvent::CellInfo(vec![]))),
        );

        let err = normalizer(&fake).query_cell_identity().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CellInfoEmpty);
        assert_eq!(err.channel_code(), CELL_INFO_ERROR);
        assert_eq!(err.to_string(), "empty cell info data");
    }

    #[tokio::test]
    async fn provider_error_carries_detail() {
        let fake = Arc::new(FakeBridge::new().with_cells(CellBehaviour::Answer(
            CellInfoEvent::Error {
                code: 1,
                detail: Some("modem timed out".into()),
            },
        )));

        let err = normalizer(&fake).query_cell_identity().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CellInfoError);
        assert_eq!(err.to_string(), "modem timed out");
    }

    #[tokio::test]
    async fn provider_error_without_detail_names_the_code() {
        let fake = Arc::new(FakeBridge::new().with_cells(CellBehaviour::Answer(
            CellInfoEvent::Error {
                code: 2,
                detail: None,
            },
        )));

        let err = normalizer(&fake).query_cell_identity().await.unwrap_err();
        assert_eq!(err.to_string(), "cell info error 2");
    }

    #[tokio::test]
    async fn old_os_fails_before_any_request() {
        let fake = Arc::new(FakeBridge::new().with_sdk_level(19));

        let err = normalizer(&fake).query_cell_identity().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CellInfoUnsupported);
        assert_eq!(err.channel_code(), CELL_INFO_ERROR);
        assert_eq!(fake.cell_requests(), 0);
    }

    #[tokio::test]
    async fn dropped_callback_is_an_error() {
        let fake = Arc::new(FakeBridge::new().with_cells(CellBehaviour::Drop));

        let err = normalizer(&fake).query_cell_identity().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CellInfoError);
    }

    #[tokio::test]
    async fn request_failure_is_cell_info_error() {
        // No scripted behaviour: the fake rejects the request outright.
        let fake = Arc::new(FakeBridge::new());

        let err = normalizer(&fake).query_cell_identity().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CellInfoError);
        assert!(err.to_string().contains("telephony service unavailable"));
    }
}
