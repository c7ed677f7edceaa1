// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AOSP location probe
//
// Entry point. Initialises logging, builds the bridge (simulated unless
// `--native`), attaches the location plugin and drives one of its channels,
// printing the replies exactly as the host would receive them.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use aosp_location_bridge::{CellScript, PlatformBridge, Scenario, SimulatedBridge};
use aosp_location_core::error::Result;
use aosp_location_core::types::{CellIdentityRecord, NetworkType};
use aosp_location_core::BridgeConfig;
use aosp_location_service::plugin::{GET_CELL_INFO, GET_POSITION_FROM_GPS};
use aosp_location_service::{EventSink, LocationPlugin, MethodReply};

#[derive(Parser)]
#[command(name = "aosp-location-probe", version, about = "Drive the AOSP location bridge channels")]
struct Cli {
    /// JSON bridge configuration (missing fields take defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the platform bridge instead of the simulation.
    #[arg(long)]
    native: bool,

    #[command(flatten)]
    sim: SimulationArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SimulationArgs {
    /// Simulated latitude in degrees.
    #[arg(long, default_value_t = 48.8566, allow_hyphen_values = true)]
    lat: f64,

    /// Simulated longitude in degrees.
    #[arg(long, default_value_t = 2.3522, allow_hyphen_values = true)]
    lon: f64,

    /// Simulated battery charge.
    #[arg(long, default_value_t = 77, value_parser = clap::value_parser!(u8).range(0..=100))]
    battery: u8,

    /// Age of the OS-cached fix; no cached fix when omitted.
    #[arg(long)]
    fix_age_ms: Option<u64>,

    /// Delay before the first live fix.
    #[arg(long, default_value_t = 1_000)]
    live_delay_ms: u64,

    /// The receiver never gets a live fix.
    #[arg(long)]
    no_live: bool,

    /// Technology of the simulated serving cell.
    #[arg(long, default_value = "GSM", value_parser = parse_network)]
    network: NetworkType,

    /// The radio reports no visible cells.
    #[arg(long)]
    empty_cells: bool,

    /// Simulated OS API level.
    #[arg(long, default_value_t = 34)]
    sdk_level: u32,
}

#[derive(Subcommand)]
enum Command {
    /// `getPositionFromGPS` on the method channel.
    Position,
    /// `getCellInfo` on the method channel.
    CellInfo,
    /// Subscribe to the push channel and print `count` events.
    Stream {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Any method name, to exercise dispatch.
    Call { method: String },
}

fn parse_network(tag: &str) -> std::result::Result<NetworkType, String> {
    NetworkType::from_tag(tag).ok_or_else(|| format!("unknown network type `{tag}`"))
}

/// A representative serving cell for each technology.
fn sample_cell(network: NetworkType, lat: f64, lon: f64) -> CellIdentityRecord {
    let operator = || (Some("208".to_string()), Some("10".to_string()));
    match network {
        NetworkType::Cdma => CellIdentityRecord::Cdma {
            // Quarter-seconds of arc.
            latitude: (lat * 14_400.0) as i32,
            longitude: (lon * 14_400.0) as i32,
        },
        NetworkType::Gsm => {
            let (mcc, mnc) = operator();
            CellIdentityRecord::Gsm { mcc, mnc, cid: 12345, lac: 6789 }
        }
        NetworkType::Lte => {
            let (mcc, mnc) = operator();
            CellIdentityRecord::Lte { mcc, mnc, ci: 26_000_001, tac: 6789 }
        }
        NetworkType::Nr => {
            let (mcc, mnc) = operator();
            CellIdentityRecord::Nr { mcc, mnc, nci: 68_719_476_735, tac: 6789 }
        }
        NetworkType::Tdscdma => {
            let (mcc, mnc) = operator();
            CellIdentityRecord::Tdscdma { mcc, mnc, cid: 12345, lac: 6789 }
        }
        NetworkType::Wcdma => {
            let (mcc, mnc) = operator();
            CellIdentityRecord::Wcdma { mcc, mnc, cid: 12345, lac: 6789 }
        }
        NetworkType::Unknown => CellIdentityRecord::Unknown,
    }
}

impl SimulationArgs {
    fn scenario(&self) -> Scenario {
        let cells = if self.empty_cells {
            Vec::new()
        } else {
            vec![sample_cell(self.network, self.lat, self.lon)]
        };
        Scenario {
            latitude: self.lat,
            longitude: self.lon,
            cached_fix_age: self.fix_age_ms.map(Duration::from_millis),
            live_fix_delay: (!self.no_live).then(|| Duration::from_millis(self.live_delay_ms)),
            battery_level: self.battery,
            sdk_level: self.sdk_level,
            cells: CellScript::Cells(cells),
        }
    }
}

/// Forwards push-channel events to the printing loop.
struct ChannelSink(mpsc::UnboundedSender<String>);

impl EventSink for ChannelSink {
    fn success(&self, event: String) {
        let _ = self.0.send(format!("event: {event}"));
    }

    fn error(&self, code: &str, message: &str) {
        let _ = self.0.send(format!("event error {code}: {message}"));
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    let bridge: Arc<dyn PlatformBridge> = if cli.native {
        aosp_location_bridge::platform_bridge()
    } else {
        Arc::new(SimulatedBridge::new(cli.sim.scenario()))
    };

    let plugin = LocationPlugin::new(bridge, config);
    tracing::info!(platform = plugin.platform_name(), "AOSP location probe starting");

    let reply = match cli.command {
        Command::Position => plugin.on_method_call(GET_POSITION_FROM_GPS).await,
        Command::CellInfo => plugin.on_method_call(GET_CELL_INFO).await,
        Command::Call { method } => plugin.on_method_call(&method).await,
        Command::Stream { count } => {
            stream(&plugin, count).await?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    println!("{reply}");
    Ok(match reply {
        MethodReply::Success(_) => ExitCode::SUCCESS,
        MethodReply::Error { .. } | MethodReply::NotImplemented => ExitCode::FAILURE,
    })
}

async fn stream(plugin: &LocationPlugin, count: usize) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    plugin.on_listen(Arc::new(ChannelSink(tx)))?;

    for _ in 0..count {
        match rx.recv().await {
            Some(line) => println!("{line}"),
            None => break,
        }
    }

    plugin.on_cancel();
    Ok(())
}
