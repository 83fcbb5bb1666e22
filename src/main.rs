//! `flrig-probe` — connect to FLRig, run the open sequence and report.
//!
//! ```text
//! flrig-probe [--address host:port] [--config link.json] [-v…] [COMMAND]
//!
//!   status            identity, capabilities, VFOs, PTT, split (default)
//!   modes             mode alias table
//!   freq <HZ> [VFO]   set a frequency
//!   mode <MODE> [W]   set the current VFO's mode and passband
//!   ptt <on|off>      key or unkey the transmitter
//!   cat <COMMAND>     pass a raw CAT string through to the radio
//! ```
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, info};

use flrig_link::adapters::tcp_transport::TcpTransport;
use flrig_link::adapters::time::{StdDelay, elapsed_ms};
use flrig_link::app::{FlrigRig, Level, Vfo};
use flrig_link::config::LinkConfig;
use flrig_link::rpc::Mode;

#[derive(Debug, Parser)]
#[command(name = "flrig-probe", about = "Query and drive a running FLRig", version, long_about = None)]
struct Cli {
    /// FLRig XML-RPC endpoint (`host:port`). Overrides the config file.
    #[arg(long, short)]
    address: Option<String>,

    /// JSON link configuration; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Client port announced to FLRig in each request.
    #[arg(long)]
    client_port: Option<u16>,

    /// Per-read timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u32>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print identity, capabilities and current rig state.
    Status,
    /// Print every supported mode with FLRig's names for it.
    Modes,
    /// Set a VFO frequency in hertz.
    Freq {
        hz: f64,
        /// A, B, curr or TX.
        #[arg(default_value = "curr")]
        vfo: String,
    },
    /// Set the mode (and optionally the passband width) of the current VFO.
    Mode {
        mode: String,
        #[arg(default_value_t = 0)]
        width: u32,
    },
    /// Key (`on`) or unkey (`off`) the transmitter.
    Ptt { state: String },
    /// Send a raw CAT command.
    Cat { command: String },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    info!(
        "flrig-probe connecting to {} (worst case {} ms per call)",
        config.address,
        config.worst_case_call_ms()
    );

    let started = Instant::now();
    let transport = TcpTransport::from_config(&config)
        .map_err(|e| anyhow::anyhow!("connect to {}: {e}", config.address))?;
    let mut rig = FlrigRig::new(transport, StdDelay::new(), &config);
    rig.open().context("FLRig open sequence")?;
    info!("open sequence took {} ms", elapsed_ms(started));

    match args.command.unwrap_or(Command::Status) {
        Command::Status => print_status(&mut rig)?,
        Command::Modes => print_modes(&rig),
        Command::Freq { hz, vfo } => {
            let vfo: Vfo = vfo.parse().context("VFO")?;
            rig.set_freq(vfo, hz).context("set frequency")?;
            println!("{vfo}: {:.0} Hz", rig.get_freq(vfo).context("read back frequency")?);
        }
        Command::Mode { mode, width } => {
            let mode: Mode = mode.parse().context("mode")?;
            rig.set_mode(Vfo::Current, mode, width).context("set mode")?;
            let (mode, width) = rig.get_mode(Vfo::Current).context("read back mode")?;
            println!("mode: {} {width} Hz", mode.map_or("?", Mode::name));
        }
        Command::Ptt { state } => {
            let on = match state.to_ascii_lowercase().as_str() {
                "on" | "1" | "tx" => true,
                "off" | "0" | "rx" => false,
                other => bail!("PTT state must be on or off, not '{other}'"),
            };
            rig.set_ptt(on).context("set PTT")?;
            println!("ptt: {}", if rig.get_ptt()? { "on" } else { "off" });
        }
        Command::Cat { command } => rig.cat_string(&command).context("CAT command")?,
    }

    rig.close();
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(args: &Cli) -> Result<LinkConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?
        }
        None => LinkConfig::default(),
    };
    if let Some(address) = &args.address {
        config.address.clone_from(address);
    }
    if args.client_port.is_some() {
        config.client_port = args.client_port;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout_ms = ms;
    }
    Ok(config)
}

fn print_status(rig: &mut FlrigRig<TcpTransport, StdDelay>) -> Result<()> {
    let caps = *rig.capabilities();
    println!("transceiver: {}", rig.info());
    println!("flrig:       {}", rig.version());
    println!(
        "caps:        modeA={} bwA={} set_bwA={} verify={} scale={} W",
        caps.has_get_mode_a, caps.has_get_bw_a, caps.has_set_bw_a, caps.has_verify_cmds, caps.power_scale
    );

    let vfo = rig.get_vfo()?;
    for v in [Vfo::A, Vfo::B] {
        let hz = rig.get_freq(v).with_context(|| format!("read {v}"))?;
        let marker = if v == vfo { '*' } else { ' ' };
        println!("{marker}{v}:       {hz:.0} Hz");
    }

    let (mode, width) = rig.get_mode(Vfo::Current)?;
    println!("mode:        {} {width} Hz", mode.map_or("?", Mode::name));
    println!("ptt:         {}", if rig.get_ptt()? { "on" } else { "off" });

    let split = rig.get_split_vfo()?;
    println!(
        "split:       {}",
        if split.enabled { format!("on (TX {})", split.tx_vfo) } else { "off".into() }
    );

    match rig.get_level(Level::Strength) {
        Ok(s) => println!("s-meter:     {s} dB rel S9"),
        Err(e) => info!("s-meter not readable: {e}"),
    }
    Ok(())
}

fn print_modes(rig: &FlrigRig<TcpTransport, StdDelay>) {
    let table = rig.modes();
    for mode in table.modes() {
        println!("{:<8} {}", mode.name(), table.alias_string(mode).unwrap_or(""));
    }
}
