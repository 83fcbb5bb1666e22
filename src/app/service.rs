//! FLRig rig service: the device-control surface.
//!
//! [`FlrigRig`] owns the [`RpcClient`] for one connection, the mode
//! alias table and the cached rig state. Every public operation maps to
//! one or a few XML-RPC calls.
//!
//! ```text
//!  caller ──▶ ┌────────────────────────┐ ──▶ RpcClient ──▶ Transport
//!             │        FlrigRig        │
//!             │ caps · modes · state   │
//!             └────────────────────────┘
//! ```
//!
//! A method the remote reports as unavailable is logged and surfaces as
//! [`Error::Unsupported`]; capability probes during [`FlrigRig::open`]
//! turn the same outcome into a `false` capability flag instead.

use embedded_hal::delay::DelayNs;
use heapless::String;
use log::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::rpc::codec::{Params, params};
use crate::rpc::{Mode, ModeTable, Reply, RpcClient, Transport};

use super::types::{ExtParm, Func, Hz, Level, LevelValue, Split, Version, Vfo, VfoState, Width};

/// Capacity for scalar replies (frequencies, flags, levels, names).
const VALUE_CAPACITY: usize = 128;

/// Capacity for the `rig.get_modes` list.
const MODES_CAPACITY: usize = 2048;

/// Offset between FLRig's S-meter reading and dB relative to S9.
const SMETER_S9: i32 = 54;

/// Milliwatts per watt.
const MW_PER_WATT: f32 = 1000.0;

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

/// What the open sequence found out about the remote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    /// `rig.set_verify_vfoA/B` and `rig.set_ptt_fast` exist (FLRig >= 1.3.54).
    pub has_verify_cmds: bool,
    /// Per-VFO mode calls (`rig.get_modeA/B`, `rig.set_modeA/B`).
    pub has_get_mode_a: bool,
    /// Per-VFO bandwidth read (`rig.get_bwA/B`).
    pub has_get_bw_a: bool,
    /// Per-VFO bandwidth set (`rig.set_bwA/B`).
    pub has_set_bw_a: bool,
    /// Full-scale power in watts (`rig.get_pwrmeter_scale`), 1.0 if unknown.
    pub power_scale: f32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            has_verify_cmds: false,
            has_get_mode_a: false,
            has_get_bw_a: false,
            has_set_bw_a: false,
            power_scale: 1.0,
        }
    }
}

/// Last known rig state, updated by every get/set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigState {
    pub current_vfo: Vfo,
    pub ptt: bool,
    pub split: bool,
    pub a: VfoState,
    pub b: VfoState,
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            current_vfo: Vfo::A,
            ptt: false,
            split: false,
            a: VfoState::default(),
            b: VfoState::default(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// FlrigRig
// ───────────────────────────────────────────────────────────────

/// One FLRig connection.
pub struct FlrigRig<T: Transport, D: DelayNs> {
    client: RpcClient<T, D>,
    modes: ModeTable,
    caps: Capabilities,
    state: RigState,
    version: Version,
    info: std::string::String,
    verify_freq: bool,
    verify_ptt: bool,
}

impl<T: Transport, D: DelayNs> FlrigRig<T, D> {
    /// Wrap a connected transport. Call [`open`](Self::open) next.
    pub fn new(transport: T, delay: D, config: &LinkConfig) -> Self {
        Self {
            client: RpcClient::new(transport, delay, config),
            modes: ModeTable::new(),
            caps: Capabilities::default(),
            state: RigState::default(),
            version: Version::default(),
            info: std::string::String::new(),
            verify_freq: config.verify_freq,
            verify_ptt: config.verify_ptt,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Probe the remote and build the mode table.
    ///
    /// Only a broken connection, an unreadable frequency, the current VFO
    /// and the mode list are fatal; every other probe degrades to a
    /// default.
    pub fn open(&mut self) -> Result<()> {
        info!("FLRIG: opening");

        match self.optional("main.get_version")? {
            Some(v) => self.version = Version::parse(&v),
            None => warn!("FLRIG: no version, assuming < {}", Version::VERIFY_CMDS),
        }
        self.caps.has_verify_cmds = self.version >= Version::VERIFY_CMDS;
        info!(
            "FLRIG: version {} (verify commands {})",
            self.version,
            if self.caps.has_verify_cmds { "available" } else { "unavailable" }
        );
        if !self.caps.has_verify_cmds && (self.verify_freq || self.verify_ptt) {
            warn!("FLRIG: verify commands need FLRig >= {}, disabling", Version::VERIFY_CMDS);
            self.verify_freq = false;
            self.verify_ptt = false;
        }

        if let Some(xcvr) = self.optional("rig.get_xcvr")? {
            self.info = xcvr.as_str().into();
        }
        info!("FLRIG: transceiver '{}'", self.info);

        self.caps.power_scale = self
            .optional("rig.get_pwrmeter_scale")?
            .and_then(|s| s.trim().parse::<f32>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(1.0);
        debug!("FLRIG: power meter scale {}", self.caps.power_scale);

        self.caps.has_get_mode_a = self.probe("rig.get_modeA", true)?;

        self.get_freq(Vfo::Current).map_err(|e| {
            error!("FLRIG: frequency read not working: {e}");
            if e.is_connectivity() { e } else { Error::Protocol }
        })?;

        self.caps.has_get_bw_a = self.probe("rig.get_bwA", true)?;
        self.caps.has_set_bw_a = self.probe("rig.set_bwA", false)?;

        let ab = self.query("rig.get_AB", None)?;
        self.state.current_vfo = if ab.trim() == "A" { Vfo::A } else { Vfo::B };
        debug!("FLRIG: current VFO {}", self.state.current_vfo);

        let list = self.query_modes()?;
        self.modes = ModeTable::from_remote(&list);
        info!(
            "FLRIG: modes {}",
            self.modes.modes().map(Mode::name).collect::<Vec<_>>().join(" ")
        );

        if let Err(e) = self.get_split_vfo() {
            if e.is_connectivity() {
                return Err(e);
            }
            warn!("FLRIG: split state unknown: {e}");
        }

        info!("FLRIG: open, caps {:?}", self.caps);
        Ok(())
    }

    /// End the session and hand back the transport.
    pub fn close(self) -> T {
        info!("FLRIG: closing");
        self.client.into_transport()
    }

    // ── Accessors ─────────────────────────────────────────────

    /// Transceiver name reported by FLRig.
    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn state(&self) -> &RigState {
        &self.state
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.client.transport_mut()
    }

    // ── Frequency ─────────────────────────────────────────────

    pub fn get_freq(&mut self, vfo: Vfo) -> Result<Hz> {
        let vfo = self.resolve(vfo);
        let method = if vfo == Vfo::B { "rig.get_vfoB" } else { "rig.get_vfoA" };
        let value = self.query(method, None)?;
        let hz = parse_f64(&value)?;
        if hz <= 0.0 {
            warn!("FLRIG: {method} returned '{value}'");
            return Err(Error::Protocol);
        }
        self.vfo_state(vfo).freq = hz;
        Ok(hz)
    }

    pub fn set_freq(&mut self, vfo: Vfo, hz: Hz) -> Result<()> {
        check_freq(hz)?;
        let vfo = self.resolve(vfo);
        let method = match (vfo, self.verify_freq) {
            (Vfo::B, false) => "rig.set_vfoB",
            (Vfo::B, true) => "rig.set_verify_vfoB",
            (_, false) => "rig.set_vfoA",
            (_, true) => "rig.set_verify_vfoA",
        };
        let p = fragment(params::double(hz, 0))?;
        self.execute(method, Some(&p))?;
        self.vfo_state(vfo).freq = hz;
        Ok(())
    }

    // ── Mode ──────────────────────────────────────────────────

    /// Set mode and, when `width` is non-zero and differs from the cached
    /// width, the passband. Ignored while transmitting.
    pub fn set_mode(&mut self, vfo: Vfo, mode: Mode, width: Width) -> Result<()> {
        if self.state.ptt {
            debug!("FLRIG: PTT on, ignoring set_mode");
            return Ok(());
        }
        let vfo = self.resolve(vfo);
        let Some(alias) = self.modes.first_alias(mode) else {
            warn!("FLRIG: rig has no mode {mode}");
            return Err(Error::InvalidArgument("mode not supported by rig"));
        };
        let p = fragment(params::string(alias))?;

        // Without per-VFO bandwidth calls FLRig only acts on the selected VFO.
        let swap = !self.caps.has_get_bw_a && vfo == Vfo::B && self.state.current_vfo != Vfo::B;
        if swap {
            self.set_vfo(Vfo::B)?;
        }

        let method = match (self.caps.has_get_mode_a, vfo) {
            (false, _) => "rig.set_mode",
            (true, Vfo::B) => "rig.set_modeB",
            (true, _) => {
                // B's mode may follow A on some rigs.
                self.state.b.mode = None;
                "rig.set_modeA"
            }
        };
        self.execute(method, Some(&p))?;

        if width > 0 && self.vfo_state(vfo).width != width {
            let method = match (self.caps.has_set_bw_a, vfo) {
                (false, _) => "rig.set_bw",
                (true, Vfo::B) => "rig.set_bwB",
                (true, _) => "rig.set_bwA",
            };
            let p = fragment(params::i4(i64::from(width)))?;
            self.execute(method, Some(&p))?;
        }

        if swap {
            self.set_vfo(Vfo::A)?;
        }

        let st = self.vfo_state(vfo);
        st.mode = Some(mode);
        if width > 0 {
            st.width = width;
        }
        Ok(())
    }

    /// Current mode and passband width. The mode is `None` when FLRig
    /// reports a name with no canonical counterpart.
    pub fn get_mode(&mut self, vfo: Vfo) -> Result<(Option<Mode>, Width)> {
        let vfo = self.resolve(vfo);
        if self.state.ptt {
            let st = *self.vfo_state(vfo);
            if st.mode.is_some() {
                return Ok((st.mode, st.width));
            }
        }

        let swap = !self.caps.has_get_mode_a && vfo == Vfo::B && self.state.current_vfo != Vfo::B;
        if swap {
            self.set_vfo(Vfo::B)?;
        }

        let method = match (self.caps.has_get_mode_a, vfo) {
            (false, _) => "rig.get_mode",
            (true, Vfo::B) => "rig.get_modeB",
            (true, _) => "rig.get_modeA",
        };
        let name = self.query(method, None)?;
        let mode = self.modes.canonical(name.trim());
        if mode.is_none() {
            warn!("FLRIG: unmapped mode '{name}'");
        }
        self.vfo_state(vfo).mode = mode;

        let method = match (self.caps.has_get_bw_a, vfo) {
            (false, _) => "rig.get_bw",
            (true, Vfo::B) => "rig.get_bwB",
            (true, _) => "rig.get_bwA",
        };
        let bw = self.query(method, None)?;
        let width = parse_width(&bw);
        self.vfo_state(vfo).width = width;

        if swap {
            self.set_vfo(Vfo::A)?;
        }
        Ok((mode, width))
    }

    // ── VFO ───────────────────────────────────────────────────

    pub fn set_vfo(&mut self, vfo: Vfo) -> Result<()> {
        let vfo = match vfo {
            Vfo::Tx => Vfo::B,
            Vfo::Current => self.state.current_vfo,
            v => v,
        };
        let letter = vfo.letter().ok_or(Error::InvalidArgument("unsupported VFO"))?;
        let p = fragment(params::string(letter))?;
        self.execute("rig.set_AB", Some(&p))?;
        self.state.current_vfo = vfo;

        // Some rigs drop split when A is selected.
        if self.state.split && vfo == Vfo::A {
            let p = fragment(params::i4(1))?;
            self.execute("rig.set_split", Some(&p))?;
        }
        Ok(())
    }

    pub fn get_vfo(&mut self) -> Result<Vfo> {
        let value = self.query("rig.get_AB", None)?;
        let vfo = match value.trim().chars().next() {
            Some('A') => Vfo::A,
            Some('B') => Vfo::B,
            _ => {
                warn!("FLRIG: unexpected VFO '{value}'");
                return Err(Error::Protocol);
            }
        };
        self.state.current_vfo = vfo;
        Ok(vfo)
    }

    // ── PTT ───────────────────────────────────────────────────

    pub fn set_ptt(&mut self, on: bool) -> Result<()> {
        let method = if self.verify_ptt { "rig.set_ptt_fast" } else { "rig.set_ptt" };
        let p = fragment(params::i4(i64::from(on)))?;
        self.execute(method, Some(&p))?;
        self.state.ptt = on;
        Ok(())
    }

    pub fn get_ptt(&mut self) -> Result<bool> {
        let value = self.query("rig.get_ptt", None)?;
        let on = parse_int(&value)? != 0;
        self.state.ptt = on;
        Ok(on)
    }

    // ── Split ─────────────────────────────────────────────────

    pub fn get_split_vfo(&mut self) -> Result<Split> {
        let value = self.query("rig.get_split", None)?;
        let enabled = parse_int(&value)? != 0;
        self.state.split = enabled;
        Ok(Split::from_enabled(enabled))
    }

    /// Turn split on or off. The TX VFO is always B. No call is made when
    /// the state already matches or while transmitting.
    pub fn set_split_vfo(&mut self, enabled: bool) -> Result<()> {
        if self.get_split_vfo()?.enabled == enabled {
            return Ok(());
        }
        if self.state.ptt {
            debug!("FLRIG: PTT on, ignoring set_split_vfo");
            return Ok(());
        }
        let p = fragment(params::i4(i64::from(enabled)))?;
        self.execute("rig.set_split", Some(&p))?;
        self.state.split = enabled;
        Ok(())
    }

    pub fn get_split_freq(&mut self) -> Result<Hz> {
        self.get_freq(Vfo::B)
    }

    /// Set the TX (VFO B) frequency, skipping the call if it already matches.
    pub fn set_split_freq(&mut self, hz: Hz) -> Result<()> {
        check_freq(hz)?;
        let current = self.get_freq(Vfo::B)?;
        if (current - hz).abs() < f64::EPSILON {
            return Ok(());
        }
        let p = fragment(params::double(hz, 6))?;
        self.execute("rig.set_vfoB", Some(&p))?;
        self.state.b.freq = hz;
        Ok(())
    }

    /// Set TX frequency and mode on VFO B, then reselect A.
    pub fn set_split_freq_mode(&mut self, hz: Hz, mode: Mode, width: Width) -> Result<()> {
        self.set_freq(Vfo::B, hz)?;
        let (current, _) = self.get_mode(Vfo::B)?;
        if current == Some(mode) {
            return Ok(());
        }
        if self.state.ptt {
            debug!("FLRIG: PTT on, ignoring split mode change");
            return Ok(());
        }
        self.set_mode(Vfo::B, mode, width)?;
        self.set_vfo(Vfo::A)
    }

    /// TX frequency, mode and width (always VFO B).
    pub fn get_split_freq_mode(&mut self, vfo: Vfo) -> Result<(Hz, Option<Mode>, Width)> {
        if !matches!(vfo, Vfo::Current | Vfo::Tx) {
            return Err(Error::InvalidArgument("split is read from the TX VFO"));
        }
        let hz = self.get_freq(Vfo::B)?;
        let (mode, width) = self.get_mode(Vfo::B)?;
        Ok((hz, mode, width))
    }

    // ── Levels ────────────────────────────────────────────────

    /// Set a level from its 0.0–1.0 value.
    pub fn set_level(&mut self, level: Level, value: f32) -> Result<()> {
        let method = level
            .set_method()
            .ok_or(Error::InvalidArgument("level is read only"))?;
        if !value.is_finite() {
            return Err(Error::InvalidArgument("level value"));
        }
        let p = fragment(params::i4((value * 100.0) as i64))?;
        self.execute(method, Some(&p))
    }

    pub fn get_level(&mut self, level: Level) -> Result<LevelValue> {
        let value = self.query(level.get_method(), None)?;
        let scale = self.caps.power_scale;
        Ok(match level {
            Level::Strength => LevelValue::Int(parse_int(&value)? - SMETER_S9),
            Level::RfPower | Level::RfPowerMeter => {
                LevelValue::Float(parse_f64(&value)? as f32 / 100.0 * scale)
            }
            Level::RfPowerMeterWatts => LevelValue::Float(parse_f64(&value)? as f32 * scale),
            Level::Af | Level::Rf | Level::MicGain => {
                LevelValue::Float(parse_f64(&value)? as f32 / 100.0)
            }
        })
    }

    // ── Functions & raw commands ──────────────────────────────

    pub fn set_func(&mut self, func: Func, on: bool) -> Result<()> {
        match func {
            Func::Tuner => {
                let p = fragment(params::string(if on { "1" } else { "0" }))?;
                self.execute("rig.tune", Some(&p))
            }
        }
    }

    /// Pass a raw CAT command through FLRig to the radio.
    pub fn cat_string(&mut self, command: &str) -> Result<()> {
        if command.is_empty() || command.contains(['<', '>', '&']) {
            return Err(Error::InvalidArgument("CAT command"));
        }
        let p = fragment(params::string(command))?;
        self.execute("rig.cat_string", Some(&p))
    }

    // ── Power conversion ──────────────────────────────────────

    /// Convert a 0.0–1.0 power setting to milliwatts.
    pub fn power_to_mw(&self, power: f32) -> u32 {
        (power.clamp(0.0, 1.0) * self.caps.power_scale * MW_PER_WATT).round() as u32
    }

    /// Convert milliwatts to a 0.0–1.0 power setting.
    pub fn mw_to_power(&self, mw: u32) -> f32 {
        (mw as f32 / (self.caps.power_scale * MW_PER_WATT)).clamp(0.0, 1.0)
    }

    // ── Backend parameters ────────────────────────────────────

    pub fn set_ext_parm(&mut self, parm: ExtParm, on: bool) -> Result<()> {
        if on && !self.caps.has_verify_cmds {
            warn!(
                "FLRIG: {} needs FLRig {} or newer",
                parm.name(),
                Version::VERIFY_CMDS
            );
            return Err(Error::InvalidArgument("FLRig too old for verify commands"));
        }
        match parm {
            ExtParm::VerifyFreq => self.verify_freq = on,
            ExtParm::VerifyPtt => self.verify_ptt = on,
        }
        debug!("FLRIG: {}={}", parm.name(), if on { "ON" } else { "OFF" });
        Ok(())
    }

    pub fn get_ext_parm(&self, parm: ExtParm) -> bool {
        match parm {
            ExtParm::VerifyFreq => self.verify_freq,
            ExtParm::VerifyPtt => self.verify_ptt,
        }
    }

    // ── Internals ─────────────────────────────────────────────

    fn resolve(&self, vfo: Vfo) -> Vfo {
        match vfo {
            Vfo::Current => self.state.current_vfo,
            Vfo::Tx if self.state.split => Vfo::B,
            Vfo::Tx => self.state.current_vfo,
            v => v,
        }
    }

    fn vfo_state(&mut self, vfo: Vfo) -> &mut VfoState {
        if vfo == Vfo::B { &mut self.state.b } else { &mut self.state.a }
    }

    fn query(&mut self, method: &str, params: Option<&str>) -> Result<String<VALUE_CAPACITY>> {
        match self.client.query::<VALUE_CAPACITY>(method, params)? {
            Reply::Value(v) => Ok(v),
            Reply::Unavailable => {
                warn!("FLRIG: {method} not supported");
                Err(Error::Unsupported)
            }
        }
    }

    fn query_modes(&mut self) -> Result<String<MODES_CAPACITY>> {
        match self.client.query::<MODES_CAPACITY>("rig.get_modes", None)? {
            Reply::Value(v) => Ok(v),
            Reply::Unavailable => Err(Error::Unsupported),
        }
    }

    fn execute(&mut self, method: &str, params: Option<&str>) -> Result<()> {
        match self.client.execute(method, params)? {
            Reply::Value(()) => Ok(()),
            Reply::Unavailable => {
                warn!("FLRIG: {method} not supported");
                Err(Error::Unsupported)
            }
        }
    }

    /// A value the open sequence can live without. Only connectivity
    /// errors propagate.
    fn optional(&mut self, method: &str) -> Result<Option<String<VALUE_CAPACITY>>> {
        match self.client.query::<VALUE_CAPACITY>(method, None) {
            Ok(Reply::Value(v)) => Ok(Some(v)),
            Ok(Reply::Unavailable) => Ok(None),
            Err(e) if e.is_connectivity() => Err(e),
            Err(e) => {
                warn!("FLRIG: {method} failed, not fatal: {e}");
                Ok(None)
            }
        }
    }

    /// Whether the remote implements `method`. Anything but an explicit
    /// "unknown method" counts as implemented.
    fn probe(&mut self, method: &str, want_value: bool) -> Result<bool> {
        let reply = if want_value {
            self.client
                .query::<VALUE_CAPACITY>(method, None)
                .map(|r| r.map(|_| ()))
        } else {
            self.client.execute(method, None)
        };
        match reply {
            Ok(Reply::Unavailable) => {
                debug!("FLRIG: {method} is not available");
                Ok(false)
            }
            Ok(Reply::Value(())) => {
                debug!("FLRIG: {method} is available");
                Ok(true)
            }
            Err(e) if e.is_connectivity() => Err(e),
            Err(e) => {
                debug!("FLRIG: {method} probe inconclusive ({e}), assuming available");
                Ok(true)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Value parsing
// ───────────────────────────────────────────────────────────────

fn fragment(p: Option<Params>) -> Result<Params> {
    p.ok_or(Error::InvalidArgument("argument too long"))
}

fn check_freq(hz: Hz) -> Result<()> {
    if hz.is_finite() && hz > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument("frequency"))
    }
}

fn parse_f64(value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        warn!("FLRIG: expected a number, got '{value}'");
        Error::Protocol
    })
}

fn parse_int(value: &str) -> Result<i32> {
    let v = value.trim();
    v.parse::<i32>()
        .or_else(|_| v.parse::<f64>().map(|f| f as i32))
        .map_err(|_| {
            warn!("FLRIG: expected an integer, got '{value}'");
            Error::Protocol
        })
}

/// FLRig may report the passband as `low|high`; the width is the second.
fn parse_width(value: &str) -> Width {
    let v = value.split_once('|').map_or(value, |(_, hi)| hi);
    parse_int(v).map_or(0, |w| w.max(0) as Width)
}
