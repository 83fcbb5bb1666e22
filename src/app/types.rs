//! Rig-control value types.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;
use crate::rpc::Mode;

/// Frequency in hertz.
pub type Hz = f64;

/// Passband width in hertz. `0` means "unknown / leave unchanged".
pub type Width = u32;

/// VFO selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vfo {
    A,
    B,
    /// Whichever VFO is currently selected.
    Current,
    /// The transmit VFO; FLRig always transmits split on B.
    Tx,
}

impl Vfo {
    /// FLRig's `rig.set_AB` / `rig.get_AB` letter.
    pub fn letter(self) -> Option<&'static str> {
        match self {
            Vfo::A => Some("A"),
            Vfo::B => Some("B"),
            Vfo::Current | Vfo::Tx => None,
        }
    }
}

impl fmt::Display for Vfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vfo::A => f.write_str("VFOA"),
            Vfo::B => f.write_str("VFOB"),
            Vfo::Current => f.write_str("currVFO"),
            Vfo::Tx => f.write_str("TX"),
        }
    }
}

impl FromStr for Vfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" | "VFOA" => Ok(Vfo::A),
            "B" | "VFOB" => Ok(Vfo::B),
            "CURR" | "CURRVFO" => Ok(Vfo::Current),
            "TX" => Ok(Vfo::Tx),
            _ => Err(Error::InvalidArgument("unknown VFO")),
        }
    }
}

/// Readable and settable levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Audio volume, 0.0–1.0.
    Af,
    /// RF gain, 0.0–1.0.
    Rf,
    /// Microphone gain, 0.0–1.0.
    MicGain,
    /// RF power setting, 0.0–1.0 of the power-meter scale.
    RfPower,
    /// S-meter, dB relative to S9 (read only).
    Strength,
    /// Power meter, fraction of full scale (read only).
    RfPowerMeter,
    /// Power meter in watts (read only).
    RfPowerMeterWatts,
}

impl Level {
    pub(crate) fn get_method(self) -> &'static str {
        match self {
            Level::Af => "rig.get_volume",
            Level::Rf => "rig.get_rfgain",
            Level::MicGain => "rig.get_micgain",
            Level::RfPower => "rig.get_power",
            Level::Strength => "rig.get_smeter",
            Level::RfPowerMeter | Level::RfPowerMeterWatts => "rig.get_pwrmeter",
        }
    }

    pub(crate) fn set_method(self) -> Option<&'static str> {
        match self {
            Level::Af => Some("rig.set_volume"),
            Level::Rf => Some("rig.set_rfgain"),
            Level::MicGain => Some("rig.set_micgain"),
            Level::RfPower => Some("rig.set_power"),
            Level::Strength | Level::RfPowerMeter | Level::RfPowerMeterWatts => None,
        }
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AF" => Ok(Level::Af),
            "RF" => Ok(Level::Rf),
            "MICGAIN" => Ok(Level::MicGain),
            "RFPOWER" => Ok(Level::RfPower),
            "STRENGTH" => Ok(Level::Strength),
            "RFPOWER_METER" => Ok(Level::RfPowerMeter),
            "RFPOWER_METER_WATTS" => Ok(Level::RfPowerMeterWatts),
            _ => Err(Error::InvalidArgument("unknown level")),
        }
    }
}

/// A level reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelValue {
    Int(i32),
    Float(f32),
}

impl fmt::Display for LevelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelValue::Int(i) => write!(f, "{i}"),
            LevelValue::Float(v) => write!(f, "{v:.3}"),
        }
    }
}

/// On/off functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    /// Start an antenna tuner cycle.
    Tuner,
}

/// Backend parameters that change which FLRig calls are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtParm {
    /// Set frequency with `rig.set_verify_vfoA/B`.
    VerifyFreq,
    /// Key PTT with `rig.set_ptt_fast`.
    VerifyPtt,
}

impl ExtParm {
    pub fn name(self) -> &'static str {
        match self {
            ExtParm::VerifyFreq => "VERIFY_FREQ",
            ExtParm::VerifyPtt => "VERIFY_PTT",
        }
    }
}

/// Split state. FLRig always transmits split on VFO B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub enabled: bool,
    pub tx_vfo: Vfo,
}

impl Split {
    pub fn from_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            tx_vfo: if enabled { Vfo::B } else { Vfo::A },
        }
    }
}

/// FLRig version as reported by `main.get_version`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
}

impl Version {
    /// First release with `rig.set_verify_vfoA/B` and `rig.set_ptt_fast`.
    pub const VERIFY_CMDS: Version = Version::new(1, 3, 54, 0);

    pub const fn new(major: u16, minor: u16, patch: u16, build: u16) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Parse `major.minor.patch[.build]`. Missing or malformed fields
    /// read as zero, so anything unparsable compares as very old.
    pub fn parse(text: &str) -> Self {
        let mut fields = text.trim().split('.').map(|f| {
            let digits = f.find(|c: char| !c.is_ascii_digit()).map_or(f, |end| &f[..end]);
            digits.parse::<u16>().unwrap_or(0)
        });
        let mut next = || fields.next().unwrap_or(0);
        Self::new(next(), next(), next(), next())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.build)
    }
}

/// Per-VFO cached state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VfoState {
    pub freq: Hz,
    pub mode: Option<Mode>,
    pub width: Width,
}
