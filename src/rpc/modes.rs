//! Mode table: canonical operating modes ↔ the remote's vendor mode names.
//!
//! Built once per connection from the `rig.get_modes` list. Each canonical
//! mode keeps its aliases in one delimited string, `|USB-D|DATA-U|`, so a
//! lookup for `|AM|` can never match inside `|AM-D|`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, trace, warn};

use crate::error::Error;

/// Canonical operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Usb,
    Lsb,
    PktUsb,
    PktLsb,
    Am,
    PktAm,
    Amn,
    Fm,
    Fmn,
    Wfm,
    PktFm,
    Cw,
    Cwr,
    Rtty,
    Rttyr,
    Dsb,
    Sah,
    Sal,
    Sam,
    C4fm,
    Spec,
}

impl Mode {
    pub const ALL: [Mode; 21] = [
        Mode::Usb,
        Mode::Lsb,
        Mode::PktUsb,
        Mode::PktLsb,
        Mode::Am,
        Mode::PktAm,
        Mode::Amn,
        Mode::Fm,
        Mode::Fmn,
        Mode::Wfm,
        Mode::PktFm,
        Mode::Cw,
        Mode::Cwr,
        Mode::Rtty,
        Mode::Rttyr,
        Mode::Dsb,
        Mode::Sah,
        Mode::Sal,
        Mode::Sam,
        Mode::C4fm,
        Mode::Spec,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Usb => "USB",
            Mode::Lsb => "LSB",
            Mode::PktUsb => "PKTUSB",
            Mode::PktLsb => "PKTLSB",
            Mode::Am => "AM",
            Mode::PktAm => "PKTAM",
            Mode::Amn => "AMN",
            Mode::Fm => "FM",
            Mode::Fmn => "FMN",
            Mode::Wfm => "WFM",
            Mode::PktFm => "PKTFM",
            Mode::Cw => "CW",
            Mode::Cwr => "CWR",
            Mode::Rtty => "RTTY",
            Mode::Rttyr => "RTTYR",
            Mode::Dsb => "DSB",
            Mode::Sah => "SAH",
            Mode::Sal => "SAL",
            Mode::Sam => "SAM",
            Mode::C4fm => "C4FM",
            Mode::Spec => "SPEC",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or(Error::InvalidArgument("unknown mode"))
    }
}

/// Vendor mode names FLRig reports, and the canonical mode each maps to.
pub const VENDOR_MODES: &[(&str, Mode)] = &[
    ("AM-D", Mode::PktAm),
    ("AM", Mode::Am),
    ("AM-N", Mode::Amn),
    ("AMN", Mode::Amn),
    ("CW", Mode::Cw),
    ("CW-L", Mode::Cwr),
    ("CW-LSB", Mode::Cwr),
    ("CW-R", Mode::Cwr),
    ("CW-U", Mode::Cw),
    ("CW-USB", Mode::Cw),
    ("CWL", Mode::Cwr),
    ("CWU", Mode::Cw),
    ("D-LSB", Mode::PktLsb),
    ("D-USB", Mode::PktUsb),
    ("DATA", Mode::PktUsb),
    ("DATA-FM", Mode::PktFm),
    ("DATA-L", Mode::PktLsb),
    ("DATA-R", Mode::PktLsb),
    ("DATA-LSB", Mode::PktLsb),
    ("DATA-USB", Mode::PktUsb),
    ("DATA-U", Mode::PktUsb),
    ("DIG", Mode::PktUsb),
    ("DIGI", Mode::PktUsb),
    ("DIGL", Mode::PktLsb),
    ("DIGU", Mode::PktUsb),
    ("DSB", Mode::Dsb),
    ("FM", Mode::Fm),
    ("FM-D", Mode::PktFm),
    ("FMN", Mode::Fmn),
    ("FM-N", Mode::Fmn),
    ("FMW", Mode::Wfm),
    ("FSK", Mode::Rtty),
    ("FSK-R", Mode::Rttyr),
    ("LCW", Mode::Cwr),
    ("LSB", Mode::Lsb),
    ("LSB-D", Mode::PktLsb),
    ("LSB-D1", Mode::PktLsb),
    ("LSB-D2", Mode::PktLsb),
    ("LSB-D3", Mode::PktLsb),
    ("NFM", Mode::Fmn),
    ("PKT", Mode::Rtty),
    ("PKT-FM", Mode::PktFm),
    ("PKT-L", Mode::Rttyr),
    ("PKT-U", Mode::Rtty),
    ("PKT(L)", Mode::Rttyr),
    ("PKT(U)", Mode::Rtty),
    ("PSK", Mode::Rtty),
    ("PSK-L", Mode::Rttyr),
    ("PSK-R", Mode::Rttyr),
    ("PSK-U", Mode::Rtty),
    ("RTTY", Mode::Rtty),
    ("RTTY-L", Mode::Rttyr),
    ("RTTY-R", Mode::Rttyr),
    ("RTTY-U", Mode::Rtty),
    ("RTTY(U)", Mode::Rtty),
    ("RTTY(R", Mode::Rttyr),
    ("SAH", Mode::Sah),
    ("SAL", Mode::Sal),
    ("SAM", Mode::Sam),
    ("USB", Mode::Usb),
    ("USB-D", Mode::PktUsb),
    ("USB-D1", Mode::PktUsb),
    ("USB-D2", Mode::PktUsb),
    ("USB-D3", Mode::PktUsb),
    ("USER-U", Mode::PktUsb),
    ("USER-L", Mode::PktLsb),
    ("W-FM", Mode::Wfm),
    ("WFM", Mode::Wfm),
    ("UCW", Mode::Cw),
    ("C4FM", Mode::C4fm),
    ("SPEC", Mode::Spec),
];

/// Reported by some rigs but with no canonical counterpart.
const UNSUPPORTED_MODES: &[&str] = &["DRM"];

const DELIM: char = '|';

/// Per-connection alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeTable {
    entries: BTreeMap<Mode, String>,
}

impl ModeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a pipe-delimited remote mode list using [`VENDOR_MODES`].
    pub fn from_remote(list: &str) -> Self {
        Self::build_with(list, VENDOR_MODES)
    }

    /// Build from a pipe-delimited remote mode list using a custom
    /// vendor→canonical table. Unknown names are logged and dropped.
    pub fn build_with(list: &str, table: &[(&str, Mode)]) -> Self {
        let mut modes = Self::new();
        for name in list.split(DELIM).map(str::trim).filter(|n| !n.is_empty()) {
            match table.iter().find(|(vendor, _)| *vendor == name) {
                Some(&(_, mode)) => {
                    modes.add_alias(mode, name);
                }
                None if UNSUPPORTED_MODES.contains(&name) => {
                    debug!("MODES: no mapping for mode {name}");
                }
                None => warn!("MODES: unknown mode (new?) '{name}'"),
            }
        }
        debug!("MODES: {} canonical modes from {:?}", modes.entries.len(), list);
        modes
    }

    /// Add `alias` under `mode`. Returns `false` if the alias is already
    /// present anywhere in the table.
    pub fn add_alias(&mut self, mode: Mode, alias: &str) -> bool {
        if alias.is_empty() || alias.contains(DELIM) {
            return false;
        }
        if let Some(existing) = self.canonical(alias) {
            trace!("MODES: '{alias}' already mapped to {existing}");
            return false;
        }
        let entry = self.entries.entry(mode).or_insert_with(|| String::from(DELIM));
        entry.push_str(alias);
        entry.push(DELIM);
        true
    }

    /// Canonical mode for a vendor name.
    pub fn canonical(&self, alias: &str) -> Option<Mode> {
        let needle = format!("{DELIM}{alias}{DELIM}");
        self.entries
            .iter()
            .find(|(_, aliases)| aliases.contains(&needle))
            .map(|(&mode, _)| mode)
    }

    /// The vendor name to send when selecting `mode`.
    pub fn first_alias(&self, mode: Mode) -> Option<&str> {
        self.aliases(mode).next()
    }

    /// All vendor names for `mode`, in the order they were added.
    pub fn aliases(&self, mode: Mode) -> impl Iterator<Item = &str> {
        self.entries
            .get(&mode)
            .map(String::as_str)
            .unwrap_or_default()
            .split(DELIM)
            .filter(|a| !a.is_empty())
    }

    /// The delimited alias string for `mode`, e.g. `|USB-D|DATA-U|`.
    pub fn alias_string(&self, mode: Mode) -> Option<&str> {
        self.entries.get(&mode).map(String::as_str)
    }

    /// Canonical modes the remote supports, in canonical order.
    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.entries.keys().copied()
    }

    pub fn supports(&self, mode: Mode) -> bool {
        self.entries.contains_key(&mode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
