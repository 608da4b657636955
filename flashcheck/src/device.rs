//! Device identities and board classification.
//!
//! A board exposes a different USB product id depending on the firmware state
//! it is in. In bootloader mode it enumerates as the ROM download interface;
//! in normal-run mode the application firmware exposes a CDC-ACM port with
//! another product id under the same vendor.

use crate::port::PortInfo;

#[cfg(feature = "native")]
use log::{debug, trace};

/// Espressif USB vendor id.
pub const ESPRESSIF_VID: u16 = 0x303A;

/// Product id of the ESP32-S2 ROM bootloader (download mode).
pub const ESP32S2_BOOTLOADER_PID: u16 = 0x0002;

/// Product id of the ESP32-S2 running application firmware (CDC).
pub const ESP32S2_RUNTIME_PID: u16 = 0x4001;

/// A composite USB device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbIdentity {
    /// USB vendor id.
    pub vid: u16,
    /// USB product id.
    pub pid: u16,
}

impl UsbIdentity {
    /// Create a new identity.
    pub const fn new(vid: u16, pid: u16) -> Self {
        Self { vid, pid }
    }

    /// Check whether a port's USB descriptor matches this identity exactly.
    ///
    /// Ports without USB information never match.
    pub fn matches(&self, port: &PortInfo) -> bool {
        port.vid == Some(self.vid) && port.pid == Some(self.pid)
    }
}

impl std::fmt::Display for UsbIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vid, self.pid)
    }
}

/// The pair of identities a board presents across its two modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardProfile {
    /// Identity while in bootloader (flashing) mode.
    pub bootloader: UsbIdentity,
    /// Identity while running application firmware.
    pub runtime: UsbIdentity,
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self::esp32s2()
    }
}

impl BoardProfile {
    /// Profile for ESP32-S2 boards using native USB.
    pub const fn esp32s2() -> Self {
        Self {
            bootloader: UsbIdentity::new(ESPRESSIF_VID, ESP32S2_BOOTLOADER_PID),
            runtime: UsbIdentity::new(ESPRESSIF_VID, ESP32S2_RUNTIME_PID),
        }
    }

    /// Classify a port by which of this board's identities it matches.
    pub fn classify(&self, port: &PortInfo) -> BoardMode {
        if self.bootloader.matches(port) {
            BoardMode::Bootloader
        } else if self.runtime.matches(port) {
            BoardMode::Runtime
        } else {
            BoardMode::Other
        }
    }
}

/// Which firmware state an enumerated port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardMode {
    /// Board in bootloader mode.
    Bootloader,
    /// Board running application firmware.
    Runtime,
    /// Not this board (other USB device or a non-USB port).
    Other,
}

impl BoardMode {
    /// Short human-readable label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bootloader => "bootloader",
            Self::Runtime => "runtime",
            Self::Other => "other",
        }
    }
}

/// A serial port annotated with its board mode.
#[derive(Debug, Clone)]
pub struct DetectedPort {
    /// Port metadata as reported by the OS.
    pub info: PortInfo,
    /// Mode classification against the board profile.
    pub mode: BoardMode,
}

/// Detect all serial ports and classify them against `profile`.
#[cfg(feature = "native")]
pub fn detect_ports(profile: &BoardProfile) -> Vec<DetectedPort> {
    use crate::port::{NativePortEnumerator, PortEnumerator};

    match NativePortEnumerator.list_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|info| {
                let mode = profile.classify(&info);
                trace!("Found port: {} ({:?})", info.name, mode);
                DetectedPort { info, mode }
            })
            .collect(),
        Err(e) => {
            debug!("Failed to enumerate serial ports: {e}");
            Vec::new()
        },
    }
}

/// Format a list of detected ports for display.
pub fn format_port_list(ports: &[DetectedPort]) -> Vec<String> {
    ports
        .iter()
        .map(|port| {
            let ids = match (port.info.vid, port.info.pid) {
                (Some(vid), Some(pid)) => format!(" [VID:{vid:04X} PID:{pid:04X}]"),
                _ => String::new(),
            };
            let mode = match port.mode {
                BoardMode::Other => String::new(),
                mode => format!(" ({})", mode.name()),
            };
            let product = port
                .info
                .product
                .as_ref()
                .map(|p| format!(" - {p}"))
                .unwrap_or_default();
            format!("{}{ids}{mode}{product}", port.info.name)
        })
        .collect()
}
