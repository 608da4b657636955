//! # flashcheck
//!
//! A library for flash-and-verify cycles on USB serial development boards.
//!
//! A cycle has three hardware-facing steps, each gated on a human operator:
//!
//! - confirm the board is in bootloader mode on the expected port
//!   ([`verify::confirm_port`]) and flash it with an external tool
//!   ([`FirmwareWriter`])
//! - find the port the application firmware enumerates on after a manual
//!   reset, by snapshot differencing ([`discover::discover_new_port`])
//! - run on-device smoke test scripts over that port and classify their
//!   output ([`runner::run_all_tests`])
//!
//! [`Session`] ties them into a repeatable loop.
//!
//! ## Features
//!
//! - `native` (default): serial port enumeration via the `serialport` crate
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use flashcheck::{BoardProfile, FirmwareWriter, NativePortEnumerator, Session, TestSuite};
//! # use flashcheck::{Decision, Notice, Operator, Prompt};
//! # struct Console;
//! # impl Operator for Console {
//! #     fn notify(&mut self, notice: Notice<'_>) { println!("{notice:?}"); }
//! #     fn decide(&mut self, _: Prompt) -> flashcheck::Result<Decision> { Ok(Decision::Continue) }
//! # }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new(
//!         BoardProfile::esp32s2(),
//!         FirmwareWriter::default(),
//!         TestSuite::default(),
//!         NativePortEnumerator,
//!         Console,
//!     );
//!     let summary = session.run("firmware.bin".as_ref(), "COM5")?;
//!     println!("{} passed, {} failed", summary.passed(), summary.failed());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod device;
pub mod discover;
pub mod error;
pub mod flasher;
pub mod operator;
pub mod port;
pub mod runner;
pub mod session;
pub mod verify;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by the operator-paced loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications).
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

// Re-exports for convenience
#[cfg(feature = "native")]
pub use {device::detect_ports, port::NativePortEnumerator};
pub use {
    device::{BoardMode, BoardProfile, DetectedPort, UsbIdentity, format_port_list},
    error::{Error, Result},
    flasher::{FirmwareWriter, FlashProfile, FlashStatus},
    operator::{Decision, Notice, Operator, Prompt},
    port::{PortEnumerator, PortInfo, PortSnapshot},
    runner::{ScriptRunner, SuiteReport, TestFile, TestOutcome, TestSuite},
    session::{CycleReport, FlashGate, Session, SessionEnd, SessionSummary},
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_checker_default_false() {
        assert!(!is_interrupted_requested());
    }
}
