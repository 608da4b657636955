//! Flash-mode port verification.
//!
//! Before flashing, the port named by the operator must be enumerated under
//! the bootloader identity. If it is not, the board is usually still running
//! application firmware and has to be forced into download mode by hand.

use log::{debug, info};

use crate::device::UsbIdentity;
use crate::error::{Error, Result};
use crate::operator::{Decision, Notice, Operator, Prompt};
use crate::port::PortEnumerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Waiting,
    Confirmed,
}

/// Wait until `expected` shows up with the bootloader identity.
///
/// Returns `Ok(true)` once the port is present and `Ok(false)` if the
/// operator aborts. There is no attempt limit; every retry is paced by the
/// operator.
pub fn confirm_port<E, O>(
    enumerator: &mut E,
    operator: &mut O,
    bootloader: UsbIdentity,
    expected: &str,
) -> Result<bool>
where
    E: PortEnumerator + ?Sized,
    O: Operator + ?Sized,
{
    let mut state = State::Waiting;
    let mut attempt = 0u32;

    while state == State::Waiting {
        if crate::is_interrupted_requested() {
            return Err(Error::Interrupted);
        }

        attempt += 1;
        let ports = enumerator.snapshot(bootloader)?;
        debug!(
            "Bootloader poll #{attempt}: {} port(s) with {bootloader}",
            ports.len()
        );

        if ports.contains(expected) {
            state = State::Confirmed;
            continue;
        }

        let found = ports.to_vec();
        operator.notify(Notice::PortMissing {
            expected,
            found: &found,
        });

        if operator.decide(Prompt::EnterBootloader)? == Decision::Abort {
            info!("Bootloader port confirmation aborted by operator");
            return Ok(false);
        }
    }

    operator.notify(Notice::PortConfirmed { port: expected });
    Ok(true)
}
