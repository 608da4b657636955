//! Discovery of the runtime (CDC) port after a manual reset.
//!
//! The flashing tool leaves the board in download mode, so the application
//! only enumerates after the operator taps RST. The OS may give the new CDC
//! device any path, including one used before, so the port is found by
//! comparing snapshots taken right before and right after the reset.

use log::{debug, info, warn};

use crate::device::UsbIdentity;
use crate::error::{Error, Result};
use crate::operator::{Decision, Notice, Operator, Prompt};
use crate::port::PortEnumerator;

/// Find the runtime port that appears across a manual reset.
///
/// Returns `Ok(None)` when the operator quits. The "before" snapshot is taken
/// once; an empty difference only re-prompts, so a port that enumerates late
/// still shows up on the next attempt. There is no attempt cap. When several
/// ports appear at once, the first in sorted order is returned.
pub fn discover_new_port<E, O>(
    enumerator: &mut E,
    operator: &mut O,
    runtime: UsbIdentity,
) -> Result<Option<String>>
where
    E: PortEnumerator + ?Sized,
    O: Operator + ?Sized,
{
    let before = enumerator.snapshot(runtime)?;
    debug!("Runtime ports before reset: {:?}", before.to_vec());

    loop {
        if crate::is_interrupted_requested() {
            return Err(Error::Interrupted);
        }

        if operator.decide(Prompt::ResetBoard)? == Decision::Abort {
            info!("CDC port discovery cancelled by operator");
            return Ok(None);
        }

        let after = enumerator.snapshot(runtime)?;
        debug!("Runtime ports after reset: {:?}", after.to_vec());

        let delta = after.difference(&before);
        let Some(port) = delta.first() else {
            operator.notify(Notice::NoNewPort);
            continue;
        };

        let ports = delta.to_vec();
        if ports.len() > 1 {
            warn!(
                "{} new runtime ports appeared; using {port}",
                ports.len()
            );
        }
        operator.notify(Notice::NewPorts { ports: &ports });
        return Ok(Some(port.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::testing::{ScriptedOperator, Seen};
    use crate::port::PortInfo;
    use crate::port::testing::{ScriptedEnumerator, usb_port};

    const RUN: UsbIdentity = UsbIdentity::new(0x303A, 0x4001);
    const BOOT: UsbIdentity = UsbIdentity::new(0x303A, 2);

    fn run(names: &[&str]) -> Vec<PortInfo> {
        names.iter().map(|n| usb_port(n, RUN)).collect()
    }

    #[test]
    fn test_returns_new_port() {
        let mut enumerator = ScriptedEnumerator::new([run(&["A"]), run(&["A", "B"])]);
        let mut operator = ScriptedOperator::new([Decision::Continue]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert_eq!(port.as_deref(), Some("B"));
        assert_eq!(operator.prompts, vec![Prompt::ResetBoard]);
        assert_eq!(operator.seen, vec![Seen::NewPorts(vec!["B".to_string()])]);
    }

    #[test]
    fn test_empty_delta_reprompts() {
        let mut enumerator =
            ScriptedEnumerator::new([run(&[]), run(&[]), run(&[]), run(&["COM7"])]);
        let mut operator = ScriptedOperator::new([Decision::Continue; 3]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert_eq!(port.as_deref(), Some("COM7"));
        assert_eq!(operator.prompts, vec![Prompt::ResetBoard; 3]);
        assert_eq!(enumerator.calls, 4);
        assert_eq!(
            operator
                .seen
                .iter()
                .filter(|s| **s == Seen::NoNewPort)
                .count(),
            2
        );
    }

    #[test]
    fn test_port_enumerating_after_prompt_is_found() {
        // The CDC device shows up only after the first "after" snapshot.
        let mut enumerator =
            ScriptedEnumerator::new([run(&[]), run(&[]), run(&["/dev/ttyACM0"])]);
        let mut operator = ScriptedOperator::new([Decision::Continue; 5]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert_eq!(port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(operator.prompts, vec![Prompt::ResetBoard; 2]);
        assert_eq!(enumerator.calls, 3);
        assert_eq!(
            operator.seen,
            vec![
                Seen::NoNewPort,
                Seen::NewPorts(vec!["/dev/ttyACM0".to_string()])
            ]
        );
    }

    #[test]
    fn test_existing_port_never_in_delta() {
        let mut enumerator = ScriptedEnumerator::new([
            run(&["/dev/ttyACM0"]),
            run(&[]),
            run(&["/dev/ttyACM0"]),
            run(&["/dev/ttyACM0", "/dev/ttyACM1"]),
        ]);
        let mut operator = ScriptedOperator::new([Decision::Continue; 3]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert_eq!(port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(operator.prompts.len(), 3);
    }

    #[test]
    fn test_ignores_other_identities() {
        let mut enumerator = ScriptedEnumerator::new([
            Vec::new(),
            vec![usb_port("COM9", BOOT), usb_port("COM7", RUN)],
        ]);
        let mut operator = ScriptedOperator::new([Decision::Continue]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert_eq!(port.as_deref(), Some("COM7"));
    }

    #[test]
    fn test_multiple_new_ports_picks_first_sorted() {
        let mut enumerator = ScriptedEnumerator::new([run(&[]), run(&["COM9", "COM10", "COM8"])]);
        let mut operator = ScriptedOperator::new([Decision::Continue]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert_eq!(port.as_deref(), Some("COM10"));
        assert_eq!(
            operator.seen,
            vec![Seen::NewPorts(vec![
                "COM10".to_string(),
                "COM8".to_string(),
                "COM9".to_string()
            ])]
        );
    }

    #[test]
    fn test_quit_returns_none() {
        let mut enumerator = ScriptedEnumerator::new([run(&[])]);
        let mut operator = ScriptedOperator::new([Decision::Abort]);

        let port = discover_new_port(&mut enumerator, &mut operator, RUN).unwrap();
        assert!(port.is_none());
        assert_eq!(enumerator.calls, 1);
    }
}
