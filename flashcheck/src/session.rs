//! Repeatable flash → discover → test cycle.

use std::path::Path;

use log::{debug, info, warn};

use crate::device::BoardProfile;
use crate::discover::discover_new_port;
use crate::error::Result;
use crate::flasher::{FirmwareWriter, FlashStatus};
use crate::operator::{Decision, Notice, Operator, Prompt};
use crate::port::PortEnumerator;
use crate::runner::{SuiteReport, TestSuite, run_all_tests};
use crate::verify::confirm_port;

/// What to do when the flashing tool reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashGate {
    /// Report the status and carry on with discovery and tests.
    #[default]
    Permissive,
    /// Skip discovery and tests for this cycle.
    Strict,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Operator quit while waiting for the bootloader port.
    AbortedAtBootloader,
    /// Operator quit while waiting for the runtime port.
    AbortedAtDiscovery,
    /// Operator declined another cycle.
    Finished,
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Flashing tool status.
    pub flash: FlashStatus,
    /// Runtime port the tests ran against.
    pub runtime_port: Option<String>,
    /// Suite results, if tests ran.
    pub suite: Option<SuiteReport>,
}

impl CycleReport {
    /// Whether the tests ran and all of them passed.
    pub fn passed(&self) -> bool {
        self.suite
            .as_ref()
            .is_some_and(SuiteReport::passed)
    }
}

/// Summary of a whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Cycles that reached the test stage or were skipped by strict gating.
    pub cycles: Vec<CycleReport>,
    /// Why the session ended.
    pub end: SessionEnd,
}

impl SessionSummary {
    /// Number of passing cycles.
    pub fn passed(&self) -> usize {
        self.cycles.iter().filter(|c| c.passed()).count()
    }

    /// Number of failing cycles.
    pub fn failed(&self) -> usize {
        self.cycles.len() - self.passed()
    }

    /// The most recent cycle.
    pub fn last(&self) -> Option<&CycleReport> {
        self.cycles.last()
    }
}

/// A flash-and-verify session bound to one board profile.
pub struct Session<E, O> {
    profile: BoardProfile,
    writer: FirmwareWriter,
    suite: TestSuite,
    gate: FlashGate,
    enumerator: E,
    operator: O,
}

impl<E, O> Session<E, O>
where
    E: PortEnumerator,
    O: Operator,
{
    /// Create a session.
    pub fn new(
        profile: BoardProfile,
        writer: FirmwareWriter,
        suite: TestSuite,
        enumerator: E,
        operator: O,
    ) -> Self {
        Self {
            profile,
            writer,
            suite,
            gate: FlashGate::default(),
            enumerator,
            operator,
        }
    }

    /// Set the flash failure policy.
    #[must_use]
    pub fn with_flash_gate(mut self, gate: FlashGate) -> Self {
        self.gate = gate;
        self
    }

    /// Access the operator.
    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Run one cycle. `Err(end)` means the operator stopped mid-cycle.
    fn run_cycle(
        &mut self,
        image: &Path,
        port: &str,
    ) -> Result<std::result::Result<CycleReport, SessionEnd>> {
        if !confirm_port(
            &mut self.enumerator,
            &mut self.operator,
            self.profile.bootloader,
            port,
        )? {
            return Ok(Err(SessionEnd::AbortedAtBootloader));
        }

        self.operator
            .notify(Notice::FlashStarted { port, image });
        let flash = self.writer.write_firmware(port, image)?;
        self.operator
            .notify(Notice::FlashFinished { status: flash });

        if !flash.success() {
            match self.gate {
                FlashGate::Permissive => {
                    warn!("Flashing tool reported {flash}; continuing");
                },
                FlashGate::Strict => {
                    self.operator.notify(Notice::FlashFailedSkipping);
                    return Ok(Ok(CycleReport {
                        flash,
                        runtime_port: None,
                        suite: None,
                    }));
                },
            }
        }

        let Some(runtime_port) =
            discover_new_port(&mut self.enumerator, &mut self.operator, self.profile.runtime)?
        else {
            return Ok(Err(SessionEnd::AbortedAtDiscovery));
        };

        let suite = run_all_tests(&self.suite, &runtime_port, &mut self.operator)?;
        Ok(Ok(CycleReport {
            flash,
            runtime_port: Some(runtime_port),
            suite: Some(suite),
        }))
    }

    /// Run cycles until the operator stops.
    pub fn run(&mut self, image: &Path, port: &str) -> Result<SessionSummary> {
        let mut cycles = Vec::new();

        loop {
            debug!("Starting cycle {}", cycles.len() + 1);
            let report = match self.run_cycle(image, port)? {
                Ok(report) => report,
                Err(end) => {
                    info!("Session ended: {end:?}");
                    return Ok(SessionSummary { cycles, end });
                },
            };

            info!(
                "Cycle {} {}",
                cycles.len() + 1,
                if report.passed() { "passed" } else { "failed" }
            );
            cycles.push(report);

            if self.operator.decide(Prompt::RepeatCycle)? == Decision::Abort {
                return Ok(SessionSummary {
                    cycles,
                    end: SessionEnd::Finished,
                });
            }
        }
    }
}
