//! Operator interaction.
//!
//! Every manual step of a flash cycle (entering bootloader mode, tapping
//! reset, deciding whether to run another cycle) is gated on a human. The
//! library never talks to a terminal itself; it reports progress as
//! [`Notice`]s and blocks on [`Operator::decide`] for a [`Decision`].

use std::path::Path;

use crate::error::Result;
use crate::flasher::FlashStatus;
use crate::runner::TestOutcome;

/// The operator's answer at a manual gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The manual action was performed; go on.
    Continue,
    /// Stop here.
    Abort,
}

/// A manual gate the operator must answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Put the board into bootloader mode (hold BOOT, tap RST), then continue.
    EnterBootloader,
    /// Tap RST so the freshly flashed firmware enumerates, then continue.
    ResetBoard,
    /// The cycle finished; run another one?
    RepeatCycle,
}

/// Progress reported to the operator.
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    /// The expected bootloader port is present.
    PortConfirmed {
        /// Port that was found.
        port: &'a str,
    },
    /// The expected bootloader port is absent.
    PortMissing {
        /// Port the operator asked for.
        expected: &'a str,
        /// Bootloader-mode ports seen instead.
        found: &'a [String],
    },
    /// Flashing tool is about to run.
    FlashStarted {
        /// Target port.
        port: &'a str,
        /// Firmware image.
        image: &'a Path,
    },
    /// Flashing tool returned.
    FlashFinished {
        /// Tool exit status.
        status: FlashStatus,
    },
    /// Flash failed and strict mode skips the rest of the cycle.
    FlashFailedSkipping,
    /// New runtime ports appeared after the reset.
    NewPorts {
        /// New port names, in order.
        ports: &'a [String],
    },
    /// No new runtime port appeared after the reset.
    NoNewPort,
    /// The test directory could not be listed.
    TestDirUnreadable {
        /// Directory that was scanned.
        dir: &'a Path,
        /// Error text.
        error: &'a str,
    },
    /// Test suite starting.
    SuiteStarted {
        /// Number of test files found.
        total: usize,
    },
    /// A test file is starting.
    TestStarted {
        /// File name.
        name: &'a str,
        /// Zero-based position in the suite.
        index: usize,
        /// Number of test files.
        total: usize,
    },
    /// One line of the test's standard output.
    TestOutput {
        /// Line without its terminator.
        line: &'a str,
    },
    /// Error-stream text of a test (diagnostic only).
    TestErrorOutput {
        /// Collected stderr text.
        text: &'a str,
    },
    /// A test file finished.
    TestFinished {
        /// File name.
        name: &'a str,
        /// Classification.
        outcome: TestOutcome,
    },
    /// The suite finished.
    SuiteFinished {
        /// Whether every file passed.
        passed: bool,
    },
}

/// Something that can be told about progress and asked to decide.
pub trait Operator {
    /// Report progress.
    fn notify(&mut self, notice: Notice<'_>);

    /// Block until the operator answers `prompt`.
    fn decide(&mut self, prompt: Prompt) -> Result<Decision>;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn notify(&mut self, notice: Notice<'_>) {
        (**self).notify(notice);
    }

    fn decide(&mut self, prompt: Prompt) -> Result<Decision> {
        (**self).decide(prompt)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted operator for state-machine tests.

    use std::collections::VecDeque;

    use super::{Decision, Notice, Operator, Prompt};
    use crate::error::Result;
    use crate::runner::TestOutcome;

    /// Owned copy of a [`Notice`] for assertions.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Seen {
        PortConfirmed(String),
        PortMissing { expected: String, found: Vec<String> },
        FlashStarted(String),
        FlashFinished(Option<i32>),
        FlashFailedSkipping,
        NewPorts(Vec<String>),
        NoNewPort,
        TestDirUnreadable,
        SuiteStarted(usize),
        TestStarted(String),
        TestOutput(String),
        TestErrorOutput(String),
        TestFinished(String, TestOutcome),
        SuiteFinished(bool),
    }

    /// Answers prompts from a queue (Abort once it runs dry) and records
    /// everything it is told.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedOperator {
        answers: VecDeque<Decision>,
        pub(crate) prompts: Vec<Prompt>,
        pub(crate) seen: Vec<Seen>,
    }

    impl ScriptedOperator {
        pub(crate) fn new<I: IntoIterator<Item = Decision>>(answers: I) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                ..Self::default()
            }
        }

        pub(crate) fn output_lines(&self) -> Vec<String> {
            self.seen
                .iter()
                .filter_map(|s| match s {
                    Seen::TestOutput(line) => Some(line.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Operator for ScriptedOperator {
        fn notify(&mut self, notice: Notice<'_>) {
            let seen = match notice {
                Notice::PortConfirmed { port } => Seen::PortConfirmed(port.to_string()),
                Notice::PortMissing { expected, found } => Seen::PortMissing {
                    expected: expected.to_string(),
                    found: found.to_vec(),
                },
                Notice::FlashStarted { port, .. } => Seen::FlashStarted(port.to_string()),
                Notice::FlashFinished { status } => Seen::FlashFinished(status.code()),
                Notice::FlashFailedSkipping => Seen::FlashFailedSkipping,
                Notice::NewPorts { ports } => Seen::NewPorts(ports.to_vec()),
                Notice::NoNewPort => Seen::NoNewPort,
                Notice::TestDirUnreadable { .. } => Seen::TestDirUnreadable,
                Notice::SuiteStarted { total } => Seen::SuiteStarted(total),
                Notice::TestStarted { name, .. } => Seen::TestStarted(name.to_string()),
                Notice::TestOutput { line } => Seen::TestOutput(line.to_string()),
                Notice::TestErrorOutput { text } => Seen::TestErrorOutput(text.to_string()),
                Notice::TestFinished { name, outcome } => {
                    Seen::TestFinished(name.to_string(), outcome)
                },
                Notice::SuiteFinished { passed } => Seen::SuiteFinished(passed),
            };
            self.seen.push(seen);
        }

        fn decide(&mut self, prompt: Prompt) -> Result<Decision> {
            self.prompts.push(prompt);
            Ok(self.answers.pop_front().unwrap_or(Decision::Abort))
        }
    }
}
