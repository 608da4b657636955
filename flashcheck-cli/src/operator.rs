//! Terminal operator: renders progress and asks the human at the bench.
//!
//! Status text goes to stderr; echoed test output goes to stdout so it can
//! be piped. Prompts use dialoguer on a terminal and plain line reads
//! otherwise (EOF counts as quit).

use {
    crate::{use_fancy_output, was_interrupted},
    console::style,
    dialoguer::{Error as DialoguerError, Input, theme::ColorfulTheme},
    flashcheck::{Decision, Error, Notice, Operator, Prompt, TestOutcome},
    indicatif::{ProgressBar, ProgressStyle},
    log::debug,
    rust_i18n::t,
    std::{
        fmt::Display,
        io::{self, BufRead, IsTerminal},
        time::Duration,
    },
};

/// Interprets one answer line. `None` is end of input.
pub(crate) fn parse_answer(answer: Option<&str>) -> Decision {
    match answer {
        Some(line) if !line.trim().eq_ignore_ascii_case("q") => Decision::Continue,
        _ => Decision::Abort,
    }
}

fn map_prompt_error(err: DialoguerError) -> Error {
    match err {
        DialoguerError::IO(io_err) if io_err.kind() == io::ErrorKind::Interrupted => {
            Error::Interrupted
        },
        DialoguerError::IO(io_err) => Error::Io(io_err),
    }
}

/// [`Operator`] backed by the controlling terminal.
pub(crate) struct TerminalOperator {
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl TerminalOperator {
    pub(crate) fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: None,
        }
    }

    /// Print a status line to stderr without tearing the spinner.
    fn status(&self, line: impl Display) {
        match &self.spinner {
            Some(pb) => pb.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }

    /// Status line that `--quiet` hides.
    fn info(&self, line: impl Display) {
        if !self.quiet {
            self.status(line);
        }
    }

    fn start_spinner(&mut self, name: &str) {
        self.finish_spinner();
        if self.quiet || !use_fancy_output() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(t!("tests.spinner", name = name).to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    fn finish_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn read_answer(question: &str) -> flashcheck::Result<Option<String>> {
        if io::stdin().is_terminal() && io::stderr().is_terminal() {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(question)
                .allow_empty(true)
                .interact_text()
                .map(Some)
                .map_err(map_prompt_error)
        } else {
            eprintln!("{question}");
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line)?;
            Ok((read > 0).then_some(line))
        }
    }
}

impl Operator for TerminalOperator {
    fn notify(&mut self, notice: Notice<'_>) {
        match notice {
            Notice::PortConfirmed { port } => {
                self.info(format!(
                    "{} {}",
                    style("✓").green(),
                    t!("verify.port_found", port = style(port).cyan().to_string())
                ));
            },
            Notice::PortMissing { expected, found } => {
                self.status(format!(
                    "{} {}",
                    style("⚠").yellow(),
                    t!("verify.port_missing", port = expected)
                ));
                if !found.is_empty() {
                    self.status(format!(
                        "  {}",
                        t!("verify.other_ports", ports = found.join(", "))
                    ));
                }
            },
            Notice::FlashStarted { port, image } => {
                self.info(format!(
                    "{} {}",
                    style("⚡").cyan(),
                    t!("flash.started", image = image.display(), port = port)
                ));
            },
            Notice::FlashFinished { status } => {
                if status.success() {
                    self.info(format!(
                        "{} {}",
                        style("✓").green(),
                        t!("flash.finished_ok", status = status)
                    ));
                } else {
                    self.status(format!(
                        "{} {}",
                        style("⚠").yellow(),
                        t!("flash.finished_failed", status = status)
                    ));
                }
            },
            Notice::FlashFailedSkipping => {
                self.status(format!("{} {}", style("⚠").yellow(), t!("flash.skipping")));
            },
            Notice::NewPorts { ports } => {
                self.info(format!(
                    "{} {}",
                    style("🔌").cyan(),
                    t!("discover.found", ports = ports.join(", "))
                ));
            },
            Notice::NoNewPort => {
                self.status(format!("{} {}", style("⚠").yellow(), t!("discover.none")));
            },
            Notice::TestDirUnreadable { dir, error } => {
                self.status(format!(
                    "{} {}",
                    style("⚠").yellow(),
                    t!("tests.dir_unreadable", dir = dir.display(), error = error)
                ));
            },
            Notice::SuiteStarted { total } => {
                debug!("Running {total} test file(s)");
                if total == 0 {
                    self.status(format!("{} {}", style("ℹ").blue(), t!("tests.none_found")));
                }
            },
            Notice::TestStarted { name, index, total } => {
                self.info(format!(
                    "{} {}",
                    style("▶").cyan(),
                    t!(
                        "tests.running",
                        name = style(name).bold().to_string(),
                        current = index + 1,
                        total = total
                    )
                ));
                self.start_spinner(name);
            },
            Notice::TestOutput { line } => match &self.spinner {
                Some(pb) => pb.suspend(|| println!("{line}")),
                None => println!("{line}"),
            },
            Notice::TestErrorOutput { text } => {
                self.status(format!(
                    "{} {}",
                    style("✗").red(),
                    t!("tests.error_output", text = text.trim_end())
                ));
            },
            Notice::TestFinished { name, outcome } => {
                self.finish_spinner();
                match outcome {
                    TestOutcome::Success => self.status(format!(
                        "{} {}",
                        style("✓").green(),
                        t!("tests.passed", name = name)
                    )),
                    TestOutcome::Failure => self.status(format!(
                        "{} {}",
                        style("✗").red(),
                        t!("tests.failed", name = name)
                    )),
                }
            },
            Notice::SuiteFinished { passed } => {
                self.finish_spinner();
                if passed {
                    self.status(format!(
                        "{} {}",
                        style("🎉").green(),
                        style(t!("tests.suite_passed")).green().bold()
                    ));
                } else {
                    self.status(format!(
                        "{} {}",
                        style("✗").red(),
                        style(t!("tests.suite_failed")).red().bold()
                    ));
                }
            },
        }
    }

    fn decide(&mut self, prompt: Prompt) -> flashcheck::Result<Decision> {
        self.finish_spinner();

        let instruction = match prompt {
            Prompt::EnterBootloader => Some(t!("verify.instruction")),
            Prompt::ResetBoard => Some(t!("discover.instruction")),
            Prompt::RepeatCycle => None,
        };
        if let Some(instruction) = instruction {
            eprintln!("{} {}", style("👉").cyan(), style(instruction).bold());
        }

        let question = match prompt {
            Prompt::RepeatCycle => t!("prompt.repeat"),
            Prompt::EnterBootloader | Prompt::ResetBoard => t!("prompt.continue"),
        };
        let answer = Self::read_answer(&question)?;
        if was_interrupted() {
            return Err(Error::Interrupted);
        }

        let decision = parse_answer(answer.as_deref());
        debug!("{prompt:?} answered with {decision:?}");
        if decision == Decision::Abort {
            eprintln!("{}", style(t!("prompt.exited")).dim());
        }
        Ok(decision)
    }
}
