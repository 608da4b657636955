//! Flash → discover → test cycles against a board on the bench.

use {
    anyhow::{Context, Result},
    console::style,
    flashcheck::{NativePortEnumerator, Session},
    log::debug,
    rust_i18n::t,
    std::path::Path,
};

use crate::{Cli, CliError, config::Config, operator::TerminalOperator, was_interrupted};

/// Run cycles until the operator quits.
pub(crate) fn cmd_cycle(cli: &Cli, config: &Config, firmware: &Path, port: &str) -> Result<()> {
    let suite = config.test_suite(cli.test_dir.as_deref());
    let writer = config.firmware_writer();
    debug!(
        "Flashing with {} at {} baud, tests from {}",
        writer.program,
        writer.profile.baud,
        suite.dir.display()
    );

    let mut session = Session::new(
        config.board_profile(),
        writer,
        suite,
        NativePortEnumerator,
        TerminalOperator::new(cli.quiet),
    )
    .with_flash_gate(config.flash_gate(cli.strict));

    let summary = session
        .run(firmware, port)
        .with_context(|| format!("flash cycle on {port} failed"))?;

    if was_interrupted() {
        return Err(CliError::Cancelled(t!("error.interrupted").to_string()).into());
    }

    debug!("Session ended: {:?}", summary.end);
    if !cli.quiet && !summary.cycles.is_empty() {
        eprintln!(
            "\n{} {}",
            style("ℹ").blue(),
            t!(
                "session.summary",
                cycles = summary.cycles.len(),
                passed = summary.passed(),
                failed = summary.failed()
            )
        );
    }

    Ok(())
}
