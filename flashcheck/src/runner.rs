//! On-device smoke test runner.
//!
//! Test scripts live in a directory on the host and are executed on the board
//! through an external script runner (ampy by default). A script passes when
//! any line of its standard output contains the sentinel marker; the runner's
//! own exit status is not trusted, since scripts that fail often still exit
//! cleanly.
//!
//! The suite stops at the first failing file.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use log::{debug, info, warn};

use crate::error::Result;
use crate::operator::{Notice, Operator};

/// Marker a test script prints to report success.
pub const DEFAULT_SENTINEL: &str = "**OK**";

/// Placeholder replaced by the port in runner arguments.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Placeholder replaced by the script path in runner arguments.
pub const SCRIPT_PLACEHOLDER: &str = "{script}";

/// Per-file classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// Sentinel observed.
    Success,
    /// Sentinel never observed.
    Failure,
}

impl TestOutcome {
    /// Whether this is [`TestOutcome::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// A discovered test script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    /// File name.
    pub name: String,
    /// Path to the script.
    pub path: PathBuf,
}

/// External script runner command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRunner {
    /// Program to run.
    pub program: String,
    /// Arguments; `{port}` and `{script}` are substituted per test.
    pub args: Vec<String>,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self {
            program: "uv".to_string(),
            args: ["run", "ampy", "-p", PORT_PLACEHOLDER, "run", SCRIPT_PLACEHOLDER]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ScriptRunner {
    /// Create a runner template.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments with placeholders substituted.
    pub fn args_for(&self, port: &str, script: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| {
                if arg == SCRIPT_PLACEHOLDER {
                    script.as_os_str().to_os_string()
                } else {
                    arg.replace(PORT_PLACEHOLDER, port)
                        .replace(SCRIPT_PLACEHOLDER, &script.to_string_lossy())
                        .into()
                }
            })
            .collect()
    }

    /// Build the command running `script` on the board at `port`.
    pub fn command(&self, port: &str, script: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(port, script));
        cmd
    }
}

/// Test suite configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    /// Directory holding the scripts.
    pub dir: PathBuf,
    /// Required file name prefix.
    pub prefix: String,
    /// Required file extension, without the dot.
    pub extension: String,
    /// Success marker.
    pub sentinel: String,
    /// Script runner template.
    pub runner: ScriptRunner,
}

impl Default for TestSuite {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./test"),
            prefix: "test".to_string(),
            extension: "py".to_string(),
            sentinel: DEFAULT_SENTINEL.to_string(),
            runner: ScriptRunner::default(),
        }
    }
}

/// Result of a single test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// The file.
    pub file: TestFile,
    /// Classification.
    pub outcome: TestOutcome,
}

/// Result of a suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    /// Files that were run, in order. Stops at the first failure.
    pub results: Vec<TestResult>,
    /// Files not run because an earlier file failed.
    pub skipped: Vec<TestFile>,
}

impl SuiteReport {
    /// Whether every file that ran passed and none were skipped.
    ///
    /// An empty suite passes.
    pub fn passed(&self) -> bool {
        self.skipped.is_empty()
            && self
                .results
                .iter()
                .all(|r| r.outcome.is_success())
    }

    /// The failing file, if any.
    pub fn failure(&self) -> Option<&TestFile> {
        self.results
            .iter()
            .find(|r| !r.outcome.is_success())
            .map(|r| &r.file)
    }
}

/// Whether `name` follows the test script naming convention.
pub fn is_test_file_name(name: &str, prefix: &str, extension: &str) -> bool {
    name.starts_with(prefix)
        && name
            .strip_suffix(extension)
            .and_then(|stem| stem.strip_suffix('.'))
            .is_some()
}

/// List the test scripts in `dir`, sorted by file name.
///
/// Only regular files whose name starts with `prefix` and ends with
/// `.extension` are returned.
pub fn find_test_files(dir: &Path, prefix: &str, extension: &str) -> io::Result<Vec<TestFile>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_test_file_name(&name, prefix, extension) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        files.push(TestFile { name, path });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Read `reader` line by line, calling `on_line` for each line, and report
/// whether any line contained `sentinel`.
///
/// Reading continues to end of stream after the sentinel is seen. Lines are
/// decoded as lossy UTF-8 and stripped of their `\n` / `\r\n` terminator.
pub fn scan_output<R, F>(mut reader: R, sentinel: &str, mut on_line: F) -> io::Result<bool>
where
    R: BufRead,
    F: FnMut(&str),
{
    let mut found = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);
        if !found && line.contains(sentinel) {
            found = true;
        }
        on_line(line);
    }

    Ok(found)
}

/// Run one test file against `port` and classify it.
///
/// A runner that cannot be started is a failure; the spawn error is reported
/// as error output.
pub fn run_test_file<O>(
    suite: &TestSuite,
    port: &str,
    file: &TestFile,
    operator: &mut O,
) -> Result<TestOutcome>
where
    O: Operator + ?Sized,
{
    let mut cmd = suite.runner.command(port, &file.path);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!("Running test script: {cmd:?}");

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to start script runner '{}': {e}", suite.runner.program);
            let text = format!("{}: {e}", suite.runner.program);
            operator.notify(Notice::TestErrorOutput { text: &text });
            return Ok(TestOutcome::Failure);
        },
    };

    // stderr is drained concurrently with stdout.
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut bytes) {
                debug!("Failed to read script runner stderr: {e}");
            }
            String::from_utf8_lossy(&bytes).into_owned()
        })
    });

    let scanned = match child.stdout.take() {
        Some(stdout) => scan_output(BufReader::new(stdout), &suite.sentinel, |line| {
            operator.notify(Notice::TestOutput { line });
        }),
        None => Ok(false),
    };
    let found = reap_child(&mut child, scanned, &file.name);

    let stderr_text = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let stderr_text = stderr_text.trim();
    if !stderr_text.is_empty() {
        operator.notify(Notice::TestErrorOutput { text: stderr_text });
    }

    Ok(if found? {
        TestOutcome::Success
    } else {
        TestOutcome::Failure
    })
}

/// Wait for a script runner once its stdout has been consumed.
///
/// A failed stdout read kills the child first, so it is always reaped
/// before the read error is returned.
fn reap_child(child: &mut Child, scanned: io::Result<bool>, name: &str) -> Result<bool> {
    if let Err(e) = &scanned {
        warn!("Lost script runner output for {name}: {e}");
        if let Err(e) = child.kill() {
            debug!("Failed to stop script runner for {name}: {e}");
        }
    }

    let status = child.wait();
    let found = scanned?;
    let status = status?;
    debug!("Script runner for {name} exited: {status}");
    Ok(found)
}

/// Run every test script in `suite.dir` against `port`, stopping at the
/// first failure.
///
/// A missing or unreadable directory is reported and treated as an empty
/// suite.
pub fn run_all_tests<O>(suite: &TestSuite, port: &str, operator: &mut O) -> Result<SuiteReport>
where
    O: Operator + ?Sized,
{
    let files = match find_test_files(&suite.dir, &suite.prefix, &suite.extension) {
        Ok(files) => files,
        Err(e) => {
            warn!("Cannot list test directory {}: {e}", suite.dir.display());
            let error = e.to_string();
            operator.notify(Notice::TestDirUnreadable {
                dir: &suite.dir,
                error: &error,
            });
            Vec::new()
        },
    };

    let total = files.len();
    info!("Running {total} test file(s) against {port}");
    operator.notify(Notice::SuiteStarted { total });

    let mut report = SuiteReport::default();
    let mut remaining = files.into_iter().enumerate();

    for (index, file) in remaining.by_ref() {
        operator.notify(Notice::TestStarted {
            name: &file.name,
            index,
            total,
        });

        let outcome = run_test_file(suite, port, &file, operator)?;
        operator.notify(Notice::TestFinished {
            name: &file.name,
            outcome,
        });
        report.results.push(TestResult { file, outcome });

        if !outcome.is_success() {
            break;
        }
    }

    report.skipped = remaining.map(|(_, file)| file).collect();
    if !report.skipped.is_empty() {
        debug!("Skipped {} test file(s) after failure", report.skipped.len());
    }

    operator.notify(Notice::SuiteFinished {
        passed: report.passed(),
    });
    Ok(report)
}
