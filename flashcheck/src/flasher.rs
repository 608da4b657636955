//! Firmware writer.
//!
//! Flashing is delegated to an external tool (esptool by default) invoked as
//! a single blocking child process with a fixed argument profile. Its exit
//! status is handed back untouched; deciding what a failure means for the
//! cycle is up to the caller.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus};

use log::{debug, info};

use crate::error::{Error, Result};

/// Default flashing program.
pub const DEFAULT_FLASH_TOOL: &str = "esptool";

/// Fixed protocol profile for the flashing tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashProfile {
    /// Target chip family (`--chip`).
    pub chip: String,
    /// Transfer baud rate (`--baud`).
    pub baud: u32,
    /// Behavior after the operation (`--after`).
    pub after: String,
    /// Erase the whole chip before writing (`--erase-all`).
    pub erase_all: bool,
    /// Flash offset the image is written to.
    pub offset: u32,
}

impl Default for FlashProfile {
    fn default() -> Self {
        Self {
            chip: "esp32s2".to_string(),
            baud: 460_800,
            after: "no_reset".to_string(),
            erase_all: true,
            offset: 0x1000,
        }
    }
}

impl FlashProfile {
    /// Arguments for writing `image` to `port`, without the program name.
    pub fn args(&self, port: &str, image: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--chip".into(),
            self.chip.clone().into(),
            "--port".into(),
            port.into(),
            "--baud".into(),
            self.baud.to_string().into(),
            "--after".into(),
            self.after.clone().into(),
            "write_flash".into(),
        ];
        if self.erase_all {
            args.push("--erase-all".into());
        }
        args.push(format!("{:#x}", self.offset).into());
        args.push(image.as_os_str().to_os_string());
        args
    }
}

/// Exit status of the flashing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashStatus {
    code: Option<i32>,
}

impl FlashStatus {
    /// Status from a raw exit code (`None` when killed by a signal).
    pub const fn from_code(code: Option<i32>) -> Self {
        Self { code }
    }

    /// Whether the tool reported success.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Raw exit code.
    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<ExitStatus> for FlashStatus {
    fn from(status: ExitStatus) -> Self {
        Self::from_code(status.code())
    }
}

impl std::fmt::Display for FlashStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// External flashing tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareWriter {
    /// Program to run.
    pub program: String,
    /// Arguments placed before the profile arguments (e.g. `-m esptool`).
    pub leading_args: Vec<String>,
    /// Protocol profile.
    pub profile: FlashProfile,
}

impl Default for FirmwareWriter {
    fn default() -> Self {
        Self {
            program: DEFAULT_FLASH_TOOL.to_string(),
            leading_args: Vec::new(),
            profile: FlashProfile::default(),
        }
    }
}

impl FirmwareWriter {
    /// Create a writer for `program` with the default profile.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Replace the protocol profile.
    #[must_use]
    pub fn with_profile(mut self, profile: FlashProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set arguments passed ahead of the profile arguments.
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Build the command that writes `image` to `port`.
    pub fn command(&self, port: &str, image: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(self.profile.args(port, image));
        cmd
    }

    /// Write `image` to `port` and return the tool's exit status.
    ///
    /// The tool inherits the terminal so its own progress output is visible.
    /// No retry is attempted.
    pub fn write_firmware(&self, port: &str, image: &Path) -> Result<FlashStatus> {
        if !image.is_file() {
            return Err(Error::ImageNotFound(image.to_path_buf()));
        }

        let mut cmd = self.command(port, image);
        debug!("Running flashing tool: {cmd:?}");
        info!(
            "Flashing {} to {port} at {} baud",
            image.display(),
            self.profile.baud
        );

        let status = cmd.status().map_err(|source| Error::FlashTool {
            program: self.program.clone(),
            source,
        })?;

        let status = FlashStatus::from(status);
        debug!("Flashing tool finished: {status}");
        Ok(status)
    }
}
