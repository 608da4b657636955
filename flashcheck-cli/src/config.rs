//! Configuration file support for flashcheck.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (FLASHCHECK_*)
//! 3. Local config file (./flashcheck.toml)
//! 4. Global config file (~/.config/flashcheck/config.toml)
//!
//! `--config <PATH>` replaces sources 3 and 4.

use {
    directories::ProjectDirs,
    flashcheck::{
        BoardProfile, FirmwareWriter, FlashGate, FlashProfile, ScriptRunner, TestSuite,
        UsbIdentity,
    },
    log::{debug, warn},
    serde::{Deserialize, Serialize},
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Local configuration file name.
const LOCAL_CONFIG_FILE: &str = "flashcheck.toml";

/// USB identity overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// USB vendor id shared by both modes.
    pub vid: Option<u16>,
    /// Product id in bootloader mode.
    pub bootloader_pid: Option<u16>,
    /// Product id while the application firmware runs.
    pub runtime_pid: Option<u16>,
}

/// Flashing tool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashConfig {
    /// Flashing tool executable.
    pub tool: Option<String>,
    /// Arguments placed before the generated ones (e.g. `["-m", "esptool"]`).
    pub tool_args: Option<Vec<String>>,
    /// Chip name passed with `--chip`.
    pub chip: Option<String>,
    /// Baud rate.
    pub baud: Option<u32>,
    /// Flash offset of the image.
    pub offset: Option<u32>,
    /// `--after` action.
    pub after: Option<String>,
    /// Erase the whole flash before writing.
    pub erase_all: Option<bool>,
    /// Skip discovery and tests when flashing fails.
    pub strict: Option<bool>,
}

/// Test suite settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestsConfig {
    /// Directory holding the test scripts.
    pub dir: Option<PathBuf>,
    /// Required file-name prefix.
    pub prefix: Option<String>,
    /// Required file extension (without the dot).
    pub extension: Option<String>,
    /// Success marker searched in each output line.
    pub sentinel: Option<String>,
    /// Script runner executable.
    pub runner: Option<String>,
    /// Script runner arguments with `{port}` and `{script}` placeholders.
    pub runner_args: Option<Vec<String>>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device identity.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Flashing tool.
    #[serde(default)]
    pub flash: FlashConfig,
    /// Test suite.
    #[serde(default)]
    pub tests: TestsConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "flashcheck").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one. Values set in `other` win.
    fn merge(&mut self, other: Self) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.device.vid, other.device.vid);
        take(&mut self.device.bootloader_pid, other.device.bootloader_pid);
        take(&mut self.device.runtime_pid, other.device.runtime_pid);

        take(&mut self.flash.tool, other.flash.tool);
        take(&mut self.flash.tool_args, other.flash.tool_args);
        take(&mut self.flash.chip, other.flash.chip);
        take(&mut self.flash.baud, other.flash.baud);
        take(&mut self.flash.offset, other.flash.offset);
        take(&mut self.flash.after, other.flash.after);
        take(&mut self.flash.erase_all, other.flash.erase_all);
        take(&mut self.flash.strict, other.flash.strict);

        take(&mut self.tests.dir, other.tests.dir);
        take(&mut self.tests.prefix, other.tests.prefix);
        take(&mut self.tests.extension, other.tests.extension);
        take(&mut self.tests.sentinel, other.tests.sentinel);
        take(&mut self.tests.runner, other.tests.runner);
        take(&mut self.tests.runner_args, other.tests.runner_args);
    }

    /// USB identities of the board.
    pub fn board_profile(&self) -> BoardProfile {
        let defaults = BoardProfile::default();
        let vid = self.device.vid;
        BoardProfile {
            bootloader: UsbIdentity::new(
                vid.unwrap_or(defaults.bootloader.vid),
                self.device.bootloader_pid.unwrap_or(defaults.bootloader.pid),
            ),
            runtime: UsbIdentity::new(
                vid.unwrap_or(defaults.runtime.vid),
                self.device.runtime_pid.unwrap_or(defaults.runtime.pid),
            ),
        }
    }

    /// Flashing tool invocation.
    pub fn firmware_writer(&self) -> FirmwareWriter {
        let defaults = FlashProfile::default();
        let flash = &self.flash;
        let profile = FlashProfile {
            chip: flash.chip.clone().unwrap_or(defaults.chip),
            baud: flash.baud.unwrap_or(defaults.baud),
            after: flash.after.clone().unwrap_or(defaults.after),
            erase_all: flash.erase_all.unwrap_or(defaults.erase_all),
            offset: flash.offset.unwrap_or(defaults.offset),
        };

        let writer = match &flash.tool {
            Some(tool) => FirmwareWriter::new(tool.clone()),
            None => FirmwareWriter::default(),
        };
        let writer = writer.with_profile(profile);
        match &flash.tool_args {
            Some(args) => writer.with_leading_args(args),
            None => writer,
        }
    }

    /// Test suite, with `test_dir` (from `--test-dir` or the environment)
    /// taking precedence over the file.
    pub fn test_suite(&self, test_dir: Option<&Path>) -> TestSuite {
        let defaults = TestSuite::default();
        let tests = &self.tests;

        let runner = match (&tests.runner, &tests.runner_args) {
            (None, None) => defaults.runner,
            (program, args) => ScriptRunner::new(
                program.clone().unwrap_or(defaults.runner.program),
                args.clone().unwrap_or(defaults.runner.args),
            ),
        };

        TestSuite {
            dir: test_dir
                .map(Path::to_path_buf)
                .or_else(|| tests.dir.clone())
                .unwrap_or(defaults.dir),
            prefix: tests.prefix.clone().unwrap_or(defaults.prefix),
            extension: tests.extension.clone().unwrap_or(defaults.extension),
            sentinel: tests.sentinel.clone().unwrap_or(defaults.sentinel),
            runner,
        }
    }

    /// Flash gating; `--strict` forces strict mode.
    pub fn flash_gate(&self, strict_flag: bool) -> FlashGate {
        if strict_flag || self.flash.strict.unwrap_or(false) {
            FlashGate::Strict
        } else {
            FlashGate::Permissive
        }
    }
}
