//! Configuration and command-line argument parsing.
//!
//! The CLI surface is deliberately narrow: no positional argument means live
//! hardware, `-w <file>` dumps raw samples without decoding, and a bare file
//! path decodes that capture offline.

use std::env;

use crate::correct::CorrectionPolicy;
use crate::error::SetupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    LiveHardware,
    DumpToFile(String),
    OfflineFile(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub detect_thresh: f32,
    pub fix_xored_crcs: bool,
    pub fix_2_bit_errors: bool,
    pub debug: bool,
    pub hardware_command: String,
    pub hardware_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::LiveHardware,
            detect_thresh: 0.0,
            fix_xored_crcs: false,
            fix_2_bit_errors: false,
            debug: false,
            hardware_command: "rtl_sdr".to_string(),
            hardware_args: vec![
                "-f".to_string(),
                "1090000000".to_string(),
                "-s".to_string(),
                "2000000".to_string(),
                "-".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn from_args() -> Result<Self, SetupError> {
        let args: Vec<String> = env::args().collect();
        Self::from_args_iter(&args[1..])
    }

    fn from_args_iter(args: &[String]) -> Result<Self, SetupError> {
        let mut config = Config::default();
        let mut positional: Option<String> = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-w" => {
                    i += 1;
                    let path = args.get(i).cloned().ok_or_else(|| {
                        SetupError::InvalidConfig("-w requires a file path".to_string())
                    })?;
                    config.mode = Mode::DumpToFile(path);
                }
                "--detect-thresh" => {
                    i += 1;
                    config.detect_thresh = args
                        .get(i)
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| {
                            SetupError::InvalidConfig("--detect-thresh requires a number".to_string())
                        })?;
                }
                "--fix-xored-crcs" => config.fix_xored_crcs = true,
                "--no-fix-xored-crcs" => config.fix_xored_crcs = false,
                "--fix-2-bit-errors" => config.fix_2_bit_errors = true,
                "--debug" => config.debug = true,
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    return Err(SetupError::InvalidConfig(format!("unknown option: {other}")));
                }
                path => {
                    if positional.is_some() {
                        return Err(SetupError::InvalidConfig(
                            "only one input file may be given".to_string(),
                        ));
                    }
                    positional = Some(path.to_string());
                }
            }
            i += 1;
        }

        if let Some(path) = positional {
            if !matches!(config.mode, Mode::DumpToFile(_)) {
                config.mode = Mode::OfflineFile(path);
            }
        }

        Ok(config)
    }

    pub fn policy(&self) -> CorrectionPolicy {
        CorrectionPolicy {
            fix_xored_crcs: self.fix_xored_crcs,
            fix_2_bit_errors: self.fix_2_bit_errors,
        }
    }
}

fn print_help() {
    println!(
        r#"modes-receiver - Mode S / ADS-B 1090 MHz squitter receiver

Usage:
  modes-receiver                 decode live from hardware
  modes-receiver -w <file>       dump raw samples to <file>, no decoding
  modes-receiver <file>          decode an offline capture

Options:
  --detect-thresh <f>      preamble correlation score threshold (default: 0.0)
  --fix-xored-crcs         accept a message whose crc-xor-received is a known address (default: off)
  --no-fix-xored-crcs      disable the above
  --fix-2-bit-errors       attempt an exhaustive two-bit-flip correction (default: off)
  --debug                  enable verbose logging
  --help                   show this help
"#
    );
}
