//! Sample sources: a plain file/stdin reader for offline decode and raw
//! dumps, and a subprocess-backed reader for live hardware.

use std::fs::File;
use std::io::{self, Read, Stdin};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::warn;

use crate::error::{BlockError, SetupError};

pub trait SampleSource {
    /// Fills `buf` completely or reports why it couldn't.
    fn read_block(&mut self, buf: &mut [u8]) -> Result<(), BlockError>;
}

enum FileInput {
    File(File),
    Stdin(Stdin),
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileInput::File(f) => f.read(buf),
            FileInput::Stdin(s) => s.read(buf),
        }
    }
}

/// Reads raw IQ bytes from a file, or from stdin when no path is given. A
/// short read here means end of input, not an error: offline decode and dump
/// consumers are expected to run off the end of a finite capture.
pub struct FileSource {
    input: FileInput,
}

impl FileSource {
    pub fn open(path: Option<&str>) -> Result<Self, SetupError> {
        let input = match path {
            Some(path) => FileInput::File(File::open(path).map_err(|source| SetupError::OpenFile {
                path: path.to_string(),
                source,
            })?),
            None => FileInput::Stdin(io::stdin()),
        };
        Ok(Self { input })
    }
}

impl SampleSource for FileSource {
    fn read_block(&mut self, buf: &mut [u8]) -> Result<(), BlockError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.input.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Err(BlockError::Eof);
                }
                return Err(BlockError::WrongLength {
                    expected: buf.len(),
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }
}

/// Launches an external SDR capture tool and reads its standard output. A
/// short read here is fatal: the hardware stream isn't expected to end on
/// its own, so anything short of a full block means the device or the
/// subprocess died mid-capture.
pub struct HardwareSource {
    child: Child,
    stdout: ChildStdout,
}

impl HardwareSource {
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, SetupError> {
        let mut child = Command::new(command)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SetupError::SpawnHardware {
                command: command.to_string(),
                source,
            })?;
        let stdout = child.stdout.take().expect("child spawned with piped stdout");
        Ok(Self { child, stdout })
    }
}

impl SampleSource for HardwareSource {
    fn read_block(&mut self, buf: &mut [u8]) -> Result<(), BlockError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stdout.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(BlockError::WrongLength {
                    expected: buf.len(),
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }
}

impl Drop for HardwareSource {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("failed to kill hardware source process: {e}");
        }
        let _ = self.child.wait();
    }
}
