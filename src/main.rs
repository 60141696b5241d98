//! modes-receiver: a real-time Mode S / ADS-B 1090 MHz squitter receiver.

mod config;
mod correct;
mod correlator;
mod crc;
mod demod;
mod error;
mod filterbank;
mod iqblock;
mod mailbox;
mod magnitude;
mod message;
mod pipeline;
mod registry;
mod source;

#[cfg(test)]
mod test_support;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Config, Mode};
use crate::error::{BlockError, ReceiverError};
use crate::iqblock::{IqBlock, BLOCK_SAMPLES, N_PHASES};
use crate::mailbox::Mailbox;
use crate::pipeline::Pipeline;
use crate::source::{FileSource, HardwareSource, SampleSource};

fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn install_signal_handler(running: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    });
    if let Err(e) = result {
        error!("failed to install signal handler: {e}");
    }
}

fn main() -> Result<(), ReceiverError> {
    let config = Config::from_args().map_err(ReceiverError::Setup)?;
    init_tracing(config.debug);
    info!("modes-receiver starting with mode {:?}", config.mode);

    let running = Arc::new(AtomicBool::new(true));
    install_signal_handler(Arc::clone(&running));

    match &config.mode {
        Mode::LiveHardware => {
            let source = HardwareSource::spawn(&config.hardware_command, &config.hardware_args)
                .map_err(ReceiverError::Setup)?;
            run_decode(Box::new(source), &config, running)
        }
        Mode::OfflineFile(path) => {
            let source = FileSource::open(Some(path.as_str())).map_err(ReceiverError::Setup)?;
            run_decode(Box::new(source), &config, running)
        }
        Mode::DumpToFile(path) => {
            let source = HardwareSource::spawn(&config.hardware_command, &config.hardware_args)
                .map_err(ReceiverError::Setup)?;
            run_dump(Box::new(source), path, running)
        }
    }
}

/// Copies raw bytes from `source` straight to `path`, performing no decoding
/// at all.
fn run_dump(
    mut source: Box<dyn SampleSource + Send>,
    path: &str,
    running: Arc<AtomicBool>,
) -> Result<(), ReceiverError> {
    let mut out = std::fs::File::create(path).map_err(|source_err| error::SetupError::OpenFile {
        path: path.to_string(),
        source: source_err,
    })?;

    let mut buf = vec![0u8; 2 * BLOCK_SAMPLES];
    while running.load(Ordering::SeqCst) {
        match source.read_block(&mut buf) {
            Ok(()) => {
                out.write_all(&buf).map_err(BlockError::Io)?;
            }
            Err(BlockError::Eof) => break,
            Err(e) => return Err(ReceiverError::Block(e)),
        }
    }

    Ok(())
}

/// Runs the producer (block reader) and consumer (decode pipeline) on two OS
/// threads, coupled through a single-slot [`Mailbox`].
fn run_decode(
    mut source: Box<dyn SampleSource + Send>,
    config: &Config,
    running: Arc<AtomicBool>,
) -> Result<(), ReceiverError> {
    let mailbox = Arc::new(Mailbox::new());
    let policy = config.policy();
    let threshold = config.detect_thresh;

    let producer_mailbox = Arc::clone(&mailbox);
    let producer_running = Arc::clone(&running);
    let producer = thread::spawn(move || -> Result<(), BlockError> {
        let mut raw = vec![0u8; 2 * BLOCK_SAMPLES];
        while producer_running.load(Ordering::SeqCst) {
            match source.read_block(&mut raw) {
                Ok(()) => {
                    let mut block = IqBlock::new(BLOCK_SAMPLES);
                    block.fill_from_bytes(&raw);
                    producer_mailbox.send_blocking(block);
                }
                Err(BlockError::Eof) => break,
                Err(e) => {
                    producer_mailbox.close();
                    return Err(e);
                }
            }
        }
        producer_mailbox.close();
        Ok(())
    });

    let consumer_mailbox = Arc::clone(&mailbox);
    let consumer = thread::spawn(move || {
        let mut pipeline = Pipeline::new(BLOCK_SAMPLES, threshold, policy);
        let mut block_index: u64 = 0;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();

        while let Some(block) = consumer_mailbox.recv() {
            for (decoded, phase, start) in pipeline.process_block(&block) {
                let sample_index = block_index * BLOCK_SAMPLES as u64 + start as u64;
                let phase_percent = (phase * 100 / N_PHASES) as u32;
                let line = message::format_line(&decoded, sample_index, phase_percent);
                if writeln!(handle, "{line}").is_err() {
                    break;
                }
            }
            block_index += 1;
        }
    });

    let producer_result = producer.join().map_err(|_| ReceiverError::WorkerPanicked)?;
    consumer.join().map_err(|_| ReceiverError::WorkerPanicked)?;

    producer_result.map_err(ReceiverError::Block)
}
