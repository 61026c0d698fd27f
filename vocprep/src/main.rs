//! vocprep - Main entry point
//!
//! Loads configuration, selects the processing mode from the supplied input
//! directories, and runs every resolved id through it.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vocprep::cli::Args;
use vocprep::{HtsLabelLoader, ProcessingMode, Processor, VocoderSettings, VocoderWavLoader};
use vocprep_common::config::{load_config, resolve_log_level};
use vocprep_common::logging;

fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    let level = resolve_log_level(args.log_level.as_deref(), &config.logging);
    logging::init(&level).context("Failed to initialize logging")?;

    info!("Starting vocprep v{}", env!("CARGO_PKG_VERSION"));
    source.report();

    let mode = ProcessingMode::from_dirs(args.lab_dir.as_deref(), args.wav_dir.as_deref())?;
    info!("Mode: {}", mode);

    let labels = HtsLabelLoader::from_config(&config.label, config.frame_shift_ms)
        .context("Failed to initialize label loader")?;
    let wavs = VocoderWavLoader::new(VocoderSettings::from_config(
        &config.vocoder,
        config.frame_shift_ms,
    ));

    let processor = Processor::new(labels, wavs, &args.out_dir);
    let summary = processor.run(&mode, args.id_list.as_deref())?;

    info!(
        "Processed {} ids ({} mode), wrote {} files to {}",
        summary.processed,
        summary.mode,
        summary.files_written,
        processor.out_dir().display()
    );

    Ok(())
}
