use anyhow::{Context, Result, bail};
use tracing::info;

use super::command::ProcessArgs;
use dng_decrement::image_pipeline::{DecrementPipeline, PipelineConfig};

pub fn cmd_process(args: &ProcessArgs) -> Result<()> {
    let config = PipelineConfig::builder()
        .compression(args.compression.into())
        .create_backup(!args.no_backup)
        .raw_extensions(&args.extensions)
        .build();
    let pipeline = DecrementPipeline::new(config);

    info!("Compression: {:?}", pipeline.config().compression);
    info!(
        "Backups: {}",
        if pipeline.config().create_backup {
            "enabled"
        } else {
            "disabled"
        }
    );

    let report = pipeline
        .process_directory(&args.dir)
        .with_context(|| format!("cannot scan {}", args.dir.display()))?;

    for processed in &report.processed {
        println!(
            "{} -> {} ({}, {} bit)",
            processed.input.display(),
            processed.output.display(),
            processed.shape,
            processed.bits_per_sample
        );
        if args.timings {
            println!("{}", processed.timings);
        }
    }
    for (path, error) in &report.failed {
        println!("{}: FAILED ({})", path.display(), error);
    }
    println!(
        "Processed {} of {} file(s)",
        report.processed.len(),
        report.total()
    );

    if !report.is_success() {
        bail!("{} file(s) failed", report.failed.len());
    }
    Ok(())
}
