use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::warn;

use super::command::VerifyArgs;
use dng_decrement::image_pipeline::{PipelineConfig, Verifier, discover_raw_files};

pub fn cmd_verify(args: &VerifyArgs) -> Result<()> {
    let verifier = Verifier::new();

    match (&args.first, &args.second) {
        (Some(first), Some(second)) => {
            let report = verifier.compare_files(first, second).with_context(|| {
                format!("cannot compare {} with {}", first.display(), second.display())
            })?;
            println!("{}", report);
        }
        (Some(path), None) => {
            let summary = verifier
                .inspect_file(path)
                .with_context(|| format!("cannot inspect {}", path.display()))?;
            println!("{}:\n{}", path.display(), summary);
        }
        (None, _) => inspect_directory(&verifier, Path::new("."))?,
    }
    Ok(())
}

fn inspect_directory(verifier: &Verifier, dir: &Path) -> Result<()> {
    let files = discover_raw_files(dir, &PipelineConfig::default())
        .with_context(|| format!("cannot scan {}", dir.display()))?;
    if files.is_empty() {
        warn!("No raw files found in {}", dir.display());
        return Ok(());
    }

    let mut failed = 0;
    for (path, result) in verifier.inspect_files(&files) {
        match result {
            Ok(summary) => println!("{}:\n{}", path.display(), summary),
            Err(e) => {
                println!("{}: FAILED ({})", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) could not be inspected", failed, files.len());
    }
    Ok(())
}
