use anyhow::{Context, Result};

use super::command::ConvertArgs;
use dng_decrement::image_pipeline::Repacker;

pub fn cmd_convert(args: &ConvertArgs) -> Result<()> {
    let repacked = Repacker::new()
        .convert_file(&args.modified, &args.original, args.output.as_deref())
        .with_context(|| {
            format!(
                "cannot repack {} into {}",
                args.modified.display(),
                args.original.display()
            )
        })?;

    println!(
        "Wrote {} ({}, {:?})",
        repacked.output.display(),
        repacked.shape,
        repacked.mode
    );
    Ok(())
}
