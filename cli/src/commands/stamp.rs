use crate::commands::write_launcher;
use crate::flag::StampArgs;
use anyhow::Context;
use std::fs;
use utils::trailer;

pub fn execute(args: &StampArgs) -> anyhow::Result<()> {
    let source = fs::read(&args.launcher)
        .with_context(|| format!("failed to read {}", args.launcher.display()))?;
    let stamped = trailer::stamp(&source, args.params.as_bytes())
        .with_context(|| format!("cannot stamp {}", args.launcher.display()))?;

    let output = args.output.as_ref().unwrap_or(&args.launcher);
    write_launcher(output, &stamped)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Stamped {} bytes of parameters into {}",
        args.params.len(),
        output.display()
    );
    Ok(())
}
