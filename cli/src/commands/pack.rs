use crate::commands::write_launcher;
use crate::flag::PackArgs;
use anyhow::{Context, bail};
use std::fs;
use std::path::{Path, PathBuf};
use utils::section;
use utils::{GateConfig, Manifest, PASSENGER, PREREQUISITE, PayloadBundle, SECTION_NAME};

pub fn execute(args: &PackArgs) -> anyhow::Result<()> {
    let manifest = resolve_manifest(args)?;
    let bundle = build_bundle(args, manifest)?;
    let bundle_bytes = bundle
        .to_bytes()
        .context("failed to serialize payload bundle")?;

    let runtime_path = match &args.runtime {
        Some(path) => path.clone(),
        None => default_runtime()?,
    };
    let stub = fs::read(&runtime_path).with_context(|| {
        format!(
            "Runtime binary not found at: {}\nPlease build the project with: cargo build --release",
            runtime_path.display()
        )
    })?;

    let launcher = section::assemble(&stub, SECTION_NAME, bundle_bytes, args.reserve)
        .with_context(|| format!("cannot build a launcher from {}", runtime_path.display()))?;

    write_launcher(&args.output, &launcher)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let size_mb = launcher.len() as f64 / 1024.0 / 1024.0;
    println!("Successfully created: {}", args.output.display());
    println!("Size: {size_mb:.2} MB ({} bytes of parameter space)", args.reserve);

    Ok(())
}

/// Manifest from `--manifest` (or defaults), with flags taking precedence.
///
/// # Errors
/// Returns an error if the manifest file cannot be read or parsed
pub fn resolve_manifest(args: &PackArgs) -> anyhow::Result<Manifest> {
    let mut manifest = match &args.manifest {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read manifest {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid manifest {}", path.display()))?
        }
        None => Manifest::default(),
    };

    if let Some(prefix) = &args.temp_prefix {
        manifest.temp_prefix.clone_from(prefix);
    }
    if let Some(prerequisite_args) = &args.prerequisite_args {
        manifest.prerequisite_args.clone_from(prerequisite_args);
    }
    if let Some(path) = &args.gate_path {
        manifest.gate = GateConfig::PathExists { path: path.clone() };
    }
    if let Some(cleanup) = args.cleanup {
        manifest.cleanup = cleanup;
    }
    log::debug!("resolved manifest: {manifest:?}");
    Ok(manifest)
}

/// Collects the payload files named by `args` into a bundle.
///
/// # Errors
/// Returns an error if a payload cannot be read, or the gate and the
/// prerequisite are configured inconsistently
pub fn build_bundle(args: &PackArgs, manifest: Manifest) -> anyhow::Result<PayloadBundle> {
    match (&manifest.gate, &args.prerequisite) {
        (GateConfig::PathExists { path }, None) => {
            bail!("gate path '{path}' is set but no --prerequisite installer was given")
        }
        (GateConfig::None, Some(prerequisite)) => log::warn!(
            "{} is embedded but no gate is configured, so it will never run",
            prerequisite.display()
        ),
        _ => {}
    }

    let mut bundle =
        PayloadBundle::new(manifest).with_payload(PASSENGER, read_payload(&args.passenger)?);
    if let Some(prerequisite) = &args.prerequisite {
        bundle = bundle.with_payload(PREREQUISITE, read_payload(prerequisite)?);
    }
    Ok(bundle)
}

fn read_payload(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", path.display());
    }
    log::info!("embedding {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// The launcher stub installed next to this executable.
fn default_runtime() -> anyhow::Result<PathBuf> {
    let current_exe = std::env::current_exe()?;
    let exe_dir = current_exe
        .parent()
        .context("Failed to get executable directory")?;

    let runtime_name = if cfg!(windows) {
        "carryonrt.exe"
    } else {
        "carryonrt"
    };
    Ok(exe_dir.join(runtime_name))
}
