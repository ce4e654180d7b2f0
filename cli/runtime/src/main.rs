// Launcher stub: the packer copies this binary and embeds the payloads into it.
use carryon_runtime::{Image, StderrNotifier};

fn main() {
    env_logger::Builder::new()
        .parse_env(env_logger::Env::new().filter_or("CARRYON_LOG", "warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    std::process::exit(carryon_runtime::finish(run(), &StderrNotifier));
}

fn run() -> anyhow::Result<()> {
    let image = Image::current();
    let report = carryon_runtime::run_launcher(&image)?;
    log::info!(
        "launched {} ({} bytes)",
        report.passenger.path().display(),
        report.passenger.written()
    );
    Ok(())
}
