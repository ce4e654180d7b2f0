use carryon::error_fmt::format_error_chain;
use carryon::flag;
use deno_terminal::colors;

fn main() {
    let cli_args = flag::parse_args();

    env_logger::Builder::new()
        .filter_level(if cli_args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_env("CARRYON_LOG")
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = carryon::run(&cli_args.command) {
        eprintln!(
            "{}: {}{}",
            colors::red_bold("error"),
            e,
            format_error_chain(e.as_ref())
        );
        std::process::exit(1);
    }
}
