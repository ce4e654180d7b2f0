//! User-visible failure channel.

use deno_terminal::colors;

/// Shows a blocking failure message to the user.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Writes failures to stderr, in the CLI's error style.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{}: {}", colors::red_bold("error"), message);
    }
}
