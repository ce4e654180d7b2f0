// Copyright 2018-2025 the Deno authors. MIT license.

use std::error::Error;
use std::fmt::Write;

/// Formats the causes of an error with numbered lines.
///
/// The error's own message is left to the caller; each distinct message in
/// its source chain gets a numbered prefix (0:, 1:, 2:, etc.). Consecutive
/// duplicates are skipped, since wrappers often repeat their source's text.
pub fn format_error_chain(error: &dyn Error) -> String {
    let mut message = String::new();
    let mut display_count = 0;
    let mut past_message = error.to_string();

    let mut maybe_source = error.source();
    while let Some(source) = maybe_source {
        let current_message = source.to_string();
        maybe_source = source.source();

        if current_message != past_message {
            let _ = write!(&mut message, "\n    {display_count}: {current_message}");
            past_message = current_message;
            display_count += 1;
        }

        // Limit depth to prevent infinite loops
        if display_count >= 8 {
            message.push_str("\n    ...");
            break;
        }
    }

    message
}
