// Copyright 2018-2025 the Deno authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

use std::path::{Path, PathBuf};

/// Quotes a path so it reads as one token at the start of a command line.
///
/// On Windows the path is wrapped in double quotes, the form `CreateProcess`
/// expects; paths cannot contain `"` there. Elsewhere the path is
/// single-quoted the way `/bin/sh` would read it, with embedded single
/// quotes spliced as `'\''`.
///
/// # Examples
///
/// ```
/// # use std::path::Path;
/// # use carryon_path_util::quote_path;
/// # #[cfg(unix)]
/// # {
/// assert_eq!(quote_path(Path::new("/tmp/PASS1.tmp")), "'/tmp/PASS1.tmp'");
/// # }
/// ```
pub fn quote_path(path: &Path) -> String {
    let path = strip_unc_prefix(path.to_path_buf());
    let text = path.to_string_lossy();
    if cfg!(windows) {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

/// Joins a quoted program path and a raw parameter string.
///
/// The parameters are appended untouched; an empty parameter string yields
/// just the quoted path.
pub fn command_line(program: &Path, parameters: &str) -> String {
    let mut line = quote_path(program);
    if !parameters.is_empty() {
        line.push(' ');
        line.push_str(parameters);
    }
    line
}

/// Strips the UNC prefix from a Windows path.
///
/// Canonicalized and temp paths on Windows may carry `\\?\`, which the shell
/// refuses to open.
///
/// On non-Windows platforms, this function returns the path unchanged.
#[cfg(not(windows))]
#[inline]
pub fn strip_unc_prefix(path: PathBuf) -> PathBuf {
    path
}

/// Strips the unc prefix (ex. \\?\) from Windows paths.
#[cfg(windows)]
pub fn strip_unc_prefix(path: PathBuf) -> PathBuf {
    use std::path::Component;
    use std::path::Prefix;

    let mut components = path.components();
    match components.next() {
        Some(Component::Prefix(prefix)) => match prefix.kind() {
            // \\?\c:\path
            Prefix::VerbatimDisk(_) => {
                let mut stripped = PathBuf::new();
                stripped.push(prefix.as_os_str().to_string_lossy().replace(r"\\?\", ""));
                stripped.extend(components);
                stripped
            }
            // \\?\UNC\hostname\share_name\path
            Prefix::VerbatimUNC(hostname, share_name) => {
                let mut stripped = PathBuf::new();
                stripped.push(format!(
                    r"\\{}\{}\",
                    hostname.to_string_lossy(),
                    share_name.to_string_lossy()
                ));
                stripped.extend(components.filter(|c| !matches!(c, Component::RootDir)));
                stripped
            }
            _ => path,
        },
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_quote_path_unix() {
        assert_eq!(quote_path(Path::new("/tmp/a b")), "'/tmp/a b'");
        assert_eq!(quote_path(Path::new("/tmp/it's")), r"'/tmp/it'\''s'");
    }

    #[test]
    #[cfg(windows)]
    fn test_quote_path_windows() {
        assert_eq!(
            quote_path(Path::new(r"\\?\C:\Temp\PASS1.tmp.exe")),
            r#""C:\Temp\PASS1.tmp.exe""#
        );
    }

    #[test]
    fn test_command_line_appends_raw_parameters() {
        let program = Path::new("prog");
        let quoted = quote_path(program);
        assert_eq!(command_line(program, ""), quoted);
        assert_eq!(
            command_line(program, r#"--name "a b"  -x"#),
            format!(r#"{quoted} --name "a b"  -x"#)
        );
    }

    #[cfg(windows)]
    #[test]
    fn test_strip_unc_prefix() {
        fn run_test(input: &str, expected: &str) {
            assert_eq!(
                super::strip_unc_prefix(PathBuf::from(input)),
                PathBuf::from(expected)
            );
        }

        run_test(r"C:\", r"C:\");
        run_test(r"\\?\C:\", r"C:\");
        run_test(r"\\?\C:\Temp\PASS1.tmp", r"C:\Temp\PASS1.tmp");
        run_test(r"\\?\UNC\localhost\c$\", r"\\localhost\c$");
    }

    #[test]
    #[cfg(not(windows))]
    fn test_strip_unc_prefix_noop() {
        let path = PathBuf::from("/tmp/PASS1.tmp");
        let stripped = strip_unc_prefix(path.clone());
        assert_eq!(stripped, path);
    }
}
