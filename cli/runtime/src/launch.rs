//! Launch strategies for extracted files.

use crate::error::{Check, LaunchError, sites};
use crate::params::Parameters;
use carryon_path_util::command_line;
use std::path::Path;
use std::process::{Child, Command, ExitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    ShellOpen,
    DirectCreate,
}

/// How long a launch request blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Return once the launch has been dispatched
    Dispatch,
    /// Return once the launched program has exited
    Exit,
}

/// Result of a launch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Launched {
    pub pid: Option<u32>,
    /// Exit status, when the request waited for exit
    pub status: Option<ExitStatus>,
}

/// Starts an extracted file with a parameter string.
pub trait LaunchStrategy {
    fn mode(&self) -> LaunchMode;

    /// Extension the extracted file needs for this strategy to run it.
    fn executable_suffix(&self) -> Option<&'static str> {
        None
    }

    /// # Errors
    /// Returns the strategy's launch error if the OS refuses the request
    fn launch(
        &self,
        path: &Path,
        parameters: &Parameters,
        wait: WaitMode,
    ) -> Result<Launched, LaunchError>;
}

/// Hands the extracted file to the platform's launch service.
///
/// On Windows this is `ShellExecuteExW` with the parameter string passed
/// as-is in `lpParameters`. Elsewhere the file is spawned in its own process
/// group, detached from the launcher's job. Either way the parameters never
/// pass through a command interpreter, and a file that cannot be started is
/// reported as a dispatch failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellOpen;

impl LaunchStrategy for ShellOpen {
    fn mode(&self) -> LaunchMode {
        LaunchMode::ShellOpen
    }

    fn executable_suffix(&self) -> Option<&'static str> {
        if cfg!(windows) { Some(".exe") } else { None }
    }

    fn launch(
        &self,
        path: &Path,
        parameters: &Parameters,
        wait: WaitMode,
    ) -> Result<Launched, LaunchError> {
        log::info!(
            "asking the shell to open {}",
            command_line(path, &parameters.to_string_lossy())
        );
        shell_open(path, parameters, wait)
    }
}

#[cfg(windows)]
fn shell_open(
    path: &Path,
    parameters: &Parameters,
    wait: WaitMode,
) -> Result<Launched, LaunchError> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::GetProcessId;
    use windows_sys::Win32::UI::Shell::{
        SEE_MASK_FLAG_NO_UI, SEE_MASK_NOASYNC, SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW,
        ShellExecuteExW,
    };
    use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let verb = wide(OsStr::new("open"));
    let file = wide(path.as_os_str());
    let params = wide(OsStr::new(parameters.to_string_lossy().as_ref()));

    // SAFETY: SHELLEXECUTEINFOW is plain data; all-zero is its empty value.
    let mut info: SHELLEXECUTEINFOW = unsafe { std::mem::zeroed() };
    info.cbSize = std::mem::size_of::<SHELLEXECUTEINFOW>() as u32;
    info.fMask = SEE_MASK_NOCLOSEPROCESS | SEE_MASK_NOASYNC | SEE_MASK_FLAG_NO_UI;
    info.lpVerb = verb.as_ptr();
    info.lpFile = file.as_ptr();
    info.lpParameters = params.as_ptr();
    info.nShow = SW_SHOWNORMAL as i32;

    // SAFETY: the strings `info` points into outlive the call.
    if unsafe { ShellExecuteExW(&mut info) } == 0 {
        return Err(LaunchError::os(
            sites::SHELL_OPEN,
            std::io::Error::last_os_error(),
        ));
    }

    let process = info.hProcess;
    if process == 0 {
        // Handed to an already running process; nothing to wait on.
        return Ok(Launched::default());
    }
    // SAFETY: `process` is a live handle owned by this function.
    let pid = Some(unsafe { GetProcessId(process) }).filter(|&id| id != 0);
    let status = match wait {
        WaitMode::Dispatch => Ok(None),
        WaitMode::Exit => wait_for_process(process).map(Some),
    };
    // SAFETY: closed exactly once, after its last use.
    unsafe { CloseHandle(process) };
    Ok(Launched {
        pid,
        status: status?,
    })
}

#[cfg(windows)]
fn wait_for_process(
    process: windows_sys::Win32::Foundation::HANDLE,
) -> Result<ExitStatus, LaunchError> {
    use std::os::windows::process::ExitStatusExt;
    use windows_sys::Win32::Foundation::WAIT_FAILED;
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, INFINITE, WaitForSingleObject,
    };

    // SAFETY: the caller keeps `process` open for the duration of the call.
    if unsafe { WaitForSingleObject(process, INFINITE) } == WAIT_FAILED {
        return Err(LaunchError::os(
            sites::PROCESS_WAIT,
            std::io::Error::last_os_error(),
        ));
    }
    let mut code = 0u32;
    // SAFETY: as above; `code` is a valid out pointer.
    if unsafe { GetExitCodeProcess(process, &mut code) } == 0 {
        return Err(LaunchError::os(
            sites::PROCESS_WAIT,
            std::io::Error::last_os_error(),
        ));
    }
    Ok(ExitStatus::from_raw(code))
}

#[cfg(unix)]
fn shell_open(
    path: &Path,
    parameters: &Parameters,
    wait: WaitMode,
) -> Result<Launched, LaunchError> {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new(path);
    cmd.args(unix_args(parameters)).process_group(0);
    let child = cmd.spawn().check(sites::SHELL_OPEN)?;
    settle(child, wait)
}

/// Creates the process directly from the extracted file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCreate;

impl LaunchStrategy for DirectCreate {
    fn mode(&self) -> LaunchMode {
        LaunchMode::DirectCreate
    }

    fn launch(
        &self,
        path: &Path,
        parameters: &Parameters,
        wait: WaitMode,
    ) -> Result<Launched, LaunchError> {
        log::info!(
            "starting {}",
            command_line(path, &parameters.to_string_lossy())
        );
        let child = direct_command(path, parameters)
            .spawn()
            .check(sites::PROCESS_CREATE)?;
        settle(child, wait)
    }
}

/// Waits for `child` if asked to, then drops it, which releases its handles
/// without waiting.
fn settle(mut child: Child, wait: WaitMode) -> Result<Launched, LaunchError> {
    let pid = Some(child.id());
    let status = match wait {
        WaitMode::Dispatch => None,
        WaitMode::Exit => Some(child.wait().check(sites::PROCESS_WAIT)?),
    };
    drop(child);
    Ok(Launched { pid, status })
}

#[cfg(windows)]
fn direct_command(path: &Path, parameters: &Parameters) -> Command {
    use std::os::windows::process::CommandExt;

    let mut cmd = Command::new(path);
    if !parameters.is_empty() {
        cmd.raw_arg(parameters.to_string_lossy().as_ref());
    }
    cmd
}

#[cfg(unix)]
fn direct_command(path: &Path, parameters: &Parameters) -> Command {
    let mut cmd = Command::new(path);
    cmd.args(unix_args(parameters));
    cmd
}

/// Parameter bytes split into argv, without any lossy conversion.
#[cfg(unix)]
fn unix_args(parameters: &Parameters) -> Vec<std::ffi::OsString> {
    use std::os::unix::ffi::OsStringExt;

    split_command_line(parameters.as_bytes())
        .into_iter()
        .map(std::ffi::OsString::from_vec)
        .collect()
}

/// Splits a raw command line into arguments the way the Microsoft C runtime
/// does, so the same trailer parameters reach the passenger as the same argv
/// on every platform.
///
/// Spaces and tabs separate arguments outside quotes. `2n` backslashes
/// before a `"` become `n` backslashes and the quote toggles quoting;
/// `2n + 1` backslashes become `n` backslashes and a literal `"`. Inside
/// quotes, `""` is a literal quote. Other backslashes are literal, and all
/// other bytes pass through untouched.
pub fn split_command_line(line: &[u8]) -> Vec<Vec<u8>> {
    let mut args = Vec::new();
    let mut current = Vec::new();
    let mut in_arg = false;
    let mut quoted = false;
    let mut bytes = line.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        match b {
            b'\\' => {
                let mut slashes = 1;
                while bytes.peek() == Some(&b'\\') {
                    bytes.next();
                    slashes += 1;
                }
                in_arg = true;
                if bytes.peek() == Some(&b'"') {
                    current.extend(std::iter::repeat_n(b'\\', slashes / 2));
                    if slashes % 2 == 1 {
                        bytes.next();
                        current.push(b'"');
                    }
                } else {
                    current.extend(std::iter::repeat_n(b'\\', slashes));
                }
            }
            b'"' => {
                in_arg = true;
                if quoted && bytes.peek() == Some(&b'"') {
                    bytes.next();
                    current.push(b'"');
                } else {
                    quoted = !quoted;
                }
            }
            b' ' | b'\t' if !quoted => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            b => {
                in_arg = true;
                current.push(b);
            }
        }
    }
    if in_arg {
        args.push(current);
    }
    args
}

/// The strategy this build launches with.
#[cfg(feature = "shell-open")]
pub type DefaultStrategy = ShellOpen;

/// The strategy this build launches with.
#[cfg(not(feature = "shell-open"))]
pub type DefaultStrategy = DirectCreate;
