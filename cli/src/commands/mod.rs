pub mod inspect;
pub mod pack;
pub mod stamp;

use std::fs;
use std::path::Path;

/// Writes a launcher and marks it executable.
pub(crate) fn write_launcher(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}
