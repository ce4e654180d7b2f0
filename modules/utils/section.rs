//! Writing and locating the embedded bundle section.
//!
//! PE resources and Mach-O sections live inside the image, so the parameter
//! trailer appended after them does not get in the way. On ELF, libsui
//! appends the section and closes the file with its own 16-byte footer
//! (magic, name hash, distance back to the section start), all little
//! endian, which the parameter trailer then buries. [`appended_section`]
//! reads that footer in front of the parameter trailer.
//!
//! ```text
//! [ stub ][ section ][ magic | hash | offset ][ parameter trailer ]
//!                    '------- 16 bytes ------'
//! ```

use crate::trailer;
use std::io;

const ELF_FOOTER_MAGIC: u32 = 0x501e;
const ELF_FOOTER_LEN: usize = 16;

/// Embeds `bundle` into a copy of `stub` for the host's executable format.
///
/// # Errors
/// Returns libsui's error if `stub` is not a valid executable
pub fn embed(stub: &[u8], name: &str, bundle: Vec<u8>) -> Result<Vec<u8>, libsui::Error> {
    let mut out = Vec::with_capacity(stub.len() + bundle.len());

    #[cfg(windows)]
    {
        use libsui::PortableExecutable;
        PortableExecutable::from(stub)?
            .write_resource(name, bundle)?
            .build(&mut out)?;
    }

    #[cfg(target_vendor = "apple")]
    {
        use libsui::Macho;
        Macho::from(stub.to_vec())?
            .write_section(name, bundle)?
            .build(&mut out)?;
    }

    #[cfg(not(any(windows, target_vendor = "apple")))]
    {
        use libsui::Elf;
        Elf::new(stub).append(name, &bundle, &mut out)?;
    }

    Ok(out)
}

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("cannot embed the payload section: {0}")]
    Embed(#[from] libsui::Error),
    #[error("cannot reserve parameter space: {0}")]
    Reserve(#[from] io::Error),
}

/// Builds a runnable launcher: `stub` with `bundle` embedded under `name`,
/// followed by `space` bytes of parameter space.
///
/// # Errors
/// Returns an error if embedding fails or `space` does not fit the trailer
pub fn assemble(
    stub: &[u8],
    name: &str,
    bundle: Vec<u8>,
    space: u32,
) -> Result<Vec<u8>, AssembleError> {
    let mut launcher = embed(stub, name, bundle)?;
    trailer::reserve(&mut launcher, space)?;
    Ok(launcher)
}

// Must match the name hash libsui writes into the ELF footer.
fn name_hash(name: &str) -> u32 {
    name.bytes()
        .fold(0u32, |hash, b| hash.wrapping_add(u32::from(b)))
}

/// Finds the section `name` that libsui appended to an ELF launcher,
/// skipping the parameter trailer if `launcher` carries one.
pub fn appended_section<'a>(launcher: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let body = trailer::strip(launcher);
    let footer_start = body.len().checked_sub(ELF_FOOTER_LEN)?;
    let footer = &body[footer_start..];

    let magic = u32::from_le_bytes(footer[0..4].try_into().ok()?);
    let hash = u32::from_le_bytes(footer[4..8].try_into().ok()?);
    if magic != ELF_FOOTER_MAGIC || hash != name_hash(name) {
        return None;
    }

    let offset = u64::from_le_bytes(footer[8..16].try_into().ok()?);
    let offset = usize::try_from(offset).ok()?;
    if offset < ELF_FOOTER_LEN {
        return None;
    }
    let start = body.len().checked_sub(offset)?;
    Some(&body[start..footer_start])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use crate::trailer::{reserve, stamp};

    fn appended(stub: &[u8], name: &str, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        libsui::Elf::new(stub).append(name, data, &mut out).unwrap();
        out
    }

    #[test]
    fn test_section_found_behind_parameter_trailer() {
        let mut launcher = appended(b"\x7fELF stub", "c4rry0n", b"bundle bytes");
        assert_eq!(appended_section(&launcher, "c4rry0n").unwrap(), b"bundle bytes");

        reserve(&mut launcher, 64).unwrap();
        assert_eq!(appended_section(&launcher, "c4rry0n").unwrap(), b"bundle bytes");

        let stamped = stamp(&launcher, b"--silent").unwrap();
        assert_eq!(appended_section(&stamped, "c4rry0n").unwrap(), b"bundle bytes");
    }

    #[test]
    #[cfg(not(any(windows, target_vendor = "apple")))]
    fn test_assembled_launcher_round_trip() {
        let launcher = assemble(b"\x7fELF stub", "c4rry0n", b"bundle".to_vec(), 32).unwrap();
        assert_eq!(trailer::Directory::parse(&launcher).unwrap().available(), 32);
        assert_eq!(appended_section(&launcher, "c4rry0n").unwrap(), b"bundle");
    }

    #[test]
    fn test_section_name_must_match() {
        let launcher = appended(b"\x7fELF stub", "c4rry0n", b"bundle bytes");
        assert!(appended_section(&launcher, "other").is_none());
    }

    #[test]
    fn test_no_footer() {
        assert!(appended_section(b"plain executable without sections", "c4rry0n").is_none());
        assert!(appended_section(b"short", "c4rry0n").is_none());

        let mut forged = b"body".to_vec();
        forged.extend_from_slice(&ELF_FOOTER_MAGIC.to_le_bytes());
        forged.extend_from_slice(&name_hash("c4rry0n").to_le_bytes());
        forged.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(appended_section(&forged, "c4rry0n").is_none());
    }
}
