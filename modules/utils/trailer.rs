//! Parameter trailer layout.
//!
//! The last twelve bytes of a launcher file form a directory of three native
//! endian `u32` fields, in file order: signature, parameter size, and the
//! distance from end-of-file back to the first parameter byte. The parameter
//! bytes (plus zero padding up to the reserved space) sit right before the
//! directory.
//!
//! ```text
//! [ launcher ][ params | padding ][ signature ][ size ][ offset ]
//!                                 '----------- 12 bytes ---------'
//! ```

use std::io::{self, Write};

/// Marks a launcher that has parameter space reserved
pub const TRAILER_MAGIC: u32 = 0x4200_0042;

/// Size of the signature/size/offset directory
pub const DIRECTORY_LEN: u32 = 12;

/// Parameter space reserved by the packer when none is requested
pub const DEFAULT_RESERVED_SPACE: u32 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum TrailerError {
    #[error("source does not have parameter space allocated")]
    NotReserved,
    #[error("parameter string is too long ({len} bytes); max length is {available}")]
    TooLong { len: usize, available: u32 },
    #[error("reserved parameter space of {0} bytes does not fit the trailer format")]
    SpaceTooLarge(u32),
}

/// Decoded trailer directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directory {
    pub size: u32,
    pub offset: u32,
}

impl Directory {
    /// Parses the trailing twelve bytes of `file`. Returns `None` when the
    /// signature is missing or the fields point outside the file.
    pub fn parse(file: &[u8]) -> Option<Self> {
        let len = file.len();
        let tail = file.get(len.checked_sub(DIRECTORY_LEN as usize)?..)?;
        let field = |i: usize| -> Option<u32> {
            let bytes: [u8; 4] = tail.get(i * 4..i * 4 + 4)?.try_into().ok()?;
            Some(u32::from_ne_bytes(bytes))
        };
        if field(0)? != TRAILER_MAGIC {
            return None;
        }
        let directory = Self {
            size: field(1)?,
            offset: field(2)?,
        };
        locate(len as u64, directory.size, directory.offset)?;
        Some(directory)
    }

    /// Bytes available for parameters in the reserved space
    pub fn available(&self) -> u32 {
        self.offset.saturating_sub(DIRECTORY_LEN)
    }

    pub fn to_bytes(&self) -> [u8; DIRECTORY_LEN as usize] {
        let mut out = [0u8; DIRECTORY_LEN as usize];
        out[0..4].copy_from_slice(&TRAILER_MAGIC.to_ne_bytes());
        out[4..8].copy_from_slice(&self.size.to_ne_bytes());
        out[8..12].copy_from_slice(&self.offset.to_ne_bytes());
        out
    }
}

/// Bounds check shared by the reader and the packer.
///
/// Returns the absolute start of the parameter bytes when `size` bytes at
/// `end - offset` fit in a file of `file_len` bytes and end before the
/// directory.
pub fn locate(file_len: u64, size: u32, offset: u32) -> Option<u64> {
    if offset < DIRECTORY_LEN || u64::from(offset) > file_len {
        return None;
    }
    if size > offset - DIRECTORY_LEN {
        return None;
    }
    Some(file_len - u64::from(offset))
}

/// The part of `file` in front of its parameter trailer, or all of `file`
/// when it has none.
pub fn strip(file: &[u8]) -> &[u8] {
    match Directory::parse(file) {
        Some(directory) => &file[..file.len() - directory.offset as usize],
        None => file,
    }
}

/// Appends `space` bytes of empty parameter space followed by the directory.
///
/// # Errors
/// Returns an error if `space` overflows the offset field or the write fails
pub fn reserve<W: Write>(writer: &mut W, space: u32) -> io::Result<()> {
    let offset = space
        .checked_add(DIRECTORY_LEN)
        .ok_or_else(|| io::Error::other(TrailerError::SpaceTooLarge(space)))?;
    writer.write_all(&vec![0u8; space as usize])?;
    writer.write_all(&Directory { size: 0, offset }.to_bytes())?;
    Ok(())
}

/// Writes `params` into the space reserved at the end of `source`.
///
/// The reserved space keeps its size, so a stamped file can be stamped again.
///
/// # Errors
/// Returns an error if `source` has no reserved trailer or `params` does not fit
pub fn stamp(source: &[u8], params: &[u8]) -> Result<Vec<u8>, TrailerError> {
    let directory = Directory::parse(source).ok_or(TrailerError::NotReserved)?;
    let available = directory.available();
    if params.len() > available as usize {
        return Err(TrailerError::TooLong {
            len: params.len(),
            available,
        });
    }

    let body = source.len() - directory.offset as usize;
    let mut out = Vec::with_capacity(source.len());
    out.extend_from_slice(&source[..body]);
    out.extend_from_slice(params);
    out.resize(body + available as usize, 0);
    out.extend_from_slice(
        &Directory {
            size: params.len() as u32,
            offset: directory.offset,
        }
        .to_bytes(),
    );
    Ok(out)
}
