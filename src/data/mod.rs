/// Shared winnow helpers for fixed-width and null-terminated fields
pub mod parser_utils;
/// Little-endian byte cursor used by both model decoders
pub mod reader;

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

/// Raw bytes of an asset file, either memory-mapped or owned.
#[derive(Debug)]
pub enum FileData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl FileData {
    /// Memory-map the file at `path`.
    ///
    /// Empty files cannot be mapped on every platform, so they come back as an
    /// empty owned buffer.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(FileData::Owned(Vec::new()));
        }
        // Safety: the mapping is read-only and the decoders never hold on to it
        // past the lifetime of this value.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(FileData::Mapped(mmap))
    }
}

impl From<Vec<u8>> for FileData {
    fn from(data: Vec<u8>) -> Self {
        FileData::Owned(data)
    }
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mapped(mmap) => mmap,
            FileData::Owned(data) => data,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn owned_data_derefs_to_bytes() {
        let data = FileData::from(vec![1u8, 2, 3]);
        assert_eq!(&data[..], &[1, 2, 3]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FileData::open("/definitely/not/a/real/model.3ds").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
