//! Files generated on the fly for upload scenarios

use std::path::PathBuf;

use tempfile::TempDir;

use okiedokie_harness::E2eResult;

/// Above the application's attachment size limit
pub const OVERSIZE_BYTES: usize = 11 * 1024 * 1024;

/// Small enough for any attachment field
pub const SMALL_BYTES: usize = 2 * 1024;

/// Scratch directory of upload files, removed on drop
pub struct UploadFiles {
    dir: TempDir,
}

impl UploadFiles {
    pub fn new() -> E2eResult<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("okiedokie-uploads").tempdir()?,
        })
    }

    /// Write `name` with roughly `size` bytes, starting with the magic bytes of its extension
    pub fn write(&self, name: &str, size: usize) -> E2eResult<PathBuf> {
        let mut data = header_for(name).to_vec();
        if data.len() < size {
            data.resize(size, b' ');
        }

        let path = self.dir.path().join(name);
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

fn header_for(name: &str) -> &'static [u8] {
    match name.rsplit('.').next() {
        Some("pdf") => b"%PDF-1.4\n",
        Some("png") => b"\x89PNG\r\n\x1a\n",
        Some("exe") => b"MZ",
        _ => b"",
    }
}
