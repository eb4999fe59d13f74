//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{KvdbError, Result};

use super::entry::HEADER_SIZE;
use super::WalEntry;

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// File size at open; no entry may extend past it
    file_len: u64,

    /// Offset just past the last entry read successfully
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            file_len,
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A torn header, torn body or
    /// checksum mismatch is reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(KvdbError::WalCorruption(format!(
                    "partial header at offset {} ({} of {} bytes)",
                    self.position, n, HEADER_SIZE
                )))
            }
            _ => {}
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&header[0..8]);
        let lsn = u64::from_be_bytes(lsn);
        let crc = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let len = u32::from_be_bytes([header[12], header[13], header[14], header[15]]) as usize;

        let remaining = self
            .file_len
            .saturating_sub(self.position + HEADER_SIZE as u64);
        if len as u64 > remaining {
            return Err(KvdbError::WalCorruption(format!(
                "entry at offset {} claims {} bytes, only {} remain",
                self.position, len, remaining
            )));
        }

        let mut data = vec![0u8; len];
        let read = read_full(&mut self.reader, &mut data)?;
        if read < len {
            return Err(KvdbError::WalCorruption(format!(
                "partial entry at offset {} ({} of {} bytes)",
                self.position, read, len
            )));
        }

        let entry = WalEntry::from_record_body(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + len) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last valid entry
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Like `read_exact`, but reports how many bytes were available at EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
