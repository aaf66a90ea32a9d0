//! Dump file records
//!
//! Reading and writing the length-prefixed records of a queue dump.

use std::io::{self, Read, Write};

use crate::error::{LineQueueError, Result};

/// Size of the big-endian length prefix in front of every record
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Writes records to a dump
pub struct DumpWriter<W: Write> {
    inner: W,
    records: u64,
}

impl<W: Write> DumpWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0 }
    }

    /// Append one record: length prefix followed by the raw bytes
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        let len = u32::try_from(record.len()).map_err(|_| {
            LineQueueError::InvalidArgument(format!(
                "record of {} bytes does not fit a dump length prefix",
                record.len()
            ))
        })?;

        self.inner.write_all(&len.to_be_bytes())?;
        self.inner.write_all(record)?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flush buffered bytes and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads records back from a dump, in file order
pub struct DumpReader<R: Read> {
    inner: R,
}

impl<R: Read> DumpReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at a clean end of file and `DumpCorrupted` when the
    /// file ends inside a length prefix or a record body.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let read = read_full(&mut self.inner, &mut prefix)?;
        if read == 0 {
            return Ok(None);
        }
        if read < LENGTH_PREFIX_SIZE {
            return Err(LineQueueError::DumpCorrupted {
                expected: LENGTH_PREFIX_SIZE,
                read,
            });
        }

        let len = u32::from_be_bytes(prefix) as usize;
        let mut record = vec![0u8; len];
        let read = read_full(&mut self.inner, &mut record)?;
        if read < len {
            return Err(LineQueueError::DumpCorrupted { expected: len, read });
        }

        Ok(Some(record))
    }
}

impl<R: Read> Iterator for DumpReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Fill `buf` as far as the reader allows, returning how many bytes were read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
