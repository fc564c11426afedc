//! Streamed file I/O over READ, WRITE and COMMIT.
use crate::{
    nfs3::{
        procs::{NfsResult as _, StableHow},
        NfsClient, NfsFh3, Verifier3,
    },
    result::{Error, NfsStat3, Result},
};
use bytes::{Buf, BytesMut};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Sequential writer returned by [`Target::open_file`](crate::nfs3::Target::open_file).
///
/// Data is buffered up to the transfer size and sent as UNSTABLE writes.
/// Nothing is durable until [`FileWriter::close`] returns: it sends what is
/// still buffered, then COMMITs, and checks that the server did not lose
/// unstable data in between (its write verifier must not change).
/// Dropping a writer without closing it discards the buffered data.
pub struct FileWriter {
    client: Arc<NfsClient>,
    fh: NfsFh3,
    /// File offset of the first buffered byte
    offset: u64,
    buf: BytesMut,
    chunk_size: usize,
    /// Verifier of the first WRITE reply
    verifier: Option<Verifier3>,
}

impl FileWriter {
    pub(crate) fn new(client: Arc<NfsClient>, fh: NfsFh3, chunk_size: usize) -> FileWriter {
        FileWriter {
            client,
            fh,
            offset: 0,
            buf: BytesMut::with_capacity(chunk_size),
            chunk_size: chunk_size.max(1),
            verifier: None,
        }
    }

    pub fn handle(&self) -> &NfsFh3 {
        &self.fh
    }

    /// Bytes accepted so far, whether sent or still buffered
    pub fn position(&self) -> u64 {
        self.offset + self.buf.len() as u64
    }

    /// Buffers all of `data`, sending every full chunk
    pub async fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let room = self.chunk_size - self.buf.len();
            let n = room.min(data.len());
            self.buf.extend_from_slice(&data[..n]);
            data = &data[n..];

            if self.buf.len() == self.chunk_size {
                self.send_buffered().await?;
            }
        }

        Ok(())
    }

    /// Sends everything buffered as UNSTABLE writes
    pub async fn flush(&mut self) -> Result<()> {
        self.send_buffered().await
    }

    /// Remembers the verifier of the first write and checks every later one
    /// against it
    fn check_verifier(&mut self, verifier: Verifier3) -> Result<()> {
        match self.verifier {
            None => {
                self.verifier = Some(verifier);
                Ok(())
            }
            Some(expected) if expected == verifier => Ok(()),
            Some(expected) => {
                warn!(
                    "write verifier changed from {:#x} to {:#x}",
                    expected, verifier
                );
                Err(Error::VerifierMismatch)
            }
        }
    }

    async fn send_buffered(&mut self) -> Result<()> {
        while !self.buf.is_empty() {
            let data = self.buf.split().freeze();
            let res = self
                .client
                .call_write(&self.fh, self.offset, StableHow::Unstable, data.clone())
                .await?
                .into_nfs_result()?;
            self.check_verifier(res.verifier)?;

            let written = (res.count as usize).min(data.len());
            trace!("write at {}: {} of {} bytes", self.offset, written, data.len());
            if written == 0 {
                warn!("server accepted no data at offset {}", self.offset);
                return Err(NfsStat3::Io.into());
            }

            self.offset += written as u64;
            if written < data.len() {
                // short write, resend the rest from the acknowledged offset
                let mut rest = data;
                rest.advance(written);
                self.buf.extend_from_slice(&rest);
            }
        }

        Ok(())
    }

    /// Sends all buffered data and commits the file.  On success every byte
    /// written is on stable storage at the server.
    pub async fn close(mut self) -> Result<()> {
        self.send_buffered().await?;

        let res = self
            .client
            .call_commit(&self.fh, 0, 0)
            .await?
            .into_nfs_result()?;
        if self.verifier.is_some() {
            self.check_verifier(res.verifier)?;
        }

        debug!("committed {} bytes to {:02x?}", self.offset, self.fh.data);
        Ok(())
    }
}

/// Sequential reader returned by [`Target::open`](crate::nfs3::Target::open)
pub struct FileReader {
    client: Arc<NfsClient>,
    fh: NfsFh3,
    offset: u64,
    chunk_size: u32,
    eof: bool,
}

impl FileReader {
    pub(crate) fn new(client: Arc<NfsClient>, fh: NfsFh3, chunk_size: u32) -> FileReader {
        FileReader {
            client,
            fh,
            offset: 0,
            chunk_size: chunk_size.max(1),
            eof: false,
        }
    }

    pub fn handle(&self) -> &NfsFh3 {
        &self.fh
    }

    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Reads up to `buf.len()` bytes with a single READ.  Returns 0 once the
    /// server reported end of file.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.eof || buf.is_empty() {
            return Ok(0);
        }

        let count = (buf.len() as u64).min(self.chunk_size as u64) as u32;
        let data = self.read_chunk(count).await?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    /// Reads until end of file, appending to `out`.  Returns the number of
    /// bytes appended.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let start = out.len();
        while !self.eof {
            let data = self.read_chunk(self.chunk_size).await?;
            out.extend_from_slice(&data);
        }

        Ok(out.len() - start)
    }

    async fn read_chunk(&mut self, count: u32) -> Result<bytes::Bytes> {
        let res = self
            .client
            .call_read(&self.fh, self.offset, count)
            .await?
            .into_nfs_result()?;

        let mut data = res.data;
        if data.len() > count as usize {
            warn!("server returned {} bytes for a {} byte read", data.len(), count);
            data.truncate(count as usize);
        }
        trace!("read at {}: {} bytes, eof {}", self.offset, data.len(), res.eof);

        self.offset += data.len() as u64;
        // an empty non-eof reply would never make progress
        self.eof = res.eof || data.is_empty();
        Ok(data)
    }
}
