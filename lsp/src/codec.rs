//! Line-delimited JSON codec for the IDE daemon socket.
//!
//! `purs ide server` reads one JSON request per line and answers with one
//! JSON response per line. [`LineReader`] and [`LineWriter`] provide the
//! async halves of that exchange.

use anyhow::{Context, Result, bail};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

/// Maximum line size (16 MiB). Completion lists for large projects are big.
const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Reads newline-terminated JSON values from an async reader.
pub struct LineReader<R> {
    reader: BufReader<R>,
    max_line_bytes: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_LINE_BYTES)
    }

    fn with_limit(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_line_bytes,
        }
    }

    /// Read the next JSON line.
    ///
    /// Returns `Ok(None)` on EOF before any byte was read.
    /// Blank lines are skipped. A final line without a trailing newline is accepted.
    /// At most `max_line_bytes + 1` bytes of a line are buffered.
    pub async fn read_value(&mut self) -> Result<Option<serde_json::Value>> {
        let limit = self.max_line_bytes as u64 + 1;
        let mut line = Vec::new();
        loop {
            line.clear();
            let bytes_read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut line)
                .await
                .context("reading response line")?;

            if bytes_read == 0 {
                return Ok(None);
            }
            if line.len() > self.max_line_bytes {
                bail!("response line exceeds maximum {} bytes", self.max_line_bytes);
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                break;
            }
        }

        let value = serde_json::from_slice(&line).context("parsing JSON response")?;
        Ok(Some(value))
    }
}

/// Writes JSON values as single lines.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one JSON value followed by `\n`.
    ///
    /// `serde_json` never emits raw newlines inside a compact value, so the
    /// line boundary is unambiguous.
    pub async fn write_value<T: serde::Serialize>(&mut self, msg: &T) -> Result<()> {
        let mut body = serde_json::to_string(msg).context("serializing request")?;
        body.push('\n');

        self.writer
            .write_all(body.as_bytes())
            .await
            .context("writing request line")?;
        self.writer.flush().await.context("flushing request")?;

        Ok(())
    }
}
