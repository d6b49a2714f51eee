//! Framing codec for the worker channel.
//!
//! The channel speaks `Content-Length: N\r\n\r\n{json}` framed JSON-RPC
//! over the worker's stdio. [`FrameReader`] and [`FrameWriter`] handle the
//! two directions independently so that reading and writing can live on
//! separate tasks.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Upper bound on a single frame. Whole-document sync means a frame can
/// carry an entire RTL source file, so the cap is generous.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Parse one header line into its `Content-Length` value, if it is one.
///
/// Header names are matched case-insensitively; unknown headers (e.g.
/// `Content-Type`) yield `None` and are skipped by the caller.
fn content_length_of(line: &str) -> Result<Option<usize>> {
    let Some((name, value)) = line.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("Content-Length") {
        return Ok(None);
    }
    let len = value
        .trim()
        .parse::<usize>()
        .context("invalid Content-Length value")?;
    Ok(Some(len))
}

/// Reads framed JSON-RPC messages from the worker's output stream.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next frame.
    ///
    /// `Ok(None)` means the stream ended cleanly on a frame boundary.
    /// Malformed headers, oversized frames, and EOF inside a frame are
    /// errors.
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>> {
        let Some(len) = self.read_headers().await? else {
            return Ok(None);
        };

        if len > MAX_FRAME_BYTES {
            bail!("frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit");
        }

        let mut body = vec![0u8; len];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading frame body")?;

        serde_json::from_slice(&body)
            .context("parsing frame body")
            .map(Some)
    }

    /// Consume header lines up to the blank separator.
    ///
    /// Returns the announced body length, or `None` on EOF before any
    /// header byte was read.
    async fn read_headers(&mut self) -> Result<Option<usize>> {
        let mut length = None;
        let mut saw_header = false;
        let mut line = String::new();

        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .context("reading frame header")?;

            if read == 0 {
                // EOF between frames is a clean shutdown; EOF after a
                // partial header block is not.
                if saw_header {
                    bail!("stream ended inside a frame header");
                }
                return Ok(None);
            }
            saw_header = true;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some(len) = content_length_of(trimmed)? {
                length = Some(len);
            }
        }

        match length {
            Some(len) => Ok(Some(len)),
            None => bail!("frame header missing Content-Length"),
        }
    }
}

/// Writes framed JSON-RPC messages to the worker's input stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `msg` and write it as one frame.
    pub async fn write_frame<T: serde::Serialize>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing frame body")?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing frame header")?;
        self.writer
            .write_all(&body)
            .await
            .context("writing frame body")?;
        self.writer.flush().await.context("flushing frame")?;

        Ok(())
    }
}
