use std::io::{self, BufRead, Write};

use log::trace;
use serde::Serialize;
use thiserror::Error;

use super::{Ack, Event, Request};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode or decode message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Line-delimited JSON over a pair of pipes.
///
/// Every message written is a single line and is flushed right away; git-lfs
/// reads progress while a transfer is still running.
pub struct ProtocolTransport<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    line: String,
}

impl<R: BufRead, W: Write> ProtocolTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }

    /// Reads the next request. `None` once the input is closed.
    pub fn read_request(&mut self) -> Result<Option<Request>, TransportError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            trace!("<- {line}");
            return Request::try_from(line).map(Some);
        }
    }

    pub fn write_ack(&mut self) -> Result<(), TransportError> {
        self.write_line(&Ack {})
    }

    pub fn write_event(&mut self, event: &Event) -> Result<(), TransportError> {
        self.write_line(event)
    }

    fn write_line<T: Serialize>(&mut self, message: &T) -> Result<(), TransportError> {
        let encoded = serde_json::to_string(message)?;
        trace!("-> {encoded}");

        self.writer.write_all(encoded.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
