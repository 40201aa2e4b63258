//! Outbound frame sinks.
//!
//! Submissions are fire-and-forget: a transport never reports failure back to
//! the player, it logs and moves on.

use std::{cell::RefCell, io::Write, rc::Rc};

/// Destination for encoded [`crate::AnimationView`] bytes.
pub trait Transport {
    fn send_frame(&mut self, bytes: &[u8]);
    /// Signals that the current source has finished.
    fn end_stream(&mut self);
}

/// Record marker preceding an encoded frame.
pub const FRAME_RECORD: u8 = 0x01;
/// Record marker for an end-of-stream signal. Carries no payload.
pub const END_RECORD: u8 = 0x02;

/// Writes length-prefixed records to any [`Write`] sink.
///
/// Each frame is `[FRAME_RECORD, len as u32 little-endian, bytes...]`, each
/// end signal a lone `[END_RECORD, 0, 0, 0, 0]`.
#[derive(Debug)]
pub struct WriterTransport<W: Write> {
    writer: W,
    frames_written: u64,
    failures: u64,
}

impl<W: Write> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
            failures: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, marker: u8, payload: &[u8]) -> std::io::Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "frame too large for record")
        })?;
        self.writer.write_all(&[marker])?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(payload)?;
        self.writer.flush()
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn send_frame(&mut self, bytes: &[u8]) {
        match self.write_record(FRAME_RECORD, bytes) {
            Ok(()) => self.frames_written += 1,
            Err(err) => {
                self.failures += 1;
                tracing::warn!(error = %err, len = bytes.len(), "dropping frame");
            }
        }
    }

    fn end_stream(&mut self) {
        if let Err(err) = self.write_record(END_RECORD, &[]) {
            self.failures += 1;
            tracing::warn!(error = %err, "failed to signal end of stream");
        }
    }
}

/// What a [`MemoryTransport`] has received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Frame(Vec<u8>),
    EndOfStream,
}

/// Keeps every submission in memory. Clones share the same log, so a test can
/// hold one handle while the player owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    log: Rc<RefCell<Vec<Submission>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.log.borrow().clone()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.log
            .borrow()
            .iter()
            .filter_map(|submission| match submission {
                Submission::Frame(bytes) => Some(bytes.clone()),
                Submission::EndOfStream => None,
            })
            .collect()
    }

    pub fn end_signals(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|submission| **submission == Submission::EndOfStream)
            .count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl Transport for MemoryTransport {
    fn send_frame(&mut self, bytes: &[u8]) {
        self.log.borrow_mut().push(Submission::Frame(bytes.to_vec()));
    }

    fn end_stream(&mut self) {
        self.log.borrow_mut().push(Submission::EndOfStream);
    }
}
