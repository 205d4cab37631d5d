#![forbid(unsafe_code)]

//! The encode adapter: picture buffer in, compressed frame out.

use alloc::vec::Vec;

use crate::engine::{ChunkSink, EncodeParams, ScanlineWriter};
use crate::picture::{Picture, PixelLayout};
use crate::{CompressedFrame, PipeError};

/// One output unit copied out of the encode engine, stamped with the
/// source picture's timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
  pub data: Vec<u8>,
  pub timestamp: i64,
}

/// Accumulates engine output in emission order until it's gathered into
/// one frame.
///
/// Chunk order in the stream is meaningful on decode, so the list is
/// strictly append-only and the gather concatenates in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkList {
  chunks: Vec<OutputChunk>,
  timestamp: i64,
}

impl ChunkList {
  /// An empty list whose future chunks all carry `timestamp`.
  #[inline]
  #[must_use]
  pub const fn new(timestamp: i64) -> Self {
    Self { chunks: Vec::new(), timestamp }
  }

  /// How many chunks have been pushed so far.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.chunks.len()
  }

  /// Has nothing been pushed?
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }

  /// Concatenates every chunk, in order, into one compressed frame, and
  /// empties the list.
  ///
  /// Gathering an empty list gives `None`: a complete stream always has
  /// at least a signature, a header, image data, and an end marker, so an
  /// empty list means the engine never ran.
  pub fn gather(&mut self) -> Option<CompressedFrame> {
    if self.chunks.is_empty() {
      return None;
    }
    let total: usize = self.chunks.iter().map(|c| c.data.len()).sum();
    let mut data = Vec::with_capacity(total);
    for chunk in self.chunks.drain(..) {
      data.extend_from_slice(&chunk.data);
    }
    Some(CompressedFrame::new(data, self.timestamp))
  }
}

impl ChunkSink for ChunkList {
  fn push(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
    let mut data = Vec::new();
    data.try_reserve(bytes.len())?;
    data.extend_from_slice(bytes);
    self.chunks.push(OutputChunk { data, timestamp: self.timestamp });
    Ok(())
  }
}

/// Encodes picture buffers into whole compressed frames.
///
/// Stateless between calls: every call builds its own chunk list, engine
/// writer, and row table, and leaves nothing behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder;

impl FrameEncoder {
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self
  }

  /// Encodes one picture into one complete compressed frame.
  ///
  /// Only [`Rgb24`](PixelLayout::Rgb24) input is accepted; the encode
  /// side never attempts alpha, palette, or deep output. A decode of the
  /// result restores the exact stored bytes: the trip is lossless.
  pub fn encode_frame(&self, picture: &Picture) -> Result<CompressedFrame, PipeError> {
    if picture.layout() != PixelLayout::Rgb24 {
      return Err(PipeError::Encode("encoder input must be a 24-bit picture"));
    }
    let mut chunks = ChunkList::new(picture.timestamp());
    let mut writer = ScanlineWriter::new(&mut chunks);
    writer.write_header(&EncodeParams { width: picture.width(), height: picture.height() })?;
    let rows: Vec<&[u8]> = picture.rows().collect();
    writer.write_image(&rows)?;
    writer.finish()?;
    chunks.gather().ok_or(PipeError::Encode("engine produced no output chunks"))
  }
}
