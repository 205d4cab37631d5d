//! The stream-oriented PNG codec engine.
//!
//! The engine never touches a frame or a picture directly. It sees the
//! compressed side of the world through two one-method interfaces the
//! adapters implement — [`ByteSource`] to pull bytes on decode and
//! [`ChunkSink`] to push chunks on encode — and it sees the raster side
//! only as the row tables handed to its transfer operations. Both halves
//! run synchronously on the caller's thread: the pulls and pushes nest
//! inside the single adapter call driving the engine, and every failure
//! travels back out through `Result`.
//!
//! ## Decoding
//! A decode runs through [`ScanlineReader`] in four stages:
//!
//! 1. `read_header` — verify the signature, parse the header chunk, and
//!    scan forward to the image data, retaining the palette and
//!    transparency chunks along the way.
//! 2. `apply_transform`, once per step the negotiation picked. The steps
//!    are ordered: expansions that change the channel count come before
//!    depth stripping, which comes before alpha synthesis and the byte
//!    order swap (see [`TransformSet`]).
//! 3. `read_image` — gather the image-data run, inflate it, reconstruct
//!    the scanline filters, and normalize every scanline straight into
//!    the caller's row table.
//! 4. `read_end` — drain the stream through the end marker, so a
//!    truncated tail still fails the call.
//!
//! ## Encoding
//! An encode runs through [`ScanlineWriter`]: header, image, end marker.
//! The encode side always stores 8-bit RGB with no interlacing; anything
//! fancier is a decode-only concern.

mod chunks;
pub use chunks::*;

mod transform;
pub use transform::{Transform, TransformSet};

mod reader;
pub use reader::ScanlineReader;

mod writer;
pub use writer::{EncodeParams, ScanlineWriter};

mod crc32;
mod unfilter;

use crate::PipeError;

/// Supplies compressed bytes to the decode engine.
///
/// A source is lent to the engine for the duration of one decode call;
/// there is no persistent registration.
pub trait ByteSource {
  /// Fills `dst` from the stream, advancing past the copied bytes.
  ///
  /// A source that runs short must still write all of `dst` (zero-filling
  /// the missing tail) and return [`PipeError::StreamUnderflow`].
  fn pull(&mut self, dst: &mut [u8]) -> Result<(), PipeError>;
}

/// Receives encoded output units from the encode engine.
///
/// Push order is emission order, and the stream's chunk order is
/// meaningful, so a sink must preserve it.
pub trait ChunkSink {
  /// Accepts one output unit: the stream signature or one whole chunk.
  fn push(&mut self, bytes: &[u8]) -> Result<(), PipeError>;
}
