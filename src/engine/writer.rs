//! The push-driven encode half of the engine.

use alloc::vec::Vec;

use super::chunks::{MAX_DIMENSION, PNG_SIGNATURE};
use super::crc32::chunk_crc;
use super::ChunkSink;
use crate::PipeError;

/// Compression level handed to the deflate pass. Middle of the range,
/// the conventional default.
const DEFLATE_LEVEL: u8 = 6;

/// Image-data payloads are split so no emitted chunk exceeds this.
const MAX_IDAT_PAYLOAD: usize = 32 * 1024;

/// What the encode side lets a caller choose: the dimensions.
///
/// Everything else is pinned: 8 bits per channel, RGB color type, no
/// interlacing, compression and filter method zero. The encode side is
/// intentionally much narrower than the decode side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
  pub width: u32,
  pub height: u32,
}

/// Encodes one image into a chunk sink, stage by stage.
///
/// The stages must run in order: [`write_header`](Self::write_header),
/// [`write_image`](Self::write_image), [`finish`](Self::finish). Each
/// emitted unit (signature, then one chunk per push) reaches the sink in
/// stream order, which the sink must preserve.
pub struct ScanlineWriter<'k, K: ChunkSink + ?Sized> {
  sink: &'k mut K,
  params: Option<EncodeParams>,
}

impl<'k, K: ChunkSink + ?Sized> ScanlineWriter<'k, K> {
  /// A writer over one frame's chunk sink.
  pub fn new(sink: &'k mut K) -> Self {
    Self { sink, params: None }
  }

  /// Pushes the signature and the header chunk.
  pub fn write_header(&mut self, params: &EncodeParams) -> Result<(), PipeError> {
    if params.width == 0 || params.height == 0 {
      return Err(PipeError::Encode("width or height is zero"));
    }
    if params.width > MAX_DIMENSION || params.height > MAX_DIMENSION {
      return Err(PipeError::Encode("image dimensions exceed the encode cap"));
    }
    self.sink.push(&PNG_SIGNATURE)?;
    let mut ihdr = [0_u8; 13];
    ihdr[0..4].copy_from_slice(&params.width.to_be_bytes());
    ihdr[4..8].copy_from_slice(&params.height.to_be_bytes());
    ihdr[8] = 8; // bit depth
    ihdr[9] = 2; // RGB color type
    // compression, filter, and interlace methods stay zero
    push_chunk(self.sink, *b"IHDR", &ihdr)?;
    self.params = Some(*params);
    Ok(())
  }

  /// Filters, compresses, and pushes the whole image as a run of
  /// image-data chunks.
  ///
  /// Each row must be exactly `width * 3` bytes in the pipeline's
  /// blue-first 24-bit layout. Samples are stored red-first, mirroring
  /// the byte-order swap the decode side applies, so a decode of the
  /// output restores the input rows exactly. Rows are stored with filter
  /// type zero.
  pub fn write_image(&mut self, rows: &[&[u8]]) -> Result<(), PipeError> {
    let params = self.params.ok_or(PipeError::Encode("image written before the header"))?;
    let row_bytes = params.width as usize * 3;
    if rows.len() != params.height as usize || rows.iter().any(|r| r.len() != row_bytes) {
      return Err(PipeError::Encode("row table does not match the header"));
    }
    let mut filterlines = Vec::new();
    filterlines.try_reserve((1 + row_bytes) * rows.len())?;
    for row in rows {
      filterlines.push(0); // filter type: none
      for px in row.chunks_exact(3) {
        filterlines.extend_from_slice(&[px[2], px[1], px[0]]);
      }
    }
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&filterlines, DEFLATE_LEVEL);
    for payload in compressed.chunks(MAX_IDAT_PAYLOAD) {
      push_chunk(self.sink, *b"IDAT", payload)?;
    }
    Ok(())
  }

  /// Pushes the end marker.
  pub fn finish(&mut self) -> Result<(), PipeError> {
    push_chunk(self.sink, *b"IEND", &[])
  }
}

/// Assembles one whole chunk (length, type, data, CRC) and pushes it as a
/// single unit.
fn push_chunk<K: ChunkSink + ?Sized>(
  sink: &mut K, chunk_ty: [u8; 4], data: &[u8],
) -> Result<(), PipeError> {
  let mut chunk = Vec::new();
  chunk.try_reserve(12 + data.len())?;
  chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
  chunk.extend_from_slice(&chunk_ty);
  chunk.extend_from_slice(data);
  chunk.extend_from_slice(&chunk_crc(chunk_ty, data).to_be_bytes());
  sink.push(&chunk)
}
