//! The pull-driven decode half of the engine.

use alloc::vec::Vec;

use super::chunks::{
  parse_ihdr, parse_trns, pull_chunk, ChunkTyDisplay, Header, PngColorType, RawChunk, Transparency,
  PNG_SIGNATURE, RGB8,
};
use super::transform::{normalize_scanline, Transform, TransformSet};
use super::unfilter::reconstruct_in_place;
use super::ByteSource;
use crate::PipeError;

/// Decodes one image from a byte source, stage by stage.
///
/// The stages must run in order: [`read_header`](Self::read_header), any
/// number of [`apply_transform`](Self::apply_transform) calls,
/// [`read_image`](Self::read_image), [`read_end`](Self::read_end). The
/// reader borrows its source for the duration of one frame and holds no
/// state once dropped, so every decode call gets a fresh reader.
pub struct ScanlineReader<'s, S: ByteSource + ?Sized> {
  source: &'s mut S,
  header: Option<Header>,
  palette: Vec<RGB8>,
  transparency: Option<Transparency>,
  transforms: TransformSet,
  first_idat: Option<Vec<u8>>,
  trailing: Option<RawChunk>,
}

impl<'s, S: ByteSource + ?Sized> ScanlineReader<'s, S> {
  /// A reader over one frame's byte source.
  pub fn new(source: &'s mut S) -> Self {
    Self {
      source,
      header: None,
      palette: Vec::new(),
      transparency: None,
      transforms: TransformSet::default(),
      first_idat: None,
      trailing: None,
    }
  }

  /// Reads the signature and every chunk up to the image data, and
  /// returns the parsed header.
  ///
  /// The palette and transparency chunks are retained for the transfer
  /// stage; other ancillary chunks are skipped. The stream is left
  /// positioned with the first image-data chunk already buffered.
  pub fn read_header(&mut self) -> Result<Header, PipeError> {
    let mut signature = [0_u8; 8];
    self.source.pull(&mut signature)?;
    if signature != PNG_SIGNATURE {
      return Err(PipeError::Header("signature mismatch"));
    }
    let first = pull_chunk(self.source)?;
    if !first.is(b"IHDR") {
      return Err(PipeError::Header("first chunk is not the header"));
    }
    let mut header = parse_ihdr(&first.data)?;
    loop {
      let chunk = pull_chunk(self.source)?;
      match &chunk.chunk_ty {
        b"PLTE" => {
          if chunk.data.len() % 3 != 0 {
            return Err(PipeError::Header("palette length is not a multiple of three"));
          }
          self.palette = bytemuck::cast_slice::<u8, RGB8>(&chunk.data).to_vec();
        }
        b"tRNS" => self.transparency = parse_trns(header.color_type, &chunk.data),
        b"IDAT" => {
          self.first_idat = Some(chunk.data);
          break;
        }
        b"IEND" => return Err(PipeError::Header("stream ended before any image data")),
        ty => log::debug!("skipping chunk {} before the image data", ChunkTyDisplay(*ty)),
      }
    }
    if header.color_type == PngColorType::Index && self.palette.is_empty() {
      return Err(PipeError::Header("indexed color without a palette"));
    }
    header.has_transparency = self.transparency.is_some();
    self.header = Some(header);
    Ok(header)
  }

  /// Requests one normalization step for the transfer stage.
  ///
  /// Steps recorded here must resolve to an 8-bit RGB(A) layout for the
  /// header actually read, or [`read_image`](Self::read_image) will
  /// refuse to run.
  pub fn apply_transform(&mut self, transform: Transform) -> Result<(), PipeError> {
    if self.header.is_none() {
      return Err(PipeError::Decode("transforms requested before the header was read"));
    }
    self.transforms.insert(transform);
    Ok(())
  }

  /// Inflates, reconstructs, and normalizes the whole image into the
  /// caller's row table, one output row per table entry.
  ///
  /// ## Failure
  /// * The row table must have one row per header line, each exactly
  ///   `width * output_bytes_per_pixel` long.
  /// * Interlaced payloads are refused; the compressed stream must hold
  ///   exactly the bytes the header's scanline math calls for.
  pub fn read_image(&mut self, rows: &mut [&mut [u8]]) -> Result<(), PipeError> {
    let header = self.header.ok_or(PipeError::Decode("image read before the header"))?;
    if header.is_interlaced {
      return Err(PipeError::Decode("interlaced streams are not supported"));
    }
    if !self.transforms.normalizes(&header) {
      return Err(PipeError::Decode("transform set does not normalize this image"));
    }
    let out_bpp = self.transforms.output_bytes_per_pixel(header.color_type);
    let row_bytes = header.width as usize * out_bpp;
    if rows.len() != header.height as usize || rows.iter().any(|r| r.len() != row_bytes) {
      return Err(PipeError::Decode("row table does not match the negotiated layout"));
    }

    // gather the image-data chunk run
    let mut segments: Vec<Vec<u8>> = Vec::new();
    segments.push(self.first_idat.take().ok_or(PipeError::Decode("image data missing"))?);
    loop {
      let chunk = pull_chunk(self.source)?;
      if chunk.is(b"IDAT") {
        segments.push(chunk.data);
      } else {
        self.trailing = Some(chunk);
        break;
      }
    }

    // inflate to exactly the filterline requirement
    let needed = header.decompressed_len();
    let mut filtered = Vec::new();
    filtered.try_reserve(needed)?;
    filtered.resize(needed, 0);
    let inflated = miniz_oxide::inflate::decompress_slice_iter_to_slice(
      &mut filtered,
      segments.iter().map(Vec::as_slice),
      true,
      true,
    )
    .map_err(|_| PipeError::Decode("compressed image data is damaged or truncated"))?;
    if inflated != needed {
      return Err(PipeError::Decode("image data is shorter than the scanline requirement"));
    }

    let bytes_per_filterline = 1 + header.bytes_per_scanline();
    reconstruct_in_place(&mut filtered, bytes_per_filterline, header.filter_unit())?;

    for (y, dst) in rows.iter_mut().enumerate() {
      let start = y * bytes_per_filterline + 1;
      let line = &filtered[start..start + header.bytes_per_scanline()];
      normalize_scanline(
        &header,
        &self.palette,
        self.transparency.as_ref(),
        &self.transforms,
        line,
        dst,
      )?;
    }
    Ok(())
  }

  /// Consumes the rest of the stream through the end marker.
  pub fn read_end(&mut self) -> Result<(), PipeError> {
    if let Some(chunk) = self.trailing.take() {
      if chunk.is(b"IEND") {
        return Ok(());
      }
      log::debug!("skipping chunk {} after the image data", ChunkTyDisplay(chunk.chunk_ty));
    }
    loop {
      let chunk = pull_chunk(self.source)?;
      if chunk.is(b"IEND") {
        return Ok(());
      }
      log::debug!("skipping chunk {} after the image data", ChunkTyDisplay(chunk.chunk_ty));
    }
  }
}
