//! Chunk-level reading for the decode engine.
//!
//! The engine only parses the chunk types a single-frame bridge needs:
//! `IHDR`, `PLTE`, `tRNS`, `IDAT`, and `IEND`. Everything else (text,
//! gamma, ICC profiles, animation control, ...) is pulled off the stream
//! and skipped with a debug log.
//!
//! CRC mismatches on decode are reported as warnings and otherwise
//! ignored; the checksums guard against storage rot, not against the
//! malformed data the parser already has to handle.

use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};

use super::crc32::chunk_crc;
use super::ByteSource;
use crate::PipeError;

/// The first eight bytes of a PNG datastream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Width and height are both capped here to prevent accidental
/// out-of-memory problems on hostile headers.
pub const MAX_DIMENSION: u32 = 17_000;

/// A chunk's declared length may not exceed this (2^31 - 1, per the PNG
/// datastream rules).
const MAX_CHUNK_LEN: usize = (1 << 31) - 1;

/// An RGB palette entry, 8 bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RGB8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

/// One chunk pulled off the stream: type, owned data, declared CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
  pub chunk_ty: [u8; 4],
  pub data: Vec<u8>,
}

impl RawChunk {
  #[inline]
  #[must_use]
  pub fn is(&self, ty: &[u8; 4]) -> bool {
    &self.chunk_ty == ty
  }
}

/// Pulls the next whole chunk from the source.
///
/// The declared CRC is checked against the type and data actually read; a
/// mismatch is surfaced as a warning only.
pub fn pull_chunk<S: ByteSource + ?Sized>(source: &mut S) -> Result<RawChunk, PipeError> {
  let mut head = [0_u8; 8];
  source.pull(&mut head)?;
  let len = u32::from_be_bytes(head[..4].try_into().unwrap()) as usize;
  let chunk_ty: [u8; 4] = head[4..8].try_into().unwrap();
  if len > MAX_CHUNK_LEN {
    return Err(PipeError::Header("chunk length out of range"));
  }
  let mut data = Vec::new();
  data.try_reserve(len)?;
  data.resize(len, 0);
  source.pull(&mut data)?;
  let mut declared = [0_u8; 4];
  source.pull(&mut declared)?;
  let declared_crc = u32::from_be_bytes(declared);
  if chunk_crc(chunk_ty, &data) != declared_crc {
    log::warn!(
      "chunk {} fails its CRC check, continuing anyway",
      ChunkTyDisplay(chunk_ty)
    );
  }
  Ok(RawChunk { chunk_ty, data })
}

/// Prints a chunk type as the four ASCII letters it's supposed to be.
pub(crate) struct ChunkTyDisplay(pub [u8; 4]);
impl core::fmt::Display for ChunkTyDisplay {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for byte in self.0 {
      let c = if byte.is_ascii_alphabetic() { byte as char } else { '?' };
      write!(f, "{c}")?;
    }
    Ok(())
  }
}

/// The color types a PNG header can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette of RGB entries.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }
  /// Does the stored pixel carry its own alpha channel?
  #[inline]
  #[must_use]
  pub const fn has_alpha(self) -> bool {
    matches!(self, Self::YA | Self::RGBA)
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = PipeError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Y,
      2 => Self::RGB,
      3 => Self::Index,
      4 => Self::YA,
      6 => Self::RGBA,
      _ => return Err(PipeError::Header("illegal color type")),
    })
  }
}

/// Everything the adapter learns from the pre-image part of the stream.
///
/// Read once per decode and immutable after that; the whole transform
/// negotiation keys off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  /// Width in pixels, nonzero.
  pub width: u32,
  /// Height in pixels, nonzero.
  pub height: u32,
  /// Bits per channel: 1, 2, 4, 8, or 16, as the color type allows.
  pub bit_depth: u8,
  /// How the channels are stored.
  pub color_type: PngColorType,
  /// Whether a transparency chunk precedes the image data.
  pub has_transparency: bool,
  /// The interlace flag as parsed. Reported but not specially iterated;
  /// the scanline reader refuses interlaced payloads.
  pub is_interlaced: bool,
}

impl Header {
  /// Bits one pixel occupies in the stored scanline.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    self.bit_depth as usize * self.color_type.channel_count()
  }

  /// Bytes one stored scanline occupies, excluding the filter byte.
  ///
  /// Sub-byte pixel formats can leave padding bits at the end of the
  /// line, so this rounds up.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(&self) -> usize {
    (self.bits_per_pixel() * self.width as usize + 7) / 8
  }

  /// The unit filters operate on: whole pixels at 8+ bits per pixel,
  /// single bytes below that.
  #[inline]
  #[must_use]
  pub const fn filter_unit(&self) -> usize {
    let unit = self.bits_per_pixel() / 8;
    if unit == 0 {
      1
    } else {
      unit
    }
  }

  /// The buffer size zlib decompression of the image data needs: one
  /// filter byte plus one scanline, per row.
  #[inline]
  #[must_use]
  pub const fn decompressed_len(&self) -> usize {
    (1 + self.bytes_per_scanline()) * self.height as usize
  }
}

/// Parses an IHDR chunk payload.
pub(crate) fn parse_ihdr(data: &[u8]) -> Result<Header, PipeError> {
  match *data {
    [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression, filter, interlace] => {
      let width = u32::from_be_bytes([w0, w1, w2, w3]);
      let height = u32::from_be_bytes([h0, h1, h2, h3]);
      if width == 0 || height == 0 {
        return Err(PipeError::Header("width or height is zero"));
      }
      if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(PipeError::Header("image dimensions exceed the decode cap"));
      }
      if compression != 0 || filter != 0 {
        return Err(PipeError::Header("unknown compression or filter method"));
      }
      let color_type = PngColorType::try_from(color_type)?;
      let depth_ok = match color_type {
        PngColorType::Y => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
        PngColorType::RGB | PngColorType::YA | PngColorType::RGBA => matches!(bit_depth, 8 | 16),
        PngColorType::Index => matches!(bit_depth, 1 | 2 | 4 | 8),
      };
      if !depth_ok {
        return Err(PipeError::Header("illegal bit depth for color type"));
      }
      let is_interlaced = match interlace {
        0 => false,
        1 => true,
        _ => return Err(PipeError::Header("unknown interlace method")),
      };
      Ok(Header {
        width,
        height,
        bit_depth,
        color_type,
        has_transparency: false,
        is_interlaced,
      })
    }
    _ => Err(PipeError::Header("IHDR payload must be 13 bytes")),
  }
}

/// Parsed transparency data.
///
/// `Y` and `RGB` name a single fully transparent sample value, stored at
/// 16 bits regardless of the image's bit depth. `Index` holds per-palette-
/// entry alphas; entries past the end of the slice are fully opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transparency {
  Y { y: u16 },
  RGB { r: u16, g: u16, b: u16 },
  Index { alphas: Vec<u8> },
}

/// Parses a tRNS chunk payload for the given color type.
///
/// Alpha-bearing color types aren't allowed a transparency chunk; one is
/// reported as a warning and dropped.
pub(crate) fn parse_trns(color_type: PngColorType, data: &[u8]) -> Option<Transparency> {
  match color_type {
    PngColorType::Y => match *data {
      [y0, y1] => Some(Transparency::Y { y: u16::from_be_bytes([y0, y1]) }),
      _ => {
        log::warn!("greyscale transparency chunk has the wrong length, dropping it");
        None
      }
    },
    PngColorType::RGB => match *data {
      [r0, r1, g0, g1, b0, b1] => Some(Transparency::RGB {
        r: u16::from_be_bytes([r0, r1]),
        g: u16::from_be_bytes([g0, g1]),
        b: u16::from_be_bytes([b0, b1]),
      }),
      _ => {
        log::warn!("rgb transparency chunk has the wrong length, dropping it");
        None
      }
    },
    PngColorType::Index => Some(Transparency::Index { alphas: data.to_vec() }),
    PngColorType::YA | PngColorType::RGBA => {
      log::warn!("transparency chunk on an alpha color type, dropping it");
      None
    }
  }
}
