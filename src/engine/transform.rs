//! Pixel-format normalization applied during scanline transfer.
//!
//! The transfer always lands on one of two 8-bit layouts, so the
//! individual steps collapse into a single pass over each reconstructed
//! scanline. The set is still kept as explicit, ordered steps: the
//! expansions change the working channel count, so anything that reasons
//! about channels (alpha synthesis, the byte-order swap) has to come
//! after them, and depth stripping has to sit in between.

use bitfrob::u8_replicate_bits;

use super::chunks::{Header, PngColorType, Transparency, RGB8};
use crate::PipeError;

/// One normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
  /// Replace palette indexes with their RGB entries.
  ExpandPalette,
  /// Replicate the grey value across all three color channels.
  ExpandGray,
  /// Keep only the high byte of 16-bit channels.
  StripSixteen,
  /// Synthesize an alpha channel from the transparency chunk.
  TransparencyToAlpha,
  /// Store color channels in the pipeline's blue-first byte order.
  SwapRgbToBgr,
}

/// The ordered set of steps chosen for one frame.
///
/// Built once from the header before any scanline is read, then handed to
/// the engine step by step. Iteration order is the required application
/// order; inserting a step twice is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSet {
  expand_palette: bool,
  expand_gray: bool,
  strip_sixteen: bool,
  transparency_to_alpha: bool,
  swap_rgb_to_bgr: bool,
}

impl TransformSet {
  /// Adds a step, keeping the canonical order.
  #[inline]
  pub fn insert(&mut self, transform: Transform) {
    match transform {
      Transform::ExpandPalette => self.expand_palette = true,
      Transform::ExpandGray => self.expand_gray = true,
      Transform::StripSixteen => self.strip_sixteen = true,
      Transform::TransparencyToAlpha => self.transparency_to_alpha = true,
      Transform::SwapRgbToBgr => self.swap_rgb_to_bgr = true,
    }
  }

  /// Is the step part of the set?
  #[inline]
  #[must_use]
  pub const fn contains(&self, transform: Transform) -> bool {
    match transform {
      Transform::ExpandPalette => self.expand_palette,
      Transform::ExpandGray => self.expand_gray,
      Transform::StripSixteen => self.strip_sixteen,
      Transform::TransparencyToAlpha => self.transparency_to_alpha,
      Transform::SwapRgbToBgr => self.swap_rgb_to_bgr,
    }
  }

  /// The steps in application order.
  pub fn steps(&self) -> impl Iterator<Item = Transform> + '_ {
    [
      Transform::ExpandPalette,
      Transform::ExpandGray,
      Transform::StripSixteen,
      Transform::TransparencyToAlpha,
      Transform::SwapRgbToBgr,
    ]
    .into_iter()
    .filter(|t| self.contains(*t))
  }

  /// Bytes per output pixel once the set has been applied.
  #[inline]
  #[must_use]
  pub const fn output_bytes_per_pixel(&self, color_type: PngColorType) -> usize {
    if color_type.has_alpha() || self.transparency_to_alpha {
      4
    } else {
      3
    }
  }

  /// Whether this set actually normalizes the given header to an 8-bit
  /// RGB(A) layout: each expansion must be requested exactly when the
  /// stored format calls for it.
  #[inline]
  #[must_use]
  pub(crate) fn normalizes(&self, header: &Header) -> bool {
    self.expand_palette == matches!(header.color_type, PngColorType::Index)
      && self.expand_gray == matches!(header.color_type, PngColorType::Y | PngColorType::YA)
      && self.strip_sixteen == (header.bit_depth == 16)
  }
}

/// Normalizes one reconstructed scanline into one destination row.
///
/// `line` is the raw scanline in the header's stored format; `dst` must be
/// exactly `width * output_bytes_per_pixel` long.
pub(crate) fn normalize_scanline(
  header: &Header, palette: &[RGB8], transparency: Option<&Transparency>, set: &TransformSet,
  line: &[u8], dst: &mut [u8],
) -> Result<(), PipeError> {
  let width = header.width as usize;
  let out_bpp = set.output_bytes_per_pixel(header.color_type);
  let swap = set.contains(Transform::SwapRgbToBgr);
  debug_assert_eq!(dst.len(), width * out_bpp);
  match (header.color_type, header.bit_depth) {
    (PngColorType::Y, depth @ (1 | 2 | 4)) => {
      for x in 0..width {
        let raw = unpack_low_depth(line, x, depth);
        let y = u8_replicate_bits(u32::from(depth), raw);
        let a = grey_alpha(transparency, set, u16::from(raw));
        put(dst, x, out_bpp, swap, [y, y, y, a]);
      }
    }
    (PngColorType::Y, 8) => {
      for x in 0..width {
        let y = line[x];
        let a = grey_alpha(transparency, set, u16::from(y));
        put(dst, x, out_bpp, swap, [y, y, y, a]);
      }
    }
    (PngColorType::Y, 16) => {
      for x in 0..width {
        let full = u16::from_be_bytes([line[2 * x], line[2 * x + 1]]);
        let y = line[2 * x];
        let a = grey_alpha(transparency, set, full);
        put(dst, x, out_bpp, swap, [y, y, y, a]);
      }
    }
    (PngColorType::RGB, 8) => {
      for x in 0..width {
        let [r, g, b] = [line[3 * x], line[3 * x + 1], line[3 * x + 2]];
        let a = rgb_alpha(transparency, set, [u16::from(r), u16::from(g), u16::from(b)]);
        put(dst, x, out_bpp, swap, [r, g, b, a]);
      }
    }
    (PngColorType::RGB, 16) => {
      for x in 0..width {
        let o = 6 * x;
        let full = [
          u16::from_be_bytes([line[o], line[o + 1]]),
          u16::from_be_bytes([line[o + 2], line[o + 3]]),
          u16::from_be_bytes([line[o + 4], line[o + 5]]),
        ];
        let a = rgb_alpha(transparency, set, full);
        put(dst, x, out_bpp, swap, [line[o], line[o + 2], line[o + 4], a]);
      }
    }
    (PngColorType::Index, depth @ (1 | 2 | 4 | 8)) => {
      for x in 0..width {
        let i = if depth == 8 { line[x] } else { unpack_low_depth(line, x, depth) };
        let RGB8 { r, g, b } = palette.get(usize::from(i)).copied().unwrap_or_default();
        let a = index_alpha(transparency, set, i);
        put(dst, x, out_bpp, swap, [r, g, b, a]);
      }
    }
    (PngColorType::YA, 8) => {
      for x in 0..width {
        let [y, a] = [line[2 * x], line[2 * x + 1]];
        put(dst, x, out_bpp, swap, [y, y, y, a]);
      }
    }
    (PngColorType::YA, 16) => {
      for x in 0..width {
        let [y, a] = [line[4 * x], line[4 * x + 2]];
        put(dst, x, out_bpp, swap, [y, y, y, a]);
      }
    }
    (PngColorType::RGBA, 8) => {
      for x in 0..width {
        let o = 4 * x;
        put(dst, x, out_bpp, swap, [line[o], line[o + 1], line[o + 2], line[o + 3]]);
      }
    }
    (PngColorType::RGBA, 16) => {
      for x in 0..width {
        let o = 8 * x;
        put(dst, x, out_bpp, swap, [line[o], line[o + 2], line[o + 4], line[o + 6]]);
      }
    }
    _ => return Err(PipeError::Decode("illegal bit depth for color type")),
  }
  Ok(())
}

/// Pulls pixel `x` out of a packed sub-byte scanline, value in the low
/// bits. The leftmost pixel sits in the highest bits of its byte.
#[inline]
#[must_use]
fn unpack_low_depth(line: &[u8], x: usize, depth: u8) -> u8 {
  let bits = usize::from(depth);
  let bit_index = x * bits;
  let shift = 8 - bits - (bit_index % 8);
  (line[bit_index / 8] >> shift) & ((1 << bits) - 1)
}

#[inline]
fn grey_alpha(transparency: Option<&Transparency>, set: &TransformSet, full: u16) -> u8 {
  if set.contains(Transform::TransparencyToAlpha) {
    match transparency {
      Some(Transparency::Y { y }) if *y == full => 0,
      _ => 255,
    }
  } else {
    255
  }
}

#[inline]
fn rgb_alpha(transparency: Option<&Transparency>, set: &TransformSet, full: [u16; 3]) -> u8 {
  if set.contains(Transform::TransparencyToAlpha) {
    match transparency {
      Some(Transparency::RGB { r, g, b }) if [*r, *g, *b] == full => 0,
      _ => 255,
    }
  } else {
    255
  }
}

#[inline]
fn index_alpha(transparency: Option<&Transparency>, set: &TransformSet, i: u8) -> u8 {
  if set.contains(Transform::TransparencyToAlpha) {
    match transparency {
      Some(Transparency::Index { alphas }) => alphas.get(usize::from(i)).copied().unwrap_or(255),
      _ => 255,
    }
  } else {
    255
  }
}

/// Writes one output pixel, swapping the color byte order when asked.
/// The alpha byte is dropped for 3-byte output.
#[inline]
fn put(dst: &mut [u8], x: usize, out_bpp: usize, swap: bool, [r, g, b, a]: [u8; 4]) {
  let o = x * out_bpp;
  if swap {
    dst[o] = b;
    dst[o + 1] = g;
    dst[o + 2] = r;
  } else {
    dst[o] = r;
    dst[o + 1] = g;
    dst[o + 2] = b;
  }
  if out_bpp == 4 {
    dst[o + 3] = a;
  }
}
