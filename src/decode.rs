#![forbid(unsafe_code)]

//! The decode adapter: compressed frame in, picture buffer out.

use alloc::vec::Vec;

use crate::engine::{Header, PngColorType, ScanlineReader, Transform, TransformSet};
use crate::picture::{HeapAllocator, Picture, PictureAllocator, PixelLayout};
use crate::{CompressedFrame, PipeError};

/// Picks the output layout and the transform set for a header.
///
/// The layout decision runs in order:
///
/// 1. A transparency chunk turns into a synthesized alpha channel, so the
///    output is [`Rgba32`](PixelLayout::Rgba32).
/// 2. Otherwise a color type without its own alpha channel lands in
///    [`Rgb24`](PixelLayout::Rgb24).
/// 3. Otherwise (grey+alpha, RGB+alpha) the output is `Rgba32`.
///
/// The rest of the set follows from the stored format alone: palette and
/// grey expansion, 16-bit stripping. The byte-order swap is tied to the
/// layout: the pipeline's 24-bit layout is blue-first, so exactly the
/// `Rgb24` outputs get swapped, while alpha-bearing output keeps RGB
/// order.
#[must_use]
pub fn negotiate(header: &Header) -> (TransformSet, PixelLayout) {
  let mut set = TransformSet::default();
  let layout = if header.has_transparency {
    set.insert(Transform::TransparencyToAlpha);
    PixelLayout::Rgba32
  } else if !header.color_type.has_alpha() {
    PixelLayout::Rgb24
  } else {
    PixelLayout::Rgba32
  };
  if header.color_type == PngColorType::Index {
    set.insert(Transform::ExpandPalette);
  }
  if matches!(header.color_type, PngColorType::Y | PngColorType::YA) {
    set.insert(Transform::ExpandGray);
  }
  if header.bit_depth == 16 {
    set.insert(Transform::StripSixteen);
  }
  if layout == PixelLayout::Rgb24 {
    set.insert(Transform::SwapRgbToBgr);
  }
  (set, layout)
}

/// Decodes whole compressed frames into picture buffers.
///
/// The decoder itself is stateless between calls; each call builds its
/// own engine reader and row table, so separate frames can be decoded
/// concurrently from separate threads, each with its own call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder<A: PictureAllocator = HeapAllocator> {
  allocator: A,
}

impl FrameDecoder<HeapAllocator> {
  /// A decoder backed by the default heap allocator.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }
}

impl<A: PictureAllocator> FrameDecoder<A> {
  /// A decoder that gets its picture buffers from `allocator`.
  #[inline]
  #[must_use]
  pub const fn with_allocator(allocator: A) -> Self {
    Self { allocator }
  }

  /// Decodes one complete frame into a freshly allocated picture.
  ///
  /// The frame is consumed either way: on success the caller owns exactly
  /// one fully populated picture stamped with the frame's timestamp, and
  /// on failure nothing is returned and the frame is gone with the call.
  pub fn decode_frame(&self, mut frame: CompressedFrame) -> Result<Picture, PipeError> {
    let timestamp = frame.timestamp();
    let mut reader = ScanlineReader::new(&mut frame);
    let header = reader.read_header()?;
    let (transforms, layout) = negotiate(&header);
    for step in transforms.steps() {
      reader.apply_transform(step)?;
    }
    // the set is fixed, so the allocator and the row transfer now agree
    // on bytes per pixel
    let mut picture = self.allocator.allocate(header.width, header.height, layout)?;
    picture.set_timestamp(timestamp);
    {
      let mut rows: Vec<&mut [u8]> = picture.rows_mut().collect();
      reader.read_image(&mut rows)?;
    }
    reader.read_end()?;
    Ok(picture)
  }
}
