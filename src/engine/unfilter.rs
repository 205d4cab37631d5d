//! Scanline filter reconstruction.
//!
//! From the PNG spec:
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.

use crate::PipeError;

/// Reconstructs filtered image data in place.
///
/// `filtered` holds whole filterlines: one filter-type byte followed by
/// `bytes_per_filterline - 1` bytes of scanline data, repeated for every
/// row. After a successful call every filter byte is reset to zero and the
/// scanline bytes hold the reconstructed values.
///
/// `filter_unit` is the byte distance between a byte and its "left"
/// neighbour: the bytes per pixel for formats of 8+ bits per pixel, one
/// byte for the packed sub-byte formats.
pub(crate) fn reconstruct_in_place(
  filtered: &mut [u8], bytes_per_filterline: usize, filter_unit: usize,
) -> Result<(), PipeError> {
  debug_assert!(bytes_per_filterline > 1);
  debug_assert_eq!(filtered.len() % bytes_per_filterline, 0);
  let mut previous: &mut [u8] = &mut [];
  for filterline in filtered.chunks_exact_mut(bytes_per_filterline) {
    let (filter_byte, line) = filterline.split_first_mut().unwrap();
    match *filter_byte {
      0 => (),
      1 => {
        // Sub: add the value one filter unit to the left, so the first
        // unit passes through unchanged.
        for i in filter_unit..line.len() {
          line[i] = line[i].wrapping_add(line[i - filter_unit]);
        }
      }
      2 => {
        // Up: the first line's implied previous line is all zero.
        if !previous.is_empty() {
          line.iter_mut().zip(previous.iter()).for_each(|(x, b)| *x = x.wrapping_add(*b));
        }
      }
      3 => {
        // Average of left and up, computed without overflow.
        for i in 0..line.len() {
          let a = if i >= filter_unit { line[i - filter_unit] } else { 0 };
          let b = previous.get(i).copied().unwrap_or(0);
          line[i] = line[i].wrapping_add(((u16::from(a) + u16::from(b)) / 2) as u8);
        }
      }
      4 => {
        // Paeth: predict from left, up, and up-left.
        for i in 0..line.len() {
          let a = if i >= filter_unit { line[i - filter_unit] } else { 0 };
          let b = previous.get(i).copied().unwrap_or(0);
          let c = if i >= filter_unit { previous.get(i - filter_unit).copied().unwrap_or(0) } else { 0 };
          line[i] = line[i].wrapping_add(paeth_predictor(a, b, c));
        }
      }
      _ => return Err(PipeError::Decode("illegal scanline filter type")),
    }
    *filter_byte = 0;
    previous = line;
  }
  Ok(())
}

/// The Paeth filter function computes a simple linear function of the
/// three neighbouring bytes (left `a`, above `b`, upper left `c`) and
/// picks the neighbour closest to it.
///
/// The spec is extremely specific that the order of evaluation of the
/// tie-breaking tests shall not be altered.
const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}
