use core::fmt::{Display, Formatter};
use core::num::TryFromIntError;

/// An error from the `pngpipe` crate.
///
/// Every engine interaction returns one of these through `Result`, so an
/// error raised at any stage of a decode or encode call aborts the whole
/// call at the next `?`. There is no partial recovery: a failed call never
/// hands back a partially filled picture or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
  /// The compressed frame ran out of bytes before the engine was done
  /// requesting them.
  StreamUnderflow,

  /// The stream's signature or header was malformed or unsupported.
  Header(&'static str),

  /// Scanline reconstruction failed after the header was accepted.
  Decode(&'static str),

  /// The encode engine could not produce the expected output chunks.
  Encode(&'static str),

  /// The allocator couldn't give us enough space, or refused the
  /// requested picture geometry.
  Alloc,
}

impl Display for PipeError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::StreamUnderflow => f.write_str("compressed frame ran out of bytes"),
      Self::Header(msg) => write!(f, "header error: {msg}"),
      Self::Decode(msg) => write!(f, "decode error: {msg}"),
      Self::Encode(msg) => write!(f, "encode error: {msg}"),
      Self::Alloc => f.write_str("allocation failed"),
    }
  }
}

impl From<alloc::collections::TryReserveError> for PipeError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::Alloc
  }
}
impl From<TryFromIntError> for PipeError {
  #[inline]
  fn from(_: TryFromIntError) -> Self {
    Self::Header("value out of range")
  }
}
