#![no_std]

//! A crate that bridges PNG frames and raster picture buffers.
//!
//! The bridge runs two independent, symmetric pipelines for a media
//! pipeline that deals in whole frames:
//!
//! * **Decode**: one [`CompressedFrame`] holding a complete PNG stream
//!   goes through [`FrameDecoder::decode_frame`] and comes out as a
//!   [`Picture`] in one of two fixed layouts, [`PixelLayout::Rgb24`] or
//!   [`PixelLayout::Rgba32`]. The decoder inspects the stream header and
//!   picks the minimal lossless transform set that normalizes whatever
//!   the stream stores (palette, greyscale, 16-bit, transparency chunk)
//!   into the chosen layout.
//! * **Encode**: a [`Picture`] in `Rgb24` goes through
//!   [`FrameEncoder::encode_frame`] and comes out as one complete,
//!   freshly gathered [`CompressedFrame`].
//!
//! Both adapters drive the stream-oriented codec engine in [`engine`]
//! through per-call borrowed interfaces, fully synchronously; a decode or
//! encode call either completes or fails before it returns, and failure
//! never hands back a partially filled buffer. Timestamps ride along both
//! directions unchanged.
//!
//! Non-fatal diagnostics (checksum mismatches, skipped ancillary chunks)
//! go through the `log` facade and never change what a call returns.

extern crate alloc;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::PipeError;

pub mod frame;
pub use frame::CompressedFrame;

pub mod picture;
pub use picture::{HeapAllocator, Picture, PictureAllocator, PixelLayout, ASPECT_UNIT};

pub mod engine;

pub mod decode;
pub use decode::FrameDecoder;

pub mod encode;
pub use encode::FrameEncoder;
