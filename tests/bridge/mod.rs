use pngpipe::{
  CompressedFrame, FrameDecoder, FrameEncoder, HeapAllocator, Picture, PictureAllocator,
  PipeError, PixelLayout, ASPECT_UNIT,
};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

// Stream-building helpers. The tests assemble their own inputs byte by
// byte so decoding is checked against independently constructed streams,
// not against the crate's encoder.

fn crc32(bytes: &[u8]) -> u32 {
  let mut crc = u32::MAX;
  for &byte in bytes {
    crc ^= u32::from(byte);
    for _ in 0..8 {
      crc = if crc & 1 != 0 { 0xEDB8_8320 ^ (crc >> 1) } else { crc >> 1 };
    }
  }
  crc ^ u32::MAX
}

fn chunk(ty: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  let mut crc_input = ty.to_vec();
  crc_input.extend_from_slice(data);
  out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
  out
}

fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> [u8; 13] {
  let mut data = [0; 13];
  data[0..4].copy_from_slice(&width.to_be_bytes());
  data[4..8].copy_from_slice(&height.to_be_bytes());
  data[8] = bit_depth;
  data[9] = color_type;
  data[12] = interlace;
  data
}

/// A full stream: signature, IHDR, any extra pre-image chunks, the
/// compressed filterlines as IDAT, IEND.
fn build_png(ihdr_data: &[u8; 13], extra: &[(&[u8; 4], Vec<u8>)], filterlines: &[u8]) -> Vec<u8> {
  let mut out = SIGNATURE.to_vec();
  out.extend_from_slice(&chunk(b"IHDR", ihdr_data));
  for (ty, data) in extra {
    out.extend_from_slice(&chunk(ty, data));
  }
  let compressed = miniz_oxide::deflate::compress_to_vec_zlib(filterlines, 6);
  out.extend_from_slice(&chunk(b"IDAT", &compressed));
  out.extend_from_slice(&chunk(b"IEND", &[]));
  out
}

/// Prefixes every row with filter type zero.
fn unfiltered(rows: &[&[u8]]) -> Vec<u8> {
  let mut out = Vec::new();
  for row in rows {
    out.push(0);
    out.extend_from_slice(row);
  }
  out
}

fn decode(bytes: Vec<u8>) -> Result<Picture, PipeError> {
  FrameDecoder::new().decode_frame(CompressedFrame::new(bytes, 0))
}

// Decoding

#[test]
fn rgb_without_alpha_decodes_to_native_order_rgb24() {
  let rows: [&[u8]; 2] = [&[1, 2, 3, 4, 5, 6], &[7, 8, 9, 10, 11, 12]];
  let png = build_png(&ihdr(2, 2, 8, 2, 0), &[], &unfiltered(&rows));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgb24);
  assert_eq!((pic.width(), pic.height()), (2, 2));
  assert!(pic.pitch() >= 6);
  assert_eq!(pic.aspect(), ASPECT_UNIT);
  // stored blue-first, against a known reference
  assert_eq!(pic.row(0), &[3, 2, 1, 6, 5, 4]);
  assert_eq!(pic.row(1), &[9, 8, 7, 12, 11, 10]);
}

#[test]
fn grey_with_alpha_decodes_to_rgba32() {
  let png = build_png(&ihdr(1, 1, 8, 4, 0), &[], &unfiltered(&[&[0x37, 0x80]]));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgba32);
  assert_eq!(pic.row(0), &[0x37, 0x37, 0x37, 0x80]);
}

#[test]
fn transparency_chunk_turns_rgb_into_rgba32() {
  let trns = vec![0, 9, 0, 8, 0, 7];
  let rows: [&[u8]; 1] = [&[9, 8, 7, 1, 2, 3]];
  let png = build_png(&ihdr(2, 1, 8, 2, 0), &[(b"tRNS", trns)], &unfiltered(&rows));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgba32);
  // alpha-bearing output keeps RGB order; the matching pixel goes clear
  assert_eq!(pic.row(0), &[9, 8, 7, 0, 1, 2, 3, 255]);
}

#[test]
fn grey_transparency_matches_exact_samples() {
  let png =
    build_png(&ihdr(2, 1, 8, 0, 0), &[(b"tRNS", vec![0, 5])], &unfiltered(&[&[5, 6]]));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgba32);
  assert_eq!(pic.row(0), &[5, 5, 5, 0, 6, 6, 6, 255]);
}

#[test]
fn palette_with_transparency_decodes_to_rgba32() {
  let plte = vec![10, 20, 30, 40, 50, 60];
  let png = build_png(
    &ihdr(2, 1, 8, 3, 0),
    &[(b"PLTE", plte), (b"tRNS", vec![128])],
    &unfiltered(&[&[0, 1]]),
  );
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgba32);
  // entry 1 is past the transparency table, so it's fully opaque
  assert_eq!(pic.row(0), &[10, 20, 30, 128, 40, 50, 60, 255]);
}

#[test]
fn palette_without_transparency_decodes_to_rgb24() {
  let plte = vec![10, 20, 30, 40, 50, 60];
  let png = build_png(&ihdr(2, 1, 8, 3, 0), &[(b"PLTE", plte)], &unfiltered(&[&[0, 1]]));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgb24);
  assert_eq!(pic.row(0), &[30, 20, 10, 60, 50, 40]);
}

#[test]
fn sixteen_bit_channels_strip_to_their_high_bytes() {
  let rows: [&[u8]; 1] = [&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]];
  let png = build_png(&ihdr(1, 1, 16, 2, 0), &[], &unfiltered(&rows));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgb24);
  assert_eq!(pic.row(0), &[0xEE, 0xCC, 0xAA]);
}

#[test]
fn one_bit_grey_replicates_to_full_bytes() {
  let png = build_png(&ihdr(2, 1, 1, 0, 0), &[], &unfiltered(&[&[0b1000_0000]]));
  let pic = decode(png).unwrap();
  assert_eq!(pic.layout(), PixelLayout::Rgb24);
  assert_eq!(pic.row(0), &[255, 255, 255, 0, 0, 0]);
}

#[test]
fn image_data_split_across_chunks_decodes() {
  let rows: [&[u8]; 1] = [&[1, 2, 3, 4, 5, 6]];
  let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&unfiltered(&rows), 6);
  let (front, back) = compressed.split_at(compressed.len() / 2);
  let mut png = SIGNATURE.to_vec();
  png.extend_from_slice(&chunk(b"IHDR", &ihdr(2, 1, 8, 2, 0)));
  png.extend_from_slice(&chunk(b"IDAT", front));
  png.extend_from_slice(&chunk(b"IDAT", back));
  png.extend_from_slice(&chunk(b"IEND", &[]));
  let pic = decode(png).unwrap();
  assert_eq!(pic.row(0), &[3, 2, 1, 6, 5, 4]);
}

#[test]
fn every_filter_type_reconstructs() {
  // five RGB rows, one per filter type, forward-filtered here by hand
  let width = 3_usize;
  let bpp = 3_usize;
  let raw: Vec<Vec<u8>> = (0..5)
    .map(|y| (0..width * bpp).map(|i| (y * 31 + i * 7) as u8).collect())
    .collect();
  fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a_, b_, c_) = (i32::from(a), i32::from(b), i32::from(c));
    let p = a_ + b_ - c_;
    let (pa, pb, pc) = ((p - a_).abs(), (p - b_).abs(), (p - c_).abs());
    if pa <= pb && pa <= pc {
      a
    } else if pb <= pc {
      b
    } else {
      c
    }
  }
  let mut filterlines = Vec::new();
  for (y, row) in raw.iter().enumerate() {
    let filter = y as u8; // 0 through 4
    filterlines.push(filter);
    for i in 0..row.len() {
      let x = row[i];
      let a = if i >= bpp { row[i - bpp] } else { 0 };
      let b = if y > 0 { raw[y - 1][i] } else { 0 };
      let c = if y > 0 && i >= bpp { raw[y - 1][i - bpp] } else { 0 };
      let predicted = match filter {
        0 => 0,
        1 => a,
        2 => b,
        3 => ((u16::from(a) + u16::from(b)) / 2) as u8,
        4 => paeth(a, b, c),
        _ => unreachable!(),
      };
      filterlines.push(x.wrapping_sub(predicted));
    }
  }
  let png = build_png(&ihdr(width as u32, 5, 8, 2, 0), &[], &filterlines);
  let pic = decode(png).unwrap();
  for (y, row) in raw.iter().enumerate() {
    let expected: Vec<u8> =
      row.chunks_exact(3).flat_map(|px| [px[2], px[1], px[0]]).collect();
    assert_eq!(pic.row(y as u32), &expected[..], "row {y}");
  }
}

#[test]
fn aspect_uses_truncating_division() {
  let rows: Vec<Vec<u8>> = (0..7).map(|_| vec![0, 0, 0]).collect();
  let row_refs: Vec<&[u8]> = rows.iter().map(Vec::as_slice).collect();
  let png = build_png(&ihdr(1, 7, 8, 2, 0), &[], &unfiltered(&row_refs));
  let pic = decode(png).unwrap();
  assert_eq!(pic.aspect(), ASPECT_UNIT / 7);
}

#[test]
fn decode_keeps_the_frame_timestamp() {
  let rows: [&[u8]; 1] = [&[1, 2, 3]];
  let png = build_png(&ihdr(1, 1, 8, 2, 0), &[], &unfiltered(&rows));
  let pic = FrameDecoder::new().decode_frame(CompressedFrame::new(png, 90_000)).unwrap();
  assert_eq!(pic.timestamp(), 90_000);
}

// Failure paths

#[test]
fn truncated_streams_fail_cleanly() {
  let rows: [&[u8]; 2] = [&[1, 2, 3, 4, 5, 6], &[7, 8, 9, 10, 11, 12]];
  let png = build_png(&ihdr(2, 2, 8, 2, 0), &[], &unfiltered(&rows));
  for keep in [10, 20, 33, png.len() - 10] {
    let cut = png[..keep].to_vec();
    assert!(decode(cut).is_err(), "kept {keep} bytes");
  }
}

#[test]
fn signature_mismatch_is_a_header_error() {
  let rows: [&[u8]; 1] = [&[1, 2, 3]];
  let mut png = build_png(&ihdr(1, 1, 8, 2, 0), &[], &unfiltered(&rows));
  png[0] ^= 0xFF;
  assert!(matches!(decode(png), Err(PipeError::Header(_))));
}

#[test]
fn zero_dimensions_are_a_header_error() {
  let png = build_png(&ihdr(0, 1, 8, 2, 0), &[], &[]);
  assert!(matches!(decode(png), Err(PipeError::Header(_))));
}

#[test]
fn interlaced_streams_are_refused() {
  let rows: [&[u8]; 1] = [&[1, 2, 3]];
  let png = build_png(&ihdr(1, 1, 8, 2, 1), &[], &unfiltered(&rows));
  assert!(matches!(decode(png), Err(PipeError::Decode(_))));
}

#[test]
fn missing_end_marker_fails() {
  let rows: [&[u8]; 1] = [&[1, 2, 3]];
  let mut png = build_png(&ihdr(1, 1, 8, 2, 0), &[], &unfiltered(&rows));
  png.truncate(png.len() - 12); // drop the IEND chunk
  assert_eq!(decode(png), Err(PipeError::StreamUnderflow));
}

#[test]
fn garbage_input_fails_without_panicking() {
  for _ in 0..10 {
    let junk = crate::rand_bytes(1024);
    assert!(decode(junk).is_err());
  }
}

// Encoding

fn test_picture(width: u32, height: u32) -> Picture {
  let mut pic = HeapAllocator::default().allocate(width, height, PixelLayout::Rgb24).unwrap();
  for y in 0..height {
    for (i, byte) in pic.row_mut(y).iter_mut().enumerate() {
      *byte = (y as usize * 89 + i * 13) as u8;
    }
  }
  pic
}

#[test]
fn encode_emits_one_complete_stream() {
  let mut pic = test_picture(4, 3);
  pic.set_timestamp(1234);
  let frame = FrameEncoder::new().encode_frame(&pic).unwrap();
  assert_eq!(frame.timestamp(), 1234);
  let bytes = frame.as_bytes();
  assert_eq!(&bytes[..8], &SIGNATURE);
  assert_eq!(&bytes[8..16], &[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
  // the stream ends with the fixed IEND chunk
  let iend = [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];
  assert_eq!(&bytes[bytes.len() - 12..], &iend);
}

#[test]
fn encoder_rejects_alpha_input() {
  let pic = HeapAllocator::default().allocate(2, 2, PixelLayout::Rgba32).unwrap();
  assert!(matches!(FrameEncoder::new().encode_frame(&pic), Err(PipeError::Encode(_))));
}

#[test]
fn round_trip_is_lossless() {
  let mut pic = test_picture(5, 4);
  pic.set_timestamp(42);
  let frame = FrameEncoder::new().encode_frame(&pic).unwrap();
  let back = FrameDecoder::new().decode_frame(frame).unwrap();
  assert_eq!(back.layout(), PixelLayout::Rgb24);
  assert_eq!((back.width(), back.height()), (5, 4));
  assert_eq!(back.timestamp(), 42);
  for y in 0..4 {
    assert_eq!(pic.row(y), back.row(y), "row {y}");
  }
}

#[test]
fn round_trip_survives_a_padded_pitch() {
  // a pitch well past the row size must not leak padding into the stream
  let mut pic = Picture::with_pitch(3, 2, PixelLayout::Rgb24, 16).unwrap();
  for y in 0..2 {
    pic.row_mut(y).copy_from_slice(&[y as u8; 9]);
  }
  let frame = FrameEncoder::new().encode_frame(&pic).unwrap();
  let back = FrameDecoder::new().decode_frame(frame).unwrap();
  assert_eq!(back.row(0), &[0; 9]);
  assert_eq!(back.row(1), &[1; 9]);
}
