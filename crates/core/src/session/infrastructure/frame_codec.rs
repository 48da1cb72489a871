//! Wire codec for frames: base64-wrapped JPEG in both directions.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode frame: {0}")]
    Encode(#[source] image::ImageError),
    #[error("frame buffer does not match its dimensions")]
    InvalidFrame,
}

/// Decode a client-submitted base64 image payload into an RGB frame.
///
/// Invalid base64 and undecodable image bytes are distinct variants so the
/// session can report them differently.
pub fn decode_base64_image(payload: &str, index: usize) -> Result<Frame, CodecError> {
    let bytes = BASE64.decode(payload)?;
    let img = image::load_from_memory(&bytes)
        .map_err(CodecError::Decode)?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, index))
}

/// Encode a frame as base64-wrapped JPEG bytes for the outbound message.
pub fn encode_frame_jpeg(frame: &Frame) -> Result<String, CodecError> {
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or(CodecError::InvalidFrame)?;

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .map_err(CodecError::Encode)?;

    Ok(BASE64.encode(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![128u8; (w * h * 3) as usize], w, h, 0)
    }

    #[test]
    fn test_encode_then_decode_preserves_dimensions() {
        let frame = gray_frame(40, 30);
        let payload = encode_frame_jpeg(&frame).unwrap();
        let decoded = decode_base64_image(&payload, 3).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
        assert_eq!(decoded.index(), 3);
    }

    #[test]
    fn test_encode_then_decode_is_close_for_flat_image() {
        // JPEG is lossy, but a flat gray image survives nearly exactly
        let frame = gray_frame(16, 16);
        let payload = encode_frame_jpeg(&frame).unwrap();
        let decoded = decode_base64_image(&payload, 0).unwrap();
        for (&a, &b) in frame.data().iter().zip(decoded.data()) {
            assert!((i16::from(a) - i16::from(b)).abs() <= 4);
        }
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let err = decode_base64_image("not base64 at all!!!", 0).unwrap_err();
        assert!(matches!(err, CodecError::Base64(_)));
    }

    #[test]
    fn test_decode_rejects_non_image_bytes() {
        let payload = BASE64.encode(b"these are not image bytes");
        let err = decode_base64_image(&payload, 0).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_decode_png_payload() {
        // Any format the image crate recognizes is accepted inbound
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_base64_image(&BASE64.encode(&bytes), 0).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.data()[0], 10);
    }
}
