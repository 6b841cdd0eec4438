//! Raster decoding for signature images.
//!
//! Payload formats are detected from their leading bytes, not from any media
//! type the payload claims to be.

use image::ImageFormat;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const JPEG_SIGNATURE: &[u8] = &[0xff, 0xd8, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn sniff(bytes: &[u8]) -> Result<Self, RasterError> {
        if bytes.starts_with(PNG_SIGNATURE) {
            Ok(Self::Png)
        } else if bytes.starts_with(JPEG_SIGNATURE) {
            Ok(Self::Jpeg)
        } else {
            Err(RasterError::UnsupportedFormat)
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("image payload is neither PNG nor JPEG")]
    UnsupportedFormat,
    #[error("image has zero width or height")]
    Empty,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoded pixels split into colour and alpha planes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// 8-bit RGB samples, row-major
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples; `None` when the image is fully opaque
    pub alpha: Option<Vec<u8>>,
}

pub fn decode(bytes: &[u8]) -> Result<DecodedImage, RasterError> {
    let format = RasterFormat::sniff(bytes)?;
    let rgba = image::load_from_memory_with_format(bytes, format.image_format())?.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(RasterError::Empty);
    }

    let pixels = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);

    Ok(DecodedImage { width, height, rgb, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};
    use std::io::Cursor;

    fn png_bytes(alpha: u8) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(3, 2, Rgba([10u8, 20, 30, alpha]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(4, 4, Rgb([200u8, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn sniffs_by_signature() {
        assert_eq!(RasterFormat::sniff(&png_bytes(255)).unwrap(), RasterFormat::Png);
        assert_eq!(RasterFormat::sniff(&[0xff, 0xd8, 0xff, 0xe0]).unwrap(), RasterFormat::Jpeg);
        assert!(matches!(RasterFormat::sniff(b"GIF89a"), Err(RasterError::UnsupportedFormat)));
    }

    #[test]
    fn decodes_opaque_png_without_alpha_plane() {
        let decoded = decode(&png_bytes(255)).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(&decoded.rgb[..3], &[10, 20, 30]);
        assert_eq!(decoded.rgb.len(), 18);
        assert!(decoded.alpha.is_none());
    }

    #[test]
    fn keeps_alpha_plane_for_translucent_png() {
        let decoded = decode(&png_bytes(128)).unwrap();
        assert_eq!(decoded.alpha.as_deref(), Some(&[128u8; 6][..]));
    }

    #[test]
    fn decodes_jpeg_without_alpha_plane() {
        let bytes = jpeg_bytes();
        assert_eq!(RasterFormat::sniff(&bytes).unwrap(), RasterFormat::Jpeg);

        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 4));
        assert_eq!(decoded.rgb.len(), 48);
        assert!(decoded.alpha.is_none());
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let mut bytes = png_bytes(255);
        bytes.truncate(20);
        assert!(matches!(decode(&bytes), Err(RasterError::Decode(_))));
    }
}
