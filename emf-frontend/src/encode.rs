//! 位图编码。

use std::io::Cursor;

use emf_engine::Bitmap;
use image::{ImageFormat, RgbaImage};

use crate::errors::FrontendError;

/// BGRA 转为 RGBA 后编码为 PNG。
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, FrontendError> {
    let mut rgba = bitmap.pixels().to_vec();
    for pixel in rgba.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    let image = RgbaImage::from_raw(bitmap.width(), bitmap.height(), rgba).ok_or_else(|| {
        FrontendError::Encode {
            format: "png",
            message: "pixel buffer does not match the bitmap size".to_string(),
        }
    })?;
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|err| FrontendError::Encode {
            format: "png",
            message: err.to_string(),
        })?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trips_channel_order() {
        let bitmap = Bitmap::filled(2, 1, [10, 20, 30, 255]);
        let png = encode_png(&bitmap).expect("encode");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .expect("decode")
            .to_rgba8();
        assert_eq!(decoded.get_pixel(1, 0).0, [30, 20, 10, 255]);
    }
}
