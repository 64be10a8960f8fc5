// The image source/sink collaborator boundary. The core never decodes or
// encodes pixels itself: it asks this helper for a capture and either gets a
// well-formed RGB buffer or a `Missing` marker, and hands finished buffers
// back for persistence. Codec choice is driven by the destination path's
// extension.

pub mod image_helper {
    use crate::core_modules::pixel_buffer::pixel_buffer::{
        CellSource, PixelBuffer, WidePixelBuffer,
    };
    use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
    use image::{ExtendedColorType, ImageError};
    use log::warn;

    /// Loads one capture, decoding to 8-bit RGB. A file that is absent or
    /// fails to decode yields `CellSource::Missing`; the caller decides what
    /// a missing capture means for its stage.
    pub fn load(path: &str) -> CellSource {
        match image::open(path) {
            Ok(decoded) => {
                let rgb = decoded.to_rgb8();
                let (width, height) = rgb.dimensions();
                match PixelBuffer::from_raw(width, height, 3, rgb.into_raw()) {
                    Some(buffer) => CellSource::Loaded(buffer),
                    None => CellSource::Missing,
                }
            }
            Err(error) => {
                warn!("image not loaded properly: {path}: {error}");
                CellSource::Missing
            }
        }
    }

    /// Persists a buffer to `path`, with the codec chosen from the extension.
    pub fn save(buffer: &PixelBuffer, path: &str) -> Result<(), ImageError> {
        let color_type = match buffer.channels {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            4 => ExtendedColorType::Rgba8,
            other => {
                return Err(ImageError::Unsupported(
                    UnsupportedError::from_format_and_kind(
                        ImageFormatHint::Unknown,
                        UnsupportedErrorKind::Color(ExtendedColorType::Unknown(other as u8)),
                    ),
                ));
            }
        };
        image::save_buffer(path, &buffer.data, buffer.width, buffer.height, color_type)
    }

    /// Persists a widened buffer by narrowing (saturating) to 8 bits first.
    pub fn save_wide(buffer: &WidePixelBuffer, path: &str) -> Result<(), ImageError> {
        save(&buffer.narrow_saturating(), path)
    }
}
