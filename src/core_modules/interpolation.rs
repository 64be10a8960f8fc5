// THEORY:
// The `interpolation` module up-scales a capture by the mosaic's integer
// scale factor before it is divided into quadrants. Nearest keeps hard pixel
// edges and is exactly reversible for solid regions; bilinear is the flow's
// default and matches what the capture stage's resampler produces. Anything
// fancier (cubic, Lanczos) belongs to the capture hardware path, not here.

use crate::core_modules::pixel_buffer::pixel_buffer::{Byte, PixelBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationKind {
    Nearest,
    Bilinear,
}

/// Up-scales a capture by an integer factor. A factor of 1 (or 0) returns an
/// unscaled copy.
pub fn upscale(buffer: &PixelBuffer, scale: u32, kind: InterpolationKind) -> PixelBuffer {
    let scale = scale.max(1);
    if scale == 1 {
        return buffer.clone();
    }
    match kind {
        InterpolationKind::Nearest => upscale_nearest(buffer, scale),
        InterpolationKind::Bilinear => upscale_bilinear(buffer, scale),
    }
}

fn upscale_nearest(src: &PixelBuffer, scale: u32) -> PixelBuffer {
    let mut dst = PixelBuffer::new(src.width * scale, src.height * scale, src.channels);
    let channels = src.channels as usize;
    for y in 0..dst.height {
        let src_row = src.row(y / scale);
        let dst_row = dst.row_mut(y);
        for x in 0..src.width * scale {
            let src_start = (x / scale) as usize * channels;
            let dst_start = x as usize * channels;
            dst_row[dst_start..dst_start + channels]
                .copy_from_slice(&src_row[src_start..src_start + channels]);
        }
    }
    dst
}

fn upscale_bilinear(src: &PixelBuffer, scale: u32) -> PixelBuffer {
    let mut dst = PixelBuffer::new(src.width * scale, src.height * scale, src.channels);
    let channels = src.channels as usize;
    let inverse_scale = 1.0 / scale as f32;

    for y in 0..dst.height {
        // Center-aligned source coordinate, clamped at the borders.
        let src_y = ((y as f32 + 0.5) * inverse_scale - 0.5).max(0.0);
        let y0 = (src_y.floor() as u32).min(src.height - 1);
        let y1 = (y0 + 1).min(src.height - 1);
        let dy = src_y - y0 as f32;

        for x in 0..dst.width {
            let src_x = ((x as f32 + 0.5) * inverse_scale - 0.5).max(0.0);
            let x0 = (src_x.floor() as u32).min(src.width - 1);
            let x1 = (x0 + 1).min(src.width - 1);
            let dx = src_x - x0 as f32;

            let top_left = src.pixel(x0, y0);
            let top_right = src.pixel(x1, y0);
            let bottom_left = src.pixel(x0, y1);
            let bottom_right = src.pixel(x1, y1);

            let dst_start = (y as usize * dst.width as usize + x as usize) * channels;
            for channel in 0..channels {
                let top = top_left[channel] as f32 * (1.0 - dx) + top_right[channel] as f32 * dx;
                let bottom =
                    bottom_left[channel] as f32 * (1.0 - dx) + bottom_right[channel] as f32 * dx;
                let value = top * (1.0 - dy) + bottom * dy;
                dst.data[dst_start + channel] = value.round().clamp(0.0, 255.0) as Byte;
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_one_is_a_copy() {
        let src = PixelBuffer::from_raw(2, 1, 1, vec![10, 20]).unwrap();
        assert_eq!(upscale(&src, 1, InterpolationKind::Bilinear), src);
    }

    #[test]
    fn nearest_doubling_replicates_pixels() {
        let src = PixelBuffer::from_raw(2, 2, 1, vec![1, 2, 3, 4]).unwrap();
        let dst = upscale(&src, 2, InterpolationKind::Nearest);
        assert_eq!(dst.width, 4);
        assert_eq!(dst.height, 4);
        assert_eq!(dst.data, vec![1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]);
    }

    #[test]
    fn bilinear_preserves_corners_and_solid_regions() {
        let src = PixelBuffer::from_raw(2, 2, 1, vec![0, 100, 100, 200]).unwrap();
        let dst = upscale(&src, 2, InterpolationKind::Bilinear);
        assert_eq!(dst.pixel(0, 0), &[0]);
        assert_eq!(dst.pixel(3, 3), &[200]);

        let flat = PixelBuffer::from_raw(3, 3, 3, vec![42; 27]).unwrap();
        let scaled = upscale(&flat, 3, InterpolationKind::Bilinear);
        assert!(scaled.data.iter().all(|&sample| sample == 42));
    }

    #[test]
    fn bilinear_rows_are_monotonic_over_a_gradient() {
        let src = PixelBuffer::from_raw(4, 1, 1, vec![0, 60, 120, 180]).unwrap();
        let dst = upscale(&src, 4, InterpolationKind::Bilinear);
        let row = dst.row(0);
        assert!(row.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(row[0], 0);
        assert_eq!(row[15], 180);
    }
}
