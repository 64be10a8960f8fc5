// THEORY:
// The `PixelBuffer` module holds the fundamental data containers of the mosaic
// engine. Everything downstream (masking, fusion, compositing) operates on
// these buffers, so they stay deliberately "dumb": explicit geometry, a flat
// byte vector, and nothing else.
//
// Key architectural principles:
// 1.  **Explicit geometry**: width, height and channel count are carried on the
//     buffer itself. No stage ever guesses a stride; `row stride = width ×
//     channels` is the single packing rule for the whole crate.
// 2.  **Two precisions, one shape**: `PixelBuffer` is the 8-bit interchange
//     format; `WidePixelBuffer` is the 16-bit intermediate used while summing
//     a stack of captures, where 8-bit samples would overflow. Widening and
//     narrowing are the only conversions, and narrowing saturates: a fused
//     value can clamp at white but never wrap around to black.
// 3.  **Loads can fail, buffers cannot lie**: the image source collaborator
//     either produces a well-formed buffer or nothing. `CellSource` makes that
//     explicit (`Loaded(buffer)` or `Missing`), and both stages thread it
//     through instead of testing for emptiness.

pub mod pixel_buffer {
    pub type Byte = u8;
    pub type WideSample = u16;

    /// An 8-bit, row-major, tightly packed rectangular grid of pixel samples.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PixelBuffer {
        /// The width of the buffer in pixels.
        pub width: u32,
        /// The height of the buffer in pixels.
        pub height: u32,
        /// Samples per pixel (1 = gray, 3 = RGB, 4 = RGBA).
        pub channels: u32,
        /// The flattened sample data, `width * height * channels` bytes.
        pub data: Vec<Byte>,
    }

    impl PixelBuffer {
        /// Creates a zero-filled (black) buffer.
        pub fn new(width: u32, height: u32, channels: u32) -> Self {
            let len = width as usize * height as usize * channels as usize;
            Self {
                width,
                height,
                channels,
                data: vec![0; len],
            }
        }

        /// Wraps raw bytes, or `None` if the length does not match the geometry.
        pub fn from_raw(width: u32, height: u32, channels: u32, data: Vec<Byte>) -> Option<Self> {
            if data.len() != width as usize * height as usize * channels as usize {
                return None;
            }
            Some(Self {
                width,
                height,
                channels,
                data,
            })
        }

        /// Bytes per row.
        pub fn row_stride(&self) -> usize {
            self.width as usize * self.channels as usize
        }

        /// The samples of row `y`.
        pub fn row(&self, y: u32) -> &[Byte] {
            let stride = self.row_stride();
            let start = y as usize * stride;
            &self.data[start..start + stride]
        }

        /// The samples of row `y`, mutably.
        pub fn row_mut(&mut self, y: u32) -> &mut [Byte] {
            let stride = self.row_stride();
            let start = y as usize * stride;
            &mut self.data[start..start + stride]
        }

        /// The samples of the pixel at `(x, y)`.
        pub fn pixel(&self, x: u32, y: u32) -> &[Byte] {
            let channels = self.channels as usize;
            let start = (y as usize * self.width as usize + x as usize) * channels;
            &self.data[start..start + channels]
        }

        /// Lifts every sample into the widened precision.
        pub fn widen(&self) -> WidePixelBuffer {
            WidePixelBuffer {
                width: self.width,
                height: self.height,
                channels: self.channels,
                data: self.data.iter().map(|&sample| sample as WideSample).collect(),
            }
        }
    }

    /// A 16-bit buffer with the same packing rule as `PixelBuffer`. Used as the
    /// accumulation and fused-result precision.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct WidePixelBuffer {
        /// The width of the buffer in pixels.
        pub width: u32,
        /// The height of the buffer in pixels.
        pub height: u32,
        /// Samples per pixel (1 = gray, 3 = RGB, 4 = RGBA).
        pub channels: u32,
        /// The flattened sample data, `width * height * channels` entries.
        pub data: Vec<WideSample>,
    }

    impl WidePixelBuffer {
        /// Creates a zero-filled wide buffer.
        pub fn new(width: u32, height: u32, channels: u32) -> Self {
            let len = width as usize * height as usize * channels as usize;
            Self {
                width,
                height,
                channels,
                data: vec![0; len],
            }
        }

        /// Narrows back to 8 bits, clamping anything above 255 to 255.
        pub fn narrow_saturating(&self) -> PixelBuffer {
            PixelBuffer {
                width: self.width,
                height: self.height,
                channels: self.channels,
                data: self
                    .data
                    .iter()
                    .map(|&sample| sample.min(Byte::MAX as WideSample) as Byte)
                    .collect(),
            }
        }
    }

    /// The outcome of asking the image source collaborator for one capture.
    ///
    /// A capture that fails to decode is `Missing`, never a malformed buffer.
    /// Both pipeline stages consume this directly: the fusion accumulator skips
    /// `Missing` captures (they still count toward the declared group length),
    /// and the compositor leaves the canvas baseline in place for a `Missing`
    /// cell.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CellSource {
        Loaded(PixelBuffer),
        Missing,
    }

    impl CellSource {
        pub fn as_loaded(&self) -> Option<&PixelBuffer> {
            match self {
                CellSource::Loaded(buffer) => Some(buffer),
                CellSource::Missing => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel_buffer::*;

    #[test]
    fn new_buffer_is_black() {
        let buffer = PixelBuffer::new(4, 3, 3);
        assert_eq!(buffer.data.len(), 36);
        assert!(buffer.data.iter().all(|&sample| sample == 0));
    }

    #[test]
    fn from_raw_rejects_bad_length() {
        assert!(PixelBuffer::from_raw(2, 2, 3, vec![0; 11]).is_none());
        assert!(PixelBuffer::from_raw(2, 2, 3, vec![0; 12]).is_some());
    }

    #[test]
    fn row_and_pixel_indexing() {
        let data: Vec<u8> = (0..24).collect();
        let buffer = PixelBuffer::from_raw(4, 2, 3, data).unwrap();
        assert_eq!(buffer.row(1), &(12..24).collect::<Vec<u8>>()[..]);
        assert_eq!(buffer.pixel(2, 1), &[18, 19, 20]);
    }

    #[test]
    fn narrow_saturates_instead_of_wrapping() {
        let wide = WidePixelBuffer {
            width: 2,
            height: 1,
            channels: 1,
            data: vec![255, 256],
        };
        assert_eq!(wide.narrow_saturating().data, vec![255, 255]);
    }

    #[test]
    fn widen_then_narrow_is_identity() {
        let buffer = PixelBuffer::from_raw(2, 1, 2, vec![0, 1, 254, 255]).unwrap();
        assert_eq!(buffer.widen().narrow_saturating(), buffer);
    }
}
