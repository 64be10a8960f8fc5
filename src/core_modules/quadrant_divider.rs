// THEORY:
// The `quadrant_divider` is the producer side of the mosaic flow and the
// inverse of the compositor: it slices one full capture into
// `division_factor²` tiles in row-major order, so that each tile can be fused
// against the matching tiles of other captures and later placed back by the
// same index. Dimensions rarely divide evenly; rather than dropping pixels or
// padding, the last column and last row of tiles absorb the remainder, which
// is why the compositor copies source-sized regions instead of nominal ones.

use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("cannot split a {width}x{height} image into a {division_factor}x{division_factor} grid")]
    TooFine {
        width: u32,
        height: u32,
        division_factor: u32,
    },
}

/// Splits a capture into `division_factor²` row-major tiles. Every tile is
/// nominally `width / d × height / d`; tiles in the last column and last row
/// are widened and heightened by the division remainders.
pub fn split(buffer: &PixelBuffer, division_factor: u32) -> Result<Vec<PixelBuffer>, SplitError> {
    if division_factor == 0 || buffer.width < division_factor || buffer.height < division_factor {
        return Err(SplitError::TooFine {
            width: buffer.width,
            height: buffer.height,
            division_factor,
        });
    }

    let quadrant_width = buffer.width / division_factor;
    let remainder_width = buffer.width % division_factor;
    let quadrant_height = buffer.height / division_factor;
    let remainder_height = buffer.height % division_factor;

    let mut tiles = Vec::with_capacity((division_factor * division_factor) as usize);
    for row in 0..division_factor {
        for col in 0..division_factor {
            let left = col * quadrant_width;
            let top = row * quadrant_height;
            let width = quadrant_width
                + if col == division_factor - 1 {
                    remainder_width
                } else {
                    0
                };
            let height = quadrant_height
                + if row == division_factor - 1 {
                    remainder_height
                } else {
                    0
                };
            tiles.push(extract(buffer, left, top, width, height));
        }
    }
    Ok(tiles)
}

/// Copies a rectangular region out of the capture.
fn extract(buffer: &PixelBuffer, left: u32, top: u32, width: u32, height: u32) -> PixelBuffer {
    let channels = buffer.channels as usize;
    let mut tile = PixelBuffer::new(width, height, buffer.channels);
    let src_start = left as usize * channels;
    let src_len = width as usize * channels;
    for y in 0..height {
        let src_row = &buffer.row(top + y)[src_start..src_start + src_len];
        tile.row_mut(y).copy_from_slice(src_row);
    }
    tile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::compositor::QuadrantCompositor;
    use crate::core_modules::grid::GridLayout;
    use crate::core_modules::pixel_buffer::pixel_buffer::CellSource;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let data = (0..width * height).map(|i| (i % 251) as u8).collect();
        PixelBuffer::from_raw(width, height, 1, data).unwrap()
    }

    #[test]
    fn even_split_produces_uniform_tiles() {
        let tiles = split(&gradient(8, 6), 2).unwrap();
        assert_eq!(tiles.len(), 4);
        for tile in &tiles {
            assert_eq!((tile.width, tile.height), (4, 3));
        }
    }

    #[test]
    fn last_row_and_column_absorb_the_remainder() {
        let tiles = split(&gradient(5, 5), 2).unwrap();
        assert_eq!((tiles[0].width, tiles[0].height), (2, 2));
        assert_eq!((tiles[1].width, tiles[1].height), (3, 2)); // last column
        assert_eq!((tiles[2].width, tiles[2].height), (2, 3)); // last row
        assert_eq!((tiles[3].width, tiles[3].height), (3, 3)); // both
    }

    #[test]
    fn tiles_are_row_major_and_content_preserving() {
        let source = gradient(6, 6);
        let tiles = split(&source, 3).unwrap();
        // Tile at grid (1, 2) covers columns 4..6 of rows 2..4.
        let tile = &tiles[5];
        assert_eq!(tile.pixel(0, 0), source.pixel(4, 2));
        assert_eq!(tile.pixel(1, 1), source.pixel(5, 3));
    }

    #[test]
    fn splitting_finer_than_the_image_fails() {
        assert!(matches!(
            split(&gradient(3, 8), 4),
            Err(SplitError::TooFine { .. })
        ));
        assert!(matches!(
            split(&gradient(8, 8), 0),
            Err(SplitError::TooFine { .. })
        ));
    }

    #[test]
    fn evenly_divided_tiles_composite_back_to_the_source() {
        let source = gradient(8, 8);
        let tiles = split(&source, 2).unwrap();
        let layout = GridLayout::new(2, 4, 4, 1).unwrap();
        let cells: Vec<CellSource> = tiles.into_iter().map(CellSource::Loaded).collect();
        let canvas = QuadrantCompositor::with_channels(layout, 1)
            .compose(&cells)
            .unwrap();
        assert_eq!(canvas, source);
    }
}
