// THEORY:
// The `grid` module owns every piece of mosaic arithmetic. The quadrant grid
// is addressed exactly one way in this crate: a row-major index `i` over
// `division_factor²` cells, decomposed as `row = i / division_factor`,
// `col = i % division_factor`. This module is the only place that rule is
// written down. The compositor, the divider and both pipelines all ask a
// `GridLayout` for addresses and offsets instead of re-deriving them.
//
// Key architectural principles:
// 1.  **Validation before I/O**: a `GridLayout` cannot be constructed from
//     degenerate parameters. Any zero factor or dimension would produce an
//     empty canvas, so it is rejected up front, before a single file is read.
// 2.  **Nominal vs actual geometry**: the layout describes the *nominal* cell
//     size (`quadrant_width × scale_factor` by `quadrant_height ×
//     scale_factor`). Placement regions are computed from it, but the
//     compositor copies each source image at the image's own size. The
//     layout only says where a cell starts, never how big its image is.

use thiserror::Error;

/// A cell's position in the quadrant grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    /// The row index of the cell, `index / division_factor`.
    pub row: u32,
    /// The column index of the cell, `index % division_factor`.
    pub col: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error(
        "mosaic geometry must be positive: division_factor={division_factor}, \
         quadrant_width={quadrant_width}, quadrant_height={quadrant_height}, \
         scale_factor={scale_factor}"
    )]
    NonPositive {
        division_factor: u32,
        quadrant_width: u32,
        quadrant_height: u32,
        scale_factor: u32,
    },
    #[error("mosaic canvas dimensions overflow: {division_factor} cells of {quadrant_width}x{quadrant_height} at scale {scale_factor}")]
    Oversized {
        division_factor: u32,
        quadrant_width: u32,
        quadrant_height: u32,
        scale_factor: u32,
    },
}

/// The declared geometry of one mosaic: grid side length, nominal per-cell
/// dimensions, and the up-scale multiplier applied to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// The side length of the grid; the mosaic has `division_factor²` cells.
    pub division_factor: u32,
    /// Nominal width of one cell's capture, in pixels, before scaling.
    pub quadrant_width: u32,
    /// Nominal height of one cell's capture, in pixels, before scaling.
    pub quadrant_height: u32,
    /// The interpolation up-scale multiplier applied to the nominal cell size.
    pub scale_factor: u32,
}

impl GridLayout {
    /// Validates the declared geometry. Fails if any parameter is zero or the
    /// resulting canvas would not fit in 32-bit pixel coordinates.
    pub fn new(
        division_factor: u32,
        quadrant_width: u32,
        quadrant_height: u32,
        scale_factor: u32,
    ) -> Result<Self, GeometryError> {
        if division_factor == 0 || quadrant_width == 0 || quadrant_height == 0 || scale_factor == 0
        {
            return Err(GeometryError::NonPositive {
                division_factor,
                quadrant_width,
                quadrant_height,
                scale_factor,
            });
        }

        let fits = division_factor
            .checked_mul(quadrant_width)
            .and_then(|w| w.checked_mul(scale_factor))
            .and_then(|_| division_factor.checked_mul(quadrant_height))
            .and_then(|h| h.checked_mul(scale_factor))
            .is_some();
        if !fits {
            return Err(GeometryError::Oversized {
                division_factor,
                quadrant_width,
                quadrant_height,
                scale_factor,
            });
        }

        Ok(Self {
            division_factor,
            quadrant_width,
            quadrant_height,
            scale_factor,
        })
    }

    /// The number of cells in the grid, `division_factor²`.
    pub fn cell_count(&self) -> usize {
        self.division_factor as usize * self.division_factor as usize
    }

    /// Decomposes a row-major cell index into its grid address.
    pub fn address(&self, index: usize) -> CellAddress {
        CellAddress {
            row: index as u32 / self.division_factor,
            col: index as u32 % self.division_factor,
        }
    }

    /// The scaled width of one nominal cell.
    pub fn scaled_quadrant_width(&self) -> u32 {
        self.quadrant_width * self.scale_factor
    }

    /// The scaled height of one nominal cell.
    pub fn scaled_quadrant_height(&self) -> u32 {
        self.quadrant_height * self.scale_factor
    }

    /// The top-left pixel `(col_offset, row_offset)` of a cell's placement
    /// region on the canvas.
    pub fn placement_offset(&self, index: usize) -> (u32, u32) {
        let address = self.address(index);
        (
            address.col * self.scaled_quadrant_width(),
            address.row * self.scaled_quadrant_height(),
        )
    }

    /// The full canvas width, `division_factor × quadrant_width × scale_factor`.
    pub fn canvas_width(&self) -> u32 {
        self.division_factor * self.scaled_quadrant_width()
    }

    /// The full canvas height, `division_factor × quadrant_height × scale_factor`.
    pub fn canvas_height(&self) -> u32 {
        self.division_factor * self.scaled_quadrant_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_dimensions_scale_with_every_factor() {
        for (d, w, h, s) in [(1, 7, 5, 1), (2, 100, 100, 1), (4, 1008, 756, 2), (3, 16, 9, 4)] {
            let layout = GridLayout::new(d, w, h, s).unwrap();
            assert_eq!(layout.canvas_width(), d * w * s);
            assert_eq!(layout.canvas_height(), d * h * s);
            assert_eq!(layout.cell_count(), (d * d) as usize);
        }
    }

    #[test]
    fn addresses_cover_the_grid_exactly_once() {
        let layout = GridLayout::new(4, 10, 10, 1).unwrap();
        let mut seen = std::collections::HashSet::new();
        for index in 0..layout.cell_count() {
            let address = layout.address(index);
            assert!(address.row < 4 && address.col < 4);
            assert!(seen.insert((address.row, address.col)));
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn placement_offsets_follow_row_major_order() {
        let layout = GridLayout::new(2, 100, 80, 3).unwrap();
        assert_eq!(layout.placement_offset(0), (0, 0));
        assert_eq!(layout.placement_offset(1), (300, 0));
        assert_eq!(layout.placement_offset(2), (0, 240));
        assert_eq!(layout.placement_offset(3), (300, 240));
    }

    #[test]
    fn single_cell_grid_is_valid() {
        let layout = GridLayout::new(1, 640, 480, 2).unwrap();
        assert_eq!(layout.cell_count(), 1);
        assert_eq!(layout.placement_offset(0), (0, 0));
        assert_eq!(layout.canvas_width(), 1280);
        assert_eq!(layout.canvas_height(), 960);
    }

    #[test]
    fn zero_parameters_are_rejected() {
        for (d, w, h, s) in [(0, 1, 1, 1), (1, 0, 1, 1), (1, 1, 0, 1), (1, 1, 1, 0)] {
            assert!(matches!(
                GridLayout::new(d, w, h, s),
                Err(GeometryError::NonPositive { .. })
            ));
        }
    }

    #[test]
    fn overflowing_canvas_is_rejected() {
        assert!(matches!(
            GridLayout::new(u32::MAX, 2, 2, 1),
            Err(GeometryError::Oversized { .. })
        ));
    }
}
