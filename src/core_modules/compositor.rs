// THEORY:
// The `QuadrantCompositor` is the placement half of the engine. Given one
// image per grid cell, it writes each into its addressed region of a single
// canvas sized from the grid geometry. It never looks at a cell's
// provenance (a raw capture and a fused stack composite identically), only
// at its final pixels and its row-major index.
//
// Key architectural principles:
// 1.  **Zero baseline**: the canvas starts black. A cell whose image is
//     missing simply leaves its region at the baseline, a hole in the
//     mosaic rather than an error. Degraded output beats no output here.
// 2.  **Source-sized placement**: a cell's image is copied at the image's own
//     dimensions, not clipped or stretched to the nominal cell size. An
//     undersized image leaves a black border inside its cell; an oversized
//     one runs into the neighbouring cell's region. Upstream guarantees
//     matching sizes in the normal flow, and the mismatch behavior is part
//     of the inherited contract.
// 3.  **Fatal only at the edges**: the compositor fails on an empty cell
//     list, on more cells than the grid can address, and on an image that
//     would spill past the canvas itself. Everything milder degrades.

use crate::core_modules::grid::GridLayout;
use crate::core_modules::pixel_buffer::pixel_buffer::{CellSource, PixelBuffer};
use thiserror::Error;

/// Canvas pixel format: 8-bit RGB.
pub const CANVAS_CHANNELS: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositeError {
    /// No cells were supplied at all.
    #[error("cannot composite an empty cell list")]
    EmptyCellList,
    /// More cell images than the grid has addresses for.
    #[error("{supplied} cell images supplied for a grid of {capacity} cells")]
    TooManyCells { supplied: usize, capacity: usize },
    /// A cell's image would extend past the canvas boundary.
    #[error(
        "cell {index}: a {width}x{height} image at offset ({col_offset}, {row_offset}) \
         exceeds the {canvas_width}x{canvas_height} canvas"
    )]
    PlacementOutOfBounds {
        index: usize,
        width: u32,
        height: u32,
        col_offset: u32,
        row_offset: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
    /// A cell's image does not share the canvas pixel format.
    #[error("cell {index}: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },
}

/// Places per-cell images into a mosaic canvas addressed by row-major index.
pub struct QuadrantCompositor {
    layout: GridLayout,
    channels: u32,
}

impl QuadrantCompositor {
    /// A compositor producing the default RGB canvas.
    pub fn new(layout: GridLayout) -> Self {
        Self::with_channels(layout, CANVAS_CHANNELS)
    }

    /// A compositor for a non-default channel count (e.g. grayscale tiles).
    pub fn with_channels(layout: GridLayout, channels: u32) -> Self {
        Self { layout, channels }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Builds the canvas and copies every present cell image into its
    /// addressed region. `cells[i]` is placed at the grid address of index
    /// `i`; the list may be shorter than the grid, and `Missing` entries
    /// leave their region at the zero baseline.
    pub fn compose(&self, cells: &[CellSource]) -> Result<PixelBuffer, CompositeError> {
        if cells.is_empty() {
            return Err(CompositeError::EmptyCellList);
        }
        if cells.len() > self.layout.cell_count() {
            return Err(CompositeError::TooManyCells {
                supplied: cells.len(),
                capacity: self.layout.cell_count(),
            });
        }

        let mut canvas = PixelBuffer::new(
            self.layout.canvas_width(),
            self.layout.canvas_height(),
            self.channels,
        );
        for (index, source) in cells.iter().enumerate() {
            let Some(quadrant) = source.as_loaded() else {
                continue;
            };
            self.place(&mut canvas, index, quadrant)?;
        }
        Ok(canvas)
    }

    /// Copies one quadrant image into the canvas at its cell's offset, using
    /// the image's own dimensions.
    fn place(
        &self,
        canvas: &mut PixelBuffer,
        index: usize,
        quadrant: &PixelBuffer,
    ) -> Result<(), CompositeError> {
        if quadrant.channels != self.channels {
            return Err(CompositeError::ChannelMismatch {
                index,
                expected: self.channels,
                actual: quadrant.channels,
            });
        }

        let (col_offset, row_offset) = self.layout.placement_offset(index);
        if col_offset + quadrant.width > canvas.width
            || row_offset + quadrant.height > canvas.height
        {
            return Err(CompositeError::PlacementOutOfBounds {
                index,
                width: quadrant.width,
                height: quadrant.height,
                col_offset,
                row_offset,
                canvas_width: canvas.width,
                canvas_height: canvas.height,
            });
        }

        let channels = self.channels as usize;
        let dst_start = col_offset as usize * channels;
        for y in 0..quadrant.height {
            let src_row = quadrant.row(y);
            let dst_row = canvas.row_mut(row_offset + y);
            dst_row[dst_start..dst_start + src_row.len()].copy_from_slice(src_row);
        }
        Ok(())
    }
}
