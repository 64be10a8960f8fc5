// THEORY:
// The `pipeline` module is the top-level API for the mosaic engine. It
// sequences the two stages (masked mean fusion per cell, then quadrant
// compositing across cells) and owns the routing between the core and the
// image source/sink collaborators. The stages stay decoupled: fusion only
// ever sees one cell's capture stack, and the compositor only sees one final
// image per cell, never where it came from.
//
// Failure policy, end to end:
// - Geometry is validated when the pipeline is constructed, before any file
//   is touched.
// - A capture that fails to load is absorbed (`CellSource::Missing`, logged
//   by the loader): for compositing it leaves a hole, for fusion it thins
//   the stack.
// - A cell whose entire stack fails to load is fatal: the invocation aborts
//   without persisting a canvas. A mosaic with a silently averaged-from-
//   nothing cell would be worse than no mosaic.
// - Sink failures surface to the caller; the in-memory result they were
//   persisting is still correct.

use crate::core_modules::compositor::QuadrantCompositor;
use crate::core_modules::fusion;
use crate::core_modules::interpolation::upscale;
use crate::core_modules::quadrant_divider::{self, SplitError};
use crate::core_modules::utils::image_helper::image_helper;
use log::info;
use thiserror::Error;

// Re-export key data structures for the public API.
pub use crate::core_modules::compositor::CompositeError;
pub use crate::core_modules::fusion::FusionError;
pub use crate::core_modules::grid::{CellAddress, GeometryError, GridLayout};
pub use crate::core_modules::interpolation::InterpolationKind;
pub use crate::core_modules::pixel_buffer::pixel_buffer::{
    CellSource, PixelBuffer, WidePixelBuffer,
};

/// Configuration for a mosaic invocation, allowing for tunable geometry.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The grid side length; the mosaic has `division_factor²` cells.
    pub division_factor: u32,
    /// The up-scale multiplier applied to the nominal cell size.
    pub scale_factor: u32,
    /// Nominal per-cell capture width in pixels, before scaling.
    pub quadrant_width: u32,
    /// Nominal per-cell capture height in pixels, before scaling.
    pub quadrant_height: u32,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("fusion failed for cell {index}")]
    Fusion {
        index: usize,
        #[source]
        source: FusionError,
    },
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("expected one quadrant path per cell group: {groups} groups, {paths} paths")]
    QuadrantPathCount { groups: usize, paths: usize },
    #[error("failed to persist image to {path}")]
    Sink {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("fusion worker pool unavailable: {0}")]
    WorkerPool(&'static str),
}

/// The main, top-level struct for the mosaic engine.
pub struct MosaicPipeline {
    layout: GridLayout,
}

impl MosaicPipeline {
    /// Validates the declared geometry and builds a pipeline. This is the
    /// only constructor; a `MosaicPipeline` in hand means the canvas size is
    /// sane.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let layout = GridLayout::new(
            config.division_factor,
            config.quadrant_width,
            config.quadrant_height,
            config.scale_factor,
        )?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// The full assembly flow: per cell, load the capture stack, fuse it,
    /// persist the fused quadrant to its per-cell path, then composite every
    /// fused cell into the canvas and persist that to one or two
    /// destinations. Returns the canvas.
    ///
    /// Aborts on the first cell whose stack yields nothing to fuse.
    pub fn assemble_from_files(
        &self,
        cell_groups: &[Vec<String>],
        quadrant_paths: &[String],
        canvas_path: &str,
        secondary_canvas_path: Option<&str>,
    ) -> Result<PixelBuffer, PipelineError> {
        if cell_groups.len() != quadrant_paths.len() {
            return Err(PipelineError::QuadrantPathCount {
                groups: cell_groups.len(),
                paths: quadrant_paths.len(),
            });
        }

        let mut fused_cells = Vec::with_capacity(cell_groups.len());
        for (index, (group_paths, quadrant_path)) in
            cell_groups.iter().zip(quadrant_paths).enumerate()
        {
            let group: Vec<CellSource> =
                group_paths.iter().map(|path| image_helper::load(path)).collect();
            let fused = fusion::fuse_group(&group)
                .map_err(|source| PipelineError::Fusion { index, source })?;
            let quadrant = fused.narrow_saturating();
            image_helper::save(&quadrant, quadrant_path).map_err(|source| {
                PipelineError::Sink {
                    path: quadrant_path.clone(),
                    source,
                }
            })?;
            info!("mean fusion completed for {quadrant_path}");
            fused_cells.push(CellSource::Loaded(quadrant));
        }

        self.finish_canvas(&fused_cells, canvas_path, secondary_canvas_path)
    }

    /// The fusion-less flow: one already-final image per cell, loaded and
    /// composited directly. Unloadable cells become holes.
    pub fn compose_from_files(
        &self,
        quadrant_paths: &[String],
        canvas_path: &str,
        secondary_canvas_path: Option<&str>,
    ) -> Result<PixelBuffer, PipelineError> {
        let cells: Vec<CellSource> =
            quadrant_paths.iter().map(|path| image_helper::load(path)).collect();
        self.finish_canvas(&cells, canvas_path, secondary_canvas_path)
    }

    /// Fusion stage over in-memory capture stacks, one stack per cell.
    pub fn fuse_cells(
        &self,
        cell_groups: &[Vec<CellSource>],
    ) -> Result<Vec<CellSource>, PipelineError> {
        let mut fused_cells = Vec::with_capacity(cell_groups.len());
        for (index, group) in cell_groups.iter().enumerate() {
            let fused = fusion::fuse_group(group)
                .map_err(|source| PipelineError::Fusion { index, source })?;
            fused_cells.push(CellSource::Loaded(fused.narrow_saturating()));
        }
        Ok(fused_cells)
    }

    /// Compositor stage over in-memory per-cell images.
    pub fn compose(&self, cells: &[CellSource]) -> Result<PixelBuffer, PipelineError> {
        Ok(QuadrantCompositor::new(self.layout).compose(cells)?)
    }

    /// Producer side of the flow: up-scales a full capture by the layout's
    /// scale factor and splits it into `division_factor²` row-major tiles,
    /// one per cell.
    pub fn prepare_capture(
        &self,
        capture: &PixelBuffer,
        interpolation: InterpolationKind,
    ) -> Result<Vec<PixelBuffer>, PipelineError> {
        let scaled = upscale(capture, self.layout.scale_factor, interpolation);
        Ok(quadrant_divider::split(&scaled, self.layout.division_factor)?)
    }

    pub(crate) fn finish_canvas(
        &self,
        cells: &[CellSource],
        canvas_path: &str,
        secondary_canvas_path: Option<&str>,
    ) -> Result<PixelBuffer, PipelineError> {
        let canvas = QuadrantCompositor::new(self.layout).compose(cells)?;
        for path in [Some(canvas_path), secondary_canvas_path].into_iter().flatten() {
            image_helper::save(&canvas, path).map_err(|source| PipelineError::Sink {
                path: path.to_owned(),
                source,
            })?;
            info!("mosaic canvas written to {path}");
        }
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> PipelineConfig {
        PipelineConfig {
            division_factor: 2,
            scale_factor: 1,
            quadrant_width: 4,
            quadrant_height: 4,
        }
    }

    fn solid(value: u8) -> PixelBuffer {
        PixelBuffer::from_raw(4, 4, 3, vec![value; 48]).unwrap()
    }

    fn test_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join("mosaic_fusion_pipeline").join(name);
        std::fs::create_dir_all(&dir).expect("error creating test dir");
        dir.to_string_lossy().into_owned()
    }

    #[test]
    fn geometry_is_validated_before_any_io() {
        let result = MosaicPipeline::new(PipelineConfig {
            division_factor: 0,
            ..config()
        });
        assert!(matches!(result, Err(PipelineError::Geometry(_))));
    }

    #[test]
    fn fuse_cells_aborts_on_an_empty_stack() {
        let pipeline = MosaicPipeline::new(config()).unwrap();
        let groups = vec![
            vec![CellSource::Loaded(solid(80))],
            vec![CellSource::Missing, CellSource::Missing],
        ];
        let result = pipeline.fuse_cells(&groups);
        assert!(matches!(
            result,
            Err(PipelineError::Fusion {
                index: 1,
                source: FusionError::EmptyGroup
            })
        ));
    }

    #[test]
    fn fused_cells_compose_into_the_canvas() {
        let pipeline = MosaicPipeline::new(config()).unwrap();
        let groups = vec![
            vec![
                CellSource::Loaded(solid(100)),
                CellSource::Loaded(solid(200)),
            ],
            vec![CellSource::Loaded(solid(60)), CellSource::Missing],
        ];
        let cells = pipeline.fuse_cells(&groups).unwrap();
        let canvas = pipeline.compose(&cells).unwrap();
        assert_eq!(canvas.pixel(0, 0), [150, 150, 150]); // (100 + 200) / 2
        assert_eq!(canvas.pixel(4, 0), [30, 30, 30]); // 60 / 2, missing capture counted
        assert_eq!(canvas.pixel(0, 4), [0, 0, 0]); // unsupplied cells stay holes
    }

    #[test]
    fn assemble_from_files_builds_quadrants_and_canvas() {
        let dir = test_dir("assemble");
        let capture_a = format!("{dir}/capture_a.png");
        let capture_b = format!("{dir}/capture_b.png");
        image_helper::save(&solid(100), &capture_a).unwrap();
        image_helper::save(&solid(200), &capture_b).unwrap();

        let cell_groups = vec![
            vec![capture_a.clone(), capture_b.clone()],
            vec![capture_a.clone(), format!("{dir}/never_captured.png")],
        ];
        let quadrant_paths = vec![format!("{dir}/quadrant_1.png"), format!("{dir}/quadrant_2.png")];
        let canvas_path = format!("{dir}/canvas.png");
        let secondary_path = format!("{dir}/canvas_copy.png");

        let pipeline = MosaicPipeline::new(config()).unwrap();
        let canvas = pipeline
            .assemble_from_files(
                &cell_groups,
                &quadrant_paths,
                &canvas_path,
                Some(&secondary_path),
            )
            .unwrap();

        assert_eq!(canvas.width, 8);
        assert_eq!(canvas.height, 8);
        assert_eq!(canvas.pixel(0, 0), [150, 150, 150]);
        assert_eq!(canvas.pixel(4, 0), [50, 50, 50]); // 100 / 2, the lost capture still divides
        for path in quadrant_paths.iter().chain([&canvas_path, &secondary_path]) {
            assert!(Path::new(path).exists(), "{path} was not written");
        }
    }

    #[test]
    fn empty_stack_aborts_before_the_canvas_is_written() {
        let dir = test_dir("abort");
        let cell_groups = vec![vec![format!("{dir}/never_captured.png")]];
        let quadrant_paths = vec![format!("{dir}/quadrant_1.png")];
        let canvas_path = format!("{dir}/canvas.png");
        let _ = std::fs::remove_file(&canvas_path);

        let pipeline = MosaicPipeline::new(config()).unwrap();
        let result =
            pipeline.assemble_from_files(&cell_groups, &quadrant_paths, &canvas_path, None);
        assert!(matches!(result, Err(PipelineError::Fusion { index: 0, .. })));
        assert!(!Path::new(&canvas_path).exists());
    }

    #[test]
    fn compose_from_files_leaves_holes_for_unloadable_cells() {
        let dir = test_dir("compose");
        let quadrant = format!("{dir}/quadrant_1.png");
        image_helper::save(&solid(90), &quadrant).unwrap();

        let pipeline = MosaicPipeline::new(config()).unwrap();
        let canvas = pipeline
            .compose_from_files(
                &[quadrant, format!("{dir}/gone.png")],
                &format!("{dir}/canvas.png"),
                None,
            )
            .unwrap();
        assert_eq!(canvas.pixel(0, 0), [90, 90, 90]);
        assert_eq!(canvas.pixel(4, 0), [0, 0, 0]);
    }

    #[test]
    fn quadrant_path_count_must_match_groups() {
        let pipeline = MosaicPipeline::new(config()).unwrap();
        let result = pipeline.assemble_from_files(
            &[vec!["a.png".to_owned()]],
            &[],
            "canvas.png",
            None,
        );
        assert!(matches!(
            result,
            Err(PipelineError::QuadrantPathCount { groups: 1, paths: 0 })
        ));
    }

    #[test]
    fn prepare_capture_scales_then_splits() {
        let pipeline = MosaicPipeline::new(config()).unwrap();
        let capture = PixelBuffer::from_raw(4, 4, 3, vec![10; 48]).unwrap();
        let tiles = pipeline
            .prepare_capture(&capture, InterpolationKind::Nearest)
            .unwrap();
        assert_eq!(tiles.len(), 4);
        for tile in &tiles {
            assert_eq!((tile.width, tile.height), (2, 2));
        }
    }
}
