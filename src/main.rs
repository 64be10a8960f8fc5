// This file is an example of how to use the `mosaic_fusion` library.
// The main library entry point is `src/lib.rs`.

use mosaic_fusion::pipeline::{
    CellSource, MosaicPipeline, PipelineConfig, PipelineError, PixelBuffer,
};

fn solid_quadrant(width: u32, height: u32, color: [u8; 3]) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&color);
    }
    PixelBuffer::from_raw(width, height, 3, data).expect("geometry and data length agree")
}

fn main() -> Result<(), PipelineError> {
    env_logger::init();
    println!("Mosaic Fusion Engine - Example Runner");

    // A 2x2 mosaic of 100x100 cells: red, green, blue and yellow quadrants,
    // each "captured" twice so the fusion stage has something to average.
    let config = PipelineConfig {
        division_factor: 2,
        scale_factor: 1,
        quadrant_width: 100,
        quadrant_height: 100,
    };
    let pipeline = MosaicPipeline::new(config)?;

    let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]];
    let cell_groups: Vec<Vec<CellSource>> = colors
        .into_iter()
        .map(|color| {
            vec![
                CellSource::Loaded(solid_quadrant(100, 100, color)),
                CellSource::Loaded(solid_quadrant(100, 100, color)),
            ]
        })
        .collect();

    let fused_cells = pipeline.fuse_cells(&cell_groups)?;
    let canvas = pipeline.compose(&fused_cells)?;
    println!(
        "Assembled a {}x{} canvas from {} fused cells.",
        canvas.width,
        canvas.height,
        fused_cells.len()
    );

    let destination = std::env::temp_dir().join("mosaic_fusion_example.png");
    let destination = destination.to_string_lossy();
    mosaic_fusion::core_modules::utils::image_helper::image_helper::save(&canvas, &destination)
        .map_err(|source| PipelineError::Sink {
            path: destination.clone().into_owned(),
            source,
        })?;
    println!("Canvas written to {destination}");
    Ok(())
}
