// THEORY:
// This file is the main entry point for the `mosaic_fusion` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API that will be exposed to external consumers (like a capture
// orchestrator).
//
// The primary goal is to export the `MosaicPipeline` (and its parallel
// sibling) with their associated data structures (`PipelineConfig`,
// `PipelineError`, `CellSource`, etc.) as the clean, high-level interface
// for the whole engine. The algorithmic internals (`core_modules`) stay
// addressable for callers that want to drive the fusion accumulator or the
// compositor directly, but the pipelines are the intended surface.

pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;
