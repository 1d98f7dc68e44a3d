//! # Wire Tracing Library
//!
//! Turns raster images of schematics and wiring diagrams into a graph of
//! strokes, then answers click queries against it: which wire is under the
//! cursor, which net does it belong to, what does the page look like as clean
//! vector paths.
//!
//! ## Core Features
//!
//! - **Trait-based Pipeline**: preprocess, binarize, thin and walk stages can each be swapped
//! - **Wire Graph**: terminals, junctions and junction dots joined by pixel polylines
//! - **Click Tracing**: single wire through pass-through nodes, or the whole connected net
//! - **Content-addressed Cache**: graphs are keyed by pixels and parameters, never rebuilt twice
//! - **Exports**: simplified, axis-snapped SVG and GeoJSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wiretrace::{BuildOptions, Point, RasterImage, TraceOptions, WireEngine};
//!
//! let mut engine = WireEngine::default();
//! let page = RasterImage::open("schematic.png")?;
//! engine.build_graph("page-1", &page, &BuildOptions::default())?;
//!
//! if let Some(wire) = engine.trace_path("page-1", Point::new(120, 48), TraceOptions::default())? {
//!     println!("wire with {} points", wire.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use wiretrace::{Pipeline, RasterImage, algorithms::*, config::BinarizeParams};
//!
//! let pipeline = Pipeline::builder()
//!     .with_deskew()
//!     .add_preprocessor(MedianDenoisePreprocessor { radius: 1 })
//!     .set_binarizer(AdaptiveBinarizer::new(BinarizeParams { bridge_radius: 2, ..Default::default() }))
//!     .build();
//! let graph = pipeline.process(&RasterImage::open("scan.png")?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod config;
pub mod graph;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod trace;
pub mod scan;
pub mod vector;
pub mod cache;
pub mod engine;
pub mod worker;
pub mod io;
pub mod mcp;

// Re-exports for convenience
pub use error::{Result, WireError};
pub use types::{BinaryMask, Point, RasterImage};
pub use config::{BuildOptions, ExtractionConfig, Preprocess, TraceOptions, VectorOptions};
pub use graph::{Edge, Graph, Node, NodeKind};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, PipelineTrace, builder::PipelineBuilder};
pub use trace::Tracer;
pub use scan::{HoughLineFinder, LineSegment, scan_for_line_segment};
pub use vector::{VectorDocument, to_svg};
pub use cache::{GraphCache, GraphKey};
pub use engine::{EngineCommand, EngineResponse, WireEngine};
pub use worker::{EngineOutcome, WorkerHandle};
pub use io::{graph_to_geojson, graph_to_geojson_string};
