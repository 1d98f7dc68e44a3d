pub mod builder;

use std::borrow::Cow;

use image::GrayImage;
use tracing::{debug, info};

use crate::{
    algorithms::enhance,
    config::Enhancements,
    error::Result,
    graph::Graph,
    traits::{Binarizer, GraphBuilder, ImagePreprocessor, Skeletonizer},
    types::{BinaryMask, RasterImage},
};

/// Raster to wire graph: enhance, preprocess, binarize, thin, walk.
pub struct Pipeline {
    enhancements: Enhancements,
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    binarizer: Box<dyn Binarizer>,
    skeletonizer: Box<dyn Skeletonizer>,
    graph_builder: Box<dyn GraphBuilder>,
}

/// Intermediate products of one pipeline run, kept for debugging and previews.
pub struct PipelineTrace {
    pub gray: GrayImage,
    pub mask: BinaryMask,
    pub skeleton: BinaryMask,
    pub graph: Graph,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        enhancements: Enhancements,
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        binarizer: Box<dyn Binarizer>,
        skeletonizer: Box<dyn Skeletonizer>,
        graph_builder: Box<dyn GraphBuilder>,
    ) -> Self {
        Self {
            enhancements,
            preprocessors,
            binarizer,
            skeletonizer,
            graph_builder,
        }
    }

    /// Build the wire graph of an RGBA raster.
    pub fn process(&self, raster: &RasterImage) -> Result<Graph> {
        Ok(self.process_traced(raster)?.graph)
    }

    /// Build the wire graph of an already-grayscale page. Raster enhancements are skipped.
    pub fn process_gray(&self, gray: &GrayImage) -> Result<Graph> {
        Ok(self.run(gray.clone())?.graph)
    }

    /// Like [`Pipeline::process`] but also returns every intermediate buffer.
    pub fn process_traced(&self, raster: &RasterImage) -> Result<PipelineTrace> {
        raster.validate()?;
        let enhanced = if self.enhancements.is_identity() {
            Cow::Borrowed(raster)
        } else {
            Cow::Owned(enhance(raster, &self.enhancements)?)
        };
        self.run(enhanced.to_gray()?)
    }

    fn run(&self, mut gray: GrayImage) -> Result<PipelineTrace> {
        for preprocessor in &self.preprocessors {
            gray = preprocessor.preprocess(&gray)?;
        }

        let mask = self.binarizer.binarize(&gray)?;
        let skeleton = self.skeletonizer.thin(mask.clone());
        debug!(
            ink = mask.count(),
            skeleton = skeleton.count(),
            "thinned"
        );

        let graph = self.graph_builder.build(&skeleton, Some(&gray));
        info!(
            width = graph.width,
            height = graph.height,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "wire graph built"
        );
        Ok(PipelineTrace { gray, mask, skeleton, graph })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: enhancements {}, {} preprocessors, binarizer, skeletonizer, graph builder",
            if self.enhancements.is_identity() { "off" } else { "on" },
            self.preprocessors.len(),
        )
    }
}
