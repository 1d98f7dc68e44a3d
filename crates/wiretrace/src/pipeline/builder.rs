use crate::{
    algorithms::{
        AdaptiveBinarizer, AdaptiveCleanPreprocessor, DeskewPreprocessor,
        MedianDenoisePreprocessor, SkeletonGraphBuilder, ZhangSuenThinner,
    },
    config::{Enhancements, ExtractionConfig, Preprocess},
    pipeline::Pipeline,
    traits::{Binarizer, GraphBuilder, ImagePreprocessor, Skeletonizer},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    enhancements: Enhancements,
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    binarizer: Option<Box<dyn Binarizer>>,
    skeletonizer: Option<Box<dyn Skeletonizer>>,
    graph_builder: Option<Box<dyn GraphBuilder>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            enhancements: Enhancements::default(),
            preprocessors: Vec::new(),
            binarizer: None,
            skeletonizer: None,
            graph_builder: None,
        }
    }

    /// Builder preloaded with every stage the config describes.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let builder = config
            .preprocess
            .iter()
            .fold(Self::new(), |builder, &step| builder.with_preprocess(step));
        builder
            .with_enhancements(config.enhance.clone())
            .set_binarizer(AdaptiveBinarizer::new(config.binarize.clone()))
            .set_graph_builder(SkeletonGraphBuilder::new(config.graph.clone()))
    }

    pub fn with_enhancements(mut self, enhancements: Enhancements) -> Self {
        self.enhancements = enhancements;
        self
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the binarizer (replaces any existing one)
    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: Binarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    /// Set the skeletonizer (replaces any existing one)
    pub fn set_skeletonizer<S>(mut self, skeletonizer: S) -> Self
    where
        S: Skeletonizer + 'static,
    {
        self.skeletonizer = Some(Box::new(skeletonizer));
        self
    }

    /// Set the graph builder (replaces any existing one)
    pub fn set_graph_builder<G>(mut self, graph_builder: G) -> Self
    where
        G: GraphBuilder + 'static,
    {
        self.graph_builder = Some(Box::new(graph_builder));
        self
    }

    /// Append the preprocessor for one named cleanup step
    pub fn with_preprocess(self, step: Preprocess) -> Self {
        match step {
            Preprocess::Denoise => self.with_denoise(),
            Preprocess::AdaptiveClean => self.with_adaptive_clean(),
            Preprocess::Deskew => self.with_deskew(),
        }
    }

    pub fn with_denoise(self) -> Self {
        self.add_preprocessor(MedianDenoisePreprocessor::default())
    }

    pub fn with_deskew(self) -> Self {
        self.add_preprocessor(DeskewPreprocessor::default())
    }

    pub fn with_adaptive_clean(self) -> Self {
        self.add_preprocessor(AdaptiveCleanPreprocessor::default())
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let binarizer = self
            .binarizer
            .unwrap_or_else(|| Box::new(AdaptiveBinarizer::default()));
        let skeletonizer = self
            .skeletonizer
            .unwrap_or_else(|| Box::new(ZhangSuenThinner::default()));
        let graph_builder = self
            .graph_builder
            .unwrap_or_else(|| Box::new(SkeletonGraphBuilder::default()));

        Pipeline::new(
            self.enhancements,
            self.preprocessors,
            binarizer,
            skeletonizer,
            graph_builder,
        )
    }

    /// Pipeline for a full extraction config
    pub fn build_from_config(config: &ExtractionConfig) -> Pipeline {
        Self::from_config(config).build()
    }

    /// Denoise, deskew, then the default stages
    pub fn build_scanned() -> Pipeline {
        Self::new().with_denoise().with_deskew().build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
