use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info};
use ts_rs::TS;

use crate::{
    cache::{CacheStats, CachedGraph, GraphCache, GraphKey},
    config::{BuildOptions, ExtractionConfig, TraceOptions, VectorOptions},
    error::{Result, WireError},
    graph::{Graph, NodeKind},
    io::geojson::graph_to_geojson_string,
    pipeline::builder::PipelineBuilder,
    scan::{HoughLineFinder, LineScanner},
    trace::Tracer,
    types::{Point, RasterImage},
    vector::VectorDocument,
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum EngineCommand {
    /// Build (or fetch from cache) the wire graph of a page
    #[serde(rename = "build_graph")]
    BuildGraph {
        id: String,
        image: RasterImage,
        #[serde(default)]
        options: BuildOptions,
    },

    /// Trace the single wire under a click
    #[serde(rename = "trace_path")]
    TracePath {
        id: String,
        click: Point,
        #[serde(default)]
        options: TraceOptions,
    },

    /// Collect every edge of the net under a click
    #[serde(rename = "trace_component")]
    TraceComponent { id: String, click: Point },

    /// Component, path, pixel scan, then Hough lines: whatever finds something first
    #[serde(rename = "highlight")]
    Highlight {
        id: String,
        click: Point,
        #[serde(default)]
        options: TraceOptions,
    },

    /// Serialize the graph as SVG
    #[serde(rename = "export_vector")]
    ExportVector {
        id: String,
        #[serde(default)]
        options: VectorOptions,
    },

    /// Serialize the graph as a GeoJSON feature collection
    #[serde(rename = "export_geojson")]
    #[strum(serialize = "export_geojson")]
    ExportGeoJson { id: String },
}

impl EngineCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Page the command targets
    pub fn page_id(&self) -> &str {
        match self {
            Self::BuildGraph { id, .. }
            | Self::TracePath { id, .. }
            | Self::TraceComponent { id, .. }
            | Self::Highlight { id, .. }
            | Self::ExportVector { id, .. }
            | Self::ExportGeoJson { id } => id,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BuildGraph { .. } => "Binarize, thin and walk a page raster into a cached wire graph",
            Self::TracePath { .. } => "Follow the wire nearest to a click through pass-through nodes",
            Self::TraceComponent { .. } => "Return every edge polyline connected to the wire nearest to a click",
            Self::Highlight { .. } => "Best-effort highlight: net, then single wire, then a pixel scan, then Hough lines",
            Self::ExportVector { .. } => "Export the page's wire graph as simplified SVG paths",
            Self::ExportGeoJson { .. } => "Export the page's nodes and edges as GeoJSON features",
        }
    }

    /// Get parameter requirements for the command
    pub fn parameters_info(&self) -> Vec<(&'static str, &'static str, bool)> {
        match self {
            Self::BuildGraph { .. } => vec![
                ("id", "Page identifier the graph is cached under", true),
                ("image", "RGBA raster {width, height, data}", true),
                ("options", "{bridge_radius, ignore_text, preprocess, canvas} overrides", false),
            ],
            Self::TracePath { .. } | Self::Highlight { .. } => vec![
                ("id", "Page identifier", true),
                ("click", "Click position {x, y} in image pixels", true),
                ("options", "{stop_at}: stop at the first node", false),
            ],
            Self::TraceComponent { .. } => vec![
                ("id", "Page identifier", true),
                ("click", "Click position {x, y} in image pixels", true),
            ],
            Self::ExportVector { .. } => vec![
                ("id", "Page identifier", true),
                ("options", "{simplify, snap, stroke, stroke_width}", false),
            ],
            Self::ExportGeoJson { .. } => vec![("id", "Page identifier", true)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct BuildSummary {
    pub id: String,
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub nodes: usize,
    pub edges: usize,
    pub terminals: usize,
    pub junctions: usize,
    pub dots: usize,
    /// Served from the cache without rebuilding
    pub cached: bool,
}

impl BuildSummary {
    fn new(id: &str, key: &GraphKey, graph: &Graph, cached: bool) -> Self {
        Self {
            id: id.to_string(),
            key: key.to_string(),
            width: graph.width,
            height: graph.height,
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            terminals: graph.count_kind(NodeKind::Terminal),
            junctions: graph.count_kind(NodeKind::Junction),
            dots: graph.count_kind(NodeKind::Dot),
            cached,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum HighlightSource {
    Component,
    Path,
    Scan,
    Hough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct Highlight {
    pub source: HighlightSource,
    pub paths: Vec<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineResponse {
    GraphBuilt(BuildSummary),
    Path { id: String, path: Option<Vec<Point>> },
    Component { id: String, paths: Option<Vec<Vec<Point>>> },
    Highlight { id: String, highlight: Option<Highlight> },
    Vector { id: String, document: Option<String> },
    GeoJson { id: String, document: Option<String> },
    Error { id: String, message: String },
}

/// A graph built but not yet stored; lets callers decide whether to keep it.
#[derive(Debug)]
pub struct PendingGraph {
    page: String,
    entry: CachedGraph,
}

#[derive(Debug)]
pub enum Prepared {
    Cached(BuildSummary),
    Built(PendingGraph),
}

/// Synchronous wire-extraction engine owning the graph cache.
#[derive(Debug, Default)]
pub struct WireEngine {
    config: ExtractionConfig,
    cache: GraphCache,
    scanner: LineScanner,
    finder: HoughLineFinder,
}

impl WireEngine {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            cache: GraphCache::new(),
            scanner: LineScanner::default(),
            finder: HoughLineFinder::default(),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Later builds use the new config; cached graphs stay until rebuilt.
    pub fn set_config(&mut self, config: ExtractionConfig) {
        self.config = config;
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget the graph of one page.
    pub fn invalidate(&mut self, id: &str) -> bool {
        self.cache.remove(id).is_some()
    }

    /// Resolve a build against the cache, running the pipeline on a miss
    /// without storing the result.
    pub fn prepare(&mut self, id: &str, raster: &RasterImage, options: &BuildOptions) -> Result<Prepared> {
        raster.validate()?;
        let config = self.config.with_build_options(options);
        let key = GraphKey::compute(raster, &config, options.canvas.as_deref())?;

        if let Some(hit) = self.cache.lookup(id, &key) {
            return Ok(Prepared::Cached(BuildSummary::new(id, &key, &hit.graph, true)));
        }

        let trace = PipelineBuilder::build_from_config(&config).process_traced(raster)?;
        Ok(Prepared::Built(PendingGraph {
            page: id.to_string(),
            entry: CachedGraph {
                key,
                graph: Arc::new(trace.graph),
                gray: Arc::new(trace.gray),
            },
        }))
    }

    /// Store a prepared graph, replacing whatever the page had.
    pub fn commit(&mut self, pending: PendingGraph) -> BuildSummary {
        let PendingGraph { page, entry } = pending;
        let summary = BuildSummary::new(&page, &entry.key, &entry.graph, false);
        info!(page, nodes = summary.nodes, edges = summary.edges, "graph cached");
        self.cache.insert(page, entry);
        summary
    }

    pub fn build_graph(&mut self, id: &str, raster: &RasterImage, options: &BuildOptions) -> Result<BuildSummary> {
        match self.prepare(id, raster, options)? {
            Prepared::Cached(summary) => Ok(summary),
            Prepared::Built(pending) => Ok(self.commit(pending)),
        }
    }

    fn entry(&self, id: &str) -> Result<&CachedGraph> {
        self.cache
            .get(id)
            .ok_or_else(|| WireError::NoGraphForId(id.to_string()))
    }

    pub fn graph(&self, id: &str) -> Result<Arc<Graph>> {
        Ok(Arc::clone(&self.entry(id)?.graph))
    }

    pub fn trace_path(&self, id: &str, click: Point, options: TraceOptions) -> Result<Option<Vec<Point>>> {
        let entry = self.entry(id)?;
        Ok(Tracer::new(&entry.graph, &self.config.trace).trace_path(click, options))
    }

    pub fn trace_component(&self, id: &str, click: Point) -> Result<Option<Vec<Vec<Point>>>> {
        let entry = self.entry(id)?;
        Ok(Tracer::new(&entry.graph, &self.config.trace).trace_component(click))
    }

    /// Net (unless `stop_at`), then single wire, then the pixel scan, then
    /// the Hough finder.
    pub fn highlight(&self, id: &str, click: Point, options: TraceOptions) -> Result<Option<Highlight>> {
        let entry = self.entry(id)?;
        let tracer = Tracer::new(&entry.graph, &self.config.trace);

        if !options.stop_at {
            if let Some(paths) = tracer.trace_component(click) {
                let paths: Vec<_> = paths.into_iter().filter(|p| p.len() >= 2).collect();
                if !paths.is_empty() {
                    return Ok(Some(Highlight { source: HighlightSource::Component, paths }));
                }
            }
        }
        if let Some(path) = tracer.trace_path(click, options) {
            return Ok(Some(Highlight { source: HighlightSource::Path, paths: vec![path] }));
        }
        if let Some(segment) = self.scanner.scan(&entry.gray, click) {
            return Ok(Some(Highlight { source: HighlightSource::Scan, paths: vec![segment.to_polyline()] }));
        }
        Ok(self.finder.find(&entry.gray, click).map(|segment| Highlight {
            source: HighlightSource::Hough,
            paths: vec![segment.to_polyline()],
        }))
    }

    pub fn export_vector(&self, id: &str, options: &VectorOptions) -> Result<VectorDocument> {
        Ok(VectorDocument::from_graph(&self.entry(id)?.graph, options))
    }

    pub fn export_svg(&self, id: &str, options: &VectorOptions) -> Result<String> {
        Ok(self.export_vector(id, options)?.to_svg())
    }

    pub fn export_geojson(&self, id: &str) -> Result<String> {
        graph_to_geojson_string(&self.entry(id)?.graph)
    }

    /// Run one command, folding "nothing found" conditions into empty results
    /// and everything else into an error response.
    pub fn execute(&mut self, command: EngineCommand) -> EngineResponse {
        let id = command.page_id().to_string();
        let result = match command {
            EngineCommand::BuildGraph { id, image, options } => {
                self.build_graph(&id, &image, &options).map(EngineResponse::GraphBuilt)
            }
            EngineCommand::TracePath { id, click, options } => {
                soft(self.trace_path(&id, click, options)).map(|path| EngineResponse::Path { id, path })
            }
            EngineCommand::TraceComponent { id, click } => soft(self.trace_component(&id, click))
                .map(|paths| EngineResponse::Component { id, paths }),
            EngineCommand::Highlight { id, click, options } => soft(self.highlight(&id, click, options))
                .map(|highlight| EngineResponse::Highlight { id, highlight }),
            EngineCommand::ExportVector { id, options } => soft(self.export_svg(&id, &options).map(Some))
                .map(|document| EngineResponse::Vector { id, document }),
            EngineCommand::ExportGeoJson { id } => soft(self.export_geojson(&id).map(Some))
                .map(|document| EngineResponse::GeoJson { id, document }),
        };
        result.unwrap_or_else(|e| EngineResponse::Error { id, message: e.to_string() })
    }
}

/// Missing graphs and far-off clicks are ordinary misses, not failures.
fn soft<T>(result: Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Err(WireError::NoGraphForId(id)) => {
            debug!(page = %id, "no graph built yet");
            Ok(None)
        }
        Err(WireError::NoNearbyStroke { .. }) => Ok(None),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn bar_page() -> RasterImage {
        let mut gray = GrayImage::from_pixel(100, 100, Luma([255]));
        for y in 49..=51 {
            for x in 10..=89 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }
        RasterImage::from_gray(&gray)
    }

    #[test]
    fn second_build_is_served_from_cache() {
        let mut engine = WireEngine::default();
        let first = engine.build_graph("p1", &bar_page(), &BuildOptions::default()).expect("build");
        assert!(!first.cached);
        assert_eq!((first.terminals, first.edges), (2, 1));

        let again = engine.build_graph("p1", &bar_page(), &BuildOptions::default()).expect("build");
        assert!(again.cached);
        assert_eq!(again.key, first.key);

        let rebuilt = engine
            .build_graph("p1", &bar_page(), &BuildOptions { bridge_radius: Some(2), ..Default::default() })
            .expect("build");
        assert!(!rebuilt.cached);
        assert_ne!(rebuilt.key, first.key);
        assert_eq!(engine.stats().replaced, 1);
    }

    #[test]
    fn queries_before_build_are_soft_misses() {
        let mut engine = WireEngine::default();
        assert!(matches!(
            engine.trace_path("nope", Point::new(1, 1), TraceOptions::default()),
            Err(WireError::NoGraphForId(_))
        ));
        let response = engine.execute(EngineCommand::TracePath {
            id: "nope".into(),
            click: Point::new(1, 1),
            options: TraceOptions::default(),
        });
        assert_eq!(response, EngineResponse::Path { id: "nope".into(), path: None });

        let response = engine.execute(EngineCommand::ExportGeoJson { id: "nope".into() });
        assert_eq!(response, EngineResponse::GeoJson { id: "nope".into(), document: None });
    }

    #[test]
    fn invalid_image_is_an_error_response() {
        let mut engine = WireEngine::default();
        let response = engine.execute(EngineCommand::BuildGraph {
            id: "bad".into(),
            image: RasterImage { width: 0, height: 0, data: vec![] },
            options: BuildOptions::default(),
        });
        assert!(matches!(response, EngineResponse::Error { ref id, .. } if id == "bad"));
    }

    #[test]
    fn highlight_prefers_component_then_path() {
        let mut engine = WireEngine::default();
        engine.build_graph("p", &bar_page(), &BuildOptions::default()).expect("build");

        let net = engine.highlight("p", Point::new(40, 50), TraceOptions::default()).expect("graph");
        assert_eq!(net.map(|h| h.source), Some(HighlightSource::Component));

        let wire = engine
            .highlight("p", Point::new(40, 50), TraceOptions { stop_at: true })
            .expect("graph");
        assert_eq!(wire.map(|h| h.source), Some(HighlightSource::Path));

        let nothing = engine.highlight("p", Point::new(40, 90), TraceOptions::default()).expect("graph");
        assert!(nothing.is_none());
    }

    #[test]
    fn thin_line_off_the_graph_falls_back_to_hough() {
        let mut gray = GrayImage::from_pixel(200, 200, Luma([255]));
        for x in 40..=160 {
            gray.put_pixel(x, 100, Luma([0]));
        }
        let config = ExtractionConfig {
            trace: crate::config::TraceParams { snap_radius: 0.5 },
            ..Default::default()
        };
        let mut engine = WireEngine::new(config);
        engine.build_graph("thin", &RasterImage::from_gray(&gray), &BuildOptions::default()).expect("build");

        let hit = engine
            .highlight("thin", Point::new(100, 104), TraceOptions::default())
            .expect("graph")
            .expect("hough finds the line");
        assert_eq!(hit.source, HighlightSource::Hough);
        assert_eq!(hit.paths.len(), 1);
        assert!(hit.paths[0].iter().all(|p| (97..=103).contains(&p.y)));
    }

    #[test]
    fn command_metadata() {
        assert_eq!(EngineCommand::command_names().len(), 6);
        assert!(EngineCommand::command_names().contains(&"trace_component"));
        assert!(EngineCommand::command_names().contains(&"export_geojson"));
        let cmd: EngineCommand = serde_json::from_str(
            r#"{ "type": "trace_path", "params": { "id": "p", "click": { "x": 3, "y": 4 } } }"#,
        )
        .expect("parses");
        assert_eq!(cmd.page_id(), "p");
        assert_eq!(cmd.to_string(), "trace_path");
        assert_eq!(cmd.parameters_info().len(), 3);
        let schema = serde_json::to_string(&EngineCommand::schema()).expect("schema");
        assert!(schema.contains("export_geojson"));
    }
}
