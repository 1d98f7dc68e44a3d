use crate::{
    config::{BuildOptions, ExtractionConfig, Preprocess, TraceOptions, VectorOptions},
    engine::{EngineCommand, EngineResponse, WireEngine},
    types::{Point, RasterImage},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{
    Error as McpError, ServerHandler,
    handler::server::tool::IntoCallToolResult,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool,
};
use serde::Deserialize;
use std::sync::{Arc, RwLock};

/// Build a page graph from an image file on disk
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadImageRequest {
    #[schemars(description = "Page identifier the graph is cached under")]
    pub id: String,
    #[schemars(description = "Path to the image file")]
    pub path: String,
    #[schemars(description = "Closing radius that bridges broken strokes")]
    pub bridge_radius: Option<u8>,
    #[schemars(description = "Suppress text-like blobs before tracing")]
    pub ignore_text: Option<bool>,
    #[schemars(description = "Cleanup steps in order: denoise, adaptive_clean, deskew")]
    pub preprocess: Option<Vec<Preprocess>>,
}

/// Build a page graph from an encoded image
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BuildGraphRequest {
    #[schemars(description = "Page identifier the graph is cached under")]
    pub id: String,
    #[schemars(description = "Base64 encoded PNG, JPEG or TIFF bytes")]
    pub image_base64: String,
    pub bridge_radius: Option<u8>,
    pub ignore_text: Option<bool>,
    #[schemars(description = "Cleanup steps in order: denoise, adaptive_clean, deskew")]
    pub preprocess: Option<Vec<Preprocess>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClickRequest {
    #[schemars(description = "Page identifier")]
    pub id: String,
    #[schemars(description = "Click x in image pixels")]
    pub x: i32,
    #[schemars(description = "Click y in image pixels")]
    pub y: i32,
    #[schemars(description = "Stop at the first node instead of following pass-through nodes")]
    #[serde(default)]
    pub stop_at: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportSvgRequest {
    pub id: String,
    #[schemars(
        description = "Douglas-Peucker tolerance in pixels",
        range(min = 0.0, max = 50.0)
    )]
    pub simplify: Option<f64>,
    #[schemars(description = "Flatten near-straight wires onto their dominant axis")]
    pub snap: Option<bool>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PageRequest {
    #[schemars(description = "Page identifier")]
    pub id: String,
}

impl IntoCallToolResult for EngineResponse {
    fn into_call_tool_result(self) -> Result<CallToolResult, McpError> {
        let text = match &self {
            // Documents go out verbatim so clients can save them directly.
            EngineResponse::Vector { document: Some(doc), .. }
            | EngineResponse::GeoJson { document: Some(doc), .. } => doc.clone(),
            _ => serde_json::to_string_pretty(&self).unwrap_or_else(|_| format!("{:?}", self)),
        };
        let content = vec![Content::text(text)];
        Ok(match self {
            EngineResponse::Error { .. } => CallToolResult::error(content),
            _ => CallToolResult::success(content),
        })
    }
}

/// MCP server exposing wire tracing over one shared engine
#[derive(Clone)]
pub struct WireMcpServer {
    engine: Arc<RwLock<WireEngine>>,
}

impl WireMcpServer {
    pub fn new() -> Self {
        Self::with_config(ExtractionConfig::default())
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { engine: Arc::new(RwLock::new(WireEngine::new(config))) }
    }

    fn run(&self, command: EngineCommand) -> EngineResponse {
        let mut engine = self.engine.write().unwrap_or_else(|e| e.into_inner());
        engine.execute(command)
    }

    fn error(id: String, message: impl Into<String>) -> EngineResponse {
        EngineResponse::Error { id, message: message.into() }
    }
}

impl Default for WireMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool(tool_box)]
impl WireMcpServer {
    #[tool(description = "Load a schematic image from a file path and build its wire graph")]
    fn load_image(
        &self,
        #[tool(aggr)] LoadImageRequest { id, path, bridge_radius, ignore_text, preprocess }: LoadImageRequest,
    ) -> EngineResponse {
        let image = match RasterImage::open(&path) {
            Ok(image) => image,
            Err(e) => return Self::error(id, format!("Failed to load image from {}: {}", path, e)),
        };
        self.run(EngineCommand::BuildGraph {
            id,
            image,
            options: BuildOptions { bridge_radius, ignore_text, preprocess, canvas: Some(path) },
        })
    }

    #[tool(description = "Build the wire graph of a base64 encoded image")]
    fn build_graph(
        &self,
        #[tool(aggr)] BuildGraphRequest { id, image_base64, bridge_radius, ignore_text, preprocess }: BuildGraphRequest,
    ) -> EngineResponse {
        let bytes = match STANDARD.decode(image_base64.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return Self::error(id, format!("Invalid base64 image: {}", e)),
        };
        let image = match RasterImage::from_bytes(&bytes) {
            Ok(image) => image,
            Err(e) => return Self::error(id, e.to_string()),
        };
        self.run(EngineCommand::BuildGraph {
            id,
            image,
            options: BuildOptions { bridge_radius, ignore_text, preprocess, canvas: None },
        })
    }

    #[tool(description = "Trace the single wire under a click, following pass-through nodes unless stop_at is set")]
    fn trace_path(&self, #[tool(aggr)] ClickRequest { id, x, y, stop_at }: ClickRequest) -> EngineResponse {
        self.run(EngineCommand::TracePath {
            id,
            click: Point::new(x, y),
            options: TraceOptions { stop_at },
        })
    }

    #[tool(description = "Return every wire polyline in the net under a click")]
    fn trace_component(&self, #[tool(aggr)] ClickRequest { id, x, y, stop_at: _stop_at }: ClickRequest) -> EngineResponse {
        self.run(EngineCommand::TraceComponent { id, click: Point::new(x, y) })
    }

    #[tool(description = "Best-effort highlight under a click: whole net, then single wire, then a pixel scan")]
    fn highlight(&self, #[tool(aggr)] ClickRequest { id, x, y, stop_at }: ClickRequest) -> EngineResponse {
        self.run(EngineCommand::Highlight {
            id,
            click: Point::new(x, y),
            options: TraceOptions { stop_at },
        })
    }

    #[tool(description = "Export a page's wire graph as simplified SVG")]
    fn export_svg(
        &self,
        #[tool(aggr)] ExportSvgRequest { id, simplify, snap, stroke, stroke_width }: ExportSvgRequest,
    ) -> EngineResponse {
        let defaults = VectorOptions::default();
        let options = VectorOptions {
            simplify: simplify.unwrap_or(defaults.simplify),
            snap: snap.unwrap_or(defaults.snap),
            stroke: stroke.unwrap_or(defaults.stroke),
            stroke_width: stroke_width.unwrap_or(defaults.stroke_width),
        };
        self.run(EngineCommand::ExportVector { id, options })
    }

    #[tool(description = "Export a page's nodes and edges as a GeoJSON feature collection")]
    fn export_geojson(&self, #[tool(aggr)] PageRequest { id }: PageRequest) -> EngineResponse {
        self.run(EngineCommand::ExportGeoJson { id })
    }

    #[tool(description = "Forget the cached graph of a page")]
    fn invalidate(&self, #[tool(aggr)] PageRequest { id }: PageRequest) -> String {
        let mut engine = self.engine.write().unwrap_or_else(|e| e.into_inner());
        if engine.invalidate(&id) {
            format!("Dropped graph for page '{}'", id)
        } else {
            format!("No graph cached for page '{}'", id)
        }
    }

    #[tool(description = "Graph cache counters")]
    fn cache_stats(&self) -> String {
        let engine = self.engine.read().unwrap_or_else(|e| e.into_inner());
        serde_json::to_string_pretty(&engine.stats())
            .unwrap_or_else(|e| format!("Failed to serialize stats: {}", e))
    }

    #[tool(description = "Get information about available commands and their parameters")]
    fn get_command_info(&self) -> String {
        let mut info = String::new();
        info.push_str("Available EngineCommands:\n\n");

        for (i, name) in EngineCommand::command_names().iter().enumerate() {
            info.push_str(&format!("{}. {}\n", i + 1, name));
        }

        info.push_str("\nCommand Details:\n");
        let click = Point::new(0, 0);
        let commands = vec![
            EngineCommand::BuildGraph {
                id: "page".into(),
                image: RasterImage::default(),
                options: BuildOptions::default(),
            },
            EngineCommand::TracePath { id: "page".into(), click, options: TraceOptions::default() },
            EngineCommand::TraceComponent { id: "page".into(), click },
            EngineCommand::Highlight { id: "page".into(), click, options: TraceOptions::default() },
            EngineCommand::ExportVector { id: "page".into(), options: VectorOptions::default() },
            EngineCommand::ExportGeoJson { id: "page".into() },
        ];

        for cmd in commands {
            info.push_str(&format!("\n• {}\n", cmd));
            info.push_str(&format!("  Description: {}\n", cmd.description()));
            info.push_str("  Parameters:\n");
            for (name, desc, required) in cmd.parameters_info() {
                let req_marker = if required { " (required)" } else { " (optional)" };
                info.push_str(&format!("    - {}{}: {}\n", name, req_marker, desc));
            }
        }

        info
    }

    #[tool(description = "Get the JSON schema for EngineCommand")]
    fn get_command_schema(&self) -> String {
        serde_json::to_string_pretty(&EngineCommand::schema())
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for WireMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Wire Tracing Server - Build wire graphs from schematic or diagram images, then trace single wires or whole nets under a click and export them as SVG or GeoJSON.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
