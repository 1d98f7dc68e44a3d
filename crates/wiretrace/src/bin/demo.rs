use image::{GrayImage, Luma};
use tracing_subscriber::EnvFilter;
use wiretrace::{
    BuildOptions, EngineCommand, EngineResponse, Point, RasterImage, TraceOptions, VectorOptions,
    WireEngine, WorkerHandle, graph::NodeKind,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🔌 Wire Tracing Demo");
    println!("====================");

    demo_commands()?;
    let page = RasterImage::from_gray(&create_schematic());
    demo_engine(&page)?;
    demo_worker(page).await?;

    println!("✅ All demos completed successfully!");
    println!("📁 Generated files: demo_wires.svg, demo_wires.geojson");
    Ok(())
}

fn demo_commands() -> color_eyre::Result<()> {
    println!("\n🔧 Demo: EngineCommand metadata");
    println!("-------------------------------");
    for (i, name) in EngineCommand::command_names().iter().enumerate() {
        println!("   {}. {}", i + 1, name);
    }

    let example = EngineCommand::TracePath {
        id: "page-1".into(),
        click: Point::new(40, 60),
        options: TraceOptions { stop_at: true },
    };
    println!("\n   🔹 {}: {}", example, example.description());
    for (name, desc, required) in example.parameters_info() {
        let req_marker = if required { "*" } else { " " };
        println!("       {}{}: {}", req_marker, name, desc);
    }
    println!("   JSON: {}", serde_json::to_string(&example)?);
    Ok(())
}

fn demo_engine(page: &RasterImage) -> color_eyre::Result<()> {
    println!("\n🧭 Demo: build, trace and export");
    println!("--------------------------------");
    let mut engine = WireEngine::default();

    let summary = engine.build_graph("page-1", page, &BuildOptions::default())?;
    println!(
        "   Graph: {} nodes ({} terminals, {} junctions, {} dots), {} edges",
        summary.nodes, summary.terminals, summary.junctions, summary.dots, summary.edges
    );
    let again = engine.build_graph("page-1", page, &BuildOptions::default())?;
    println!("   Rebuild served from cache: {}", again.cached);

    let graph = engine.graph("page-1")?;
    for node in graph.iter_kind(NodeKind::Dot) {
        println!("   Dot at ({}, {}) with degree {}", node.x, node.y, node.degree);
    }

    let click = Point::new(40, 60);
    match engine.trace_path("page-1", click, TraceOptions::default())? {
        Some(path) => println!(
            "   Wire under ({}, {}): {} points from {:?} to {:?}",
            click.x, click.y, path.len(), path.first(), path.last()
        ),
        None => println!("   Nothing under ({}, {})", click.x, click.y),
    }
    if let Some(net) = engine.trace_component("page-1", click)? {
        println!("   Net under ({}, {}): {} edges", click.x, click.y, net.len());
    }
    let far = Point::new(5, 5);
    println!(
        "   Click at ({}, {}) finds: {:?}",
        far.x,
        far.y,
        engine.highlight("page-1", far, TraceOptions::default())?.map(|h| h.source)
    );

    let svg = engine.export_svg("page-1", &VectorOptions::default())?;
    std::fs::write("demo_wires.svg", &svg)?;
    std::fs::write("demo_wires.geojson", engine.export_geojson("page-1")?)?;
    println!("   SVG paths: {}", svg.matches("<path ").count());
    println!("   Cache: {:?}", engine.stats());
    Ok(())
}

async fn demo_worker(page: RasterImage) -> color_eyre::Result<()> {
    println!("\n⏱️  Demo: async worker with generations");
    println!("---------------------------------------");
    let worker = WorkerHandle::spawn(WireEngine::default())?;

    let issued = worker.generation();
    worker.invalidate();
    let stale = worker
        .request_for(issued, EngineCommand::BuildGraph {
            id: "page-1".into(),
            image: page.clone(),
            options: BuildOptions::default(),
        })
        .await?;
    println!("   Build issued before invalidation: {:?}", stale);

    let fresh = worker
        .call(EngineCommand::BuildGraph {
            id: "page-1".into(),
            image: page,
            options: BuildOptions::default(),
        })
        .await;
    if let Some(EngineResponse::GraphBuilt(summary)) = fresh {
        println!("   Current build: {} edges", summary.edges);
    }
    Ok(())
}

/// A small schematic: a bus with a drawn junction dot, a plain crossing and
/// a stub wire, plus a label block.
fn create_schematic() -> GrayImage {
    let mut img = GrayImage::from_pixel(200, 140, Luma([255u8]));
    let mut ink = |x0: u32, y0: u32, x1: u32, y1: u32| {
        for y in y0..=y1 {
            for x in x0..=x1 {
                img.put_pixel(x, y, Luma([0u8]));
            }
        }
    };

    // Bus and two drops
    ink(20, 59, 180, 61);
    ink(59, 20, 61, 120);
    ink(139, 60, 141, 120);
    // Junction dot on the first drop
    ink(55, 55, 65, 65);
    // Stub
    ink(100, 100, 170, 102);
    // Label
    ink(150, 20, 156, 30);
    ink(160, 20, 166, 30);

    img
}
