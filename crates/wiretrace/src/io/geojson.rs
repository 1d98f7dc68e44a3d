use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;

use crate::{error::Result, graph::Graph};

/// Edges as `LineString` features followed by nodes as `Point` features, in
/// image pixel coordinates. Image size travels as foreign members.
pub fn graph_to_geojson(graph: &Graph) -> FeatureCollection {
    let mut features = Vec::with_capacity(graph.edges.len() + graph.nodes.len());

    for (i, edge) in graph.edges.iter().enumerate() {
        let coordinates = edge
            .points
            .iter()
            .map(|p| vec![p.x as f64, p.y as f64])
            .collect();

        let mut properties = JsonObject::new();
        properties.insert("feature".to_string(), json!("edge"));
        properties.insert("edge".to_string(), json!(i));
        properties.insert("a".to_string(), json!(edge.a));
        properties.insert("b".to_string(), json!(edge.b));
        properties.insert("point_count".to_string(), json!(edge.points.len()));
        properties.insert("length".to_string(), json!(edge.length()));

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(coordinates))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    for node in &graph.nodes {
        let mut properties = JsonObject::new();
        properties.insert("feature".to_string(), json!("node"));
        properties.insert("node".to_string(), json!(node.id));
        properties.insert("kind".to_string(), json!(node.kind));
        properties.insert("degree".to_string(), json!(node.degree));

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![node.x as f64, node.y as f64]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let mut foreign_members = JsonObject::new();
    foreign_members.insert("image_width".to_string(), json!(graph.width));
    foreign_members.insert("image_height".to_string(), json!(graph.height));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

pub fn graph_to_geojson_string(graph: &Graph) -> Result<String> {
    Ok(serde_json::to_string(&GeoJson::FeatureCollection(graph_to_geojson(graph)))?)
}
