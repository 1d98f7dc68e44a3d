pub mod geojson;

pub use self::geojson::{graph_to_geojson, graph_to_geojson_string};
