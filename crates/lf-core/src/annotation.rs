//! Annotation data model: shapes, collections, frames, and object states.
//!
//! Enums serialize in lowercase and implement `Display` manually for a
//! consistent string representation. Tracks and tags are kept as opaque JSON
//! values because nothing in the pipeline interprets them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// SessionKind
// ---------------------------------------------------------------------------

/// The kind of annotation session a run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Job,
    Task,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job => write!(f, "job"),
            Self::Task => write!(f, "task"),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectType
// ---------------------------------------------------------------------------

/// Discriminator for the annotation objects visible on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Shape,
    Track,
    Tag,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape => write!(f, "shape"),
            Self::Track => write!(f, "track"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

// ---------------------------------------------------------------------------
// ShapeType
// ---------------------------------------------------------------------------

/// Geometry kind of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rectangle,
    Polygon,
    Polyline,
    Points,
    Ellipse,
    Cuboid,
    Mask,
    Skeleton,
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::Polyline => "polyline",
            Self::Points => "points",
            Self::Ellipse => "ellipse",
            Self::Cuboid => "cuboid",
            Self::Mask => "mask",
            Self::Skeleton => "skeleton",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// A single-frame annotation object.
///
/// `client_id` is assigned by the annotation store and is unique within a
/// collection. Shapes produced by actions carry no id until the store
/// imports them. Any field the pipeline does not know about is kept in
/// [`extra`](Self::extra) and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    pub frame: u32,
    pub label: String,
    #[serde(default)]
    pub points: Vec<f64>,
    #[serde(default)]
    pub occluded: bool,
    #[serde(default)]
    pub outside: bool,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Shape {
    /// Create a shape with default appearance fields.
    pub fn new(shape_type: ShapeType, frame: u32, label: impl Into<String>) -> Self {
        Self {
            client_id: None,
            shape_type,
            frame,
            label: label.into(),
            points: Vec::new(),
            occluded: false,
            outside: false,
            z_order: 0,
            rotation: 0.0,
            attributes: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Builder: set the client id.
    pub fn with_client_id(mut self, id: u64) -> Self {
        self.client_id = Some(id);
        self
    }

    /// Builder: set the geometry points.
    pub fn with_points(mut self, points: Vec<f64>) -> Self {
        self.points = points;
        self
    }

    /// Builder: add an attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The object state a state provider reports for this shape.
    pub fn state(&self) -> ObjectState {
        ObjectState {
            client_id: self.client_id,
            object_type: ObjectType::Shape,
            shape_type: Some(self.shape_type),
            label: self.label.clone(),
            frame: self.frame,
            occluded: self.occluded,
            z_order: self.z_order,
            attributes: self.attributes.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Full annotation state of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collection {
    pub shapes: Vec<Shape>,
    pub tracks: Vec<serde_json::Value>,
    pub tags: Vec<serde_json::Value>,
}

impl Collection {
    /// Create a collection holding only shapes.
    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        Self {
            shapes,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.tracks.is_empty() && self.tags.is_empty()
    }

    /// Shapes visible on `frame`, in collection order.
    pub fn shapes_on(&self, frame: u32) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(move |s| s.frame == frame)
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Per-frame data reported by a frame provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameData {
    pub number: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub deleted: bool,
}

impl FrameData {
    pub fn new(number: u32, width: u32, height: u32) -> Self {
        Self {
            number,
            width,
            height,
            deleted: false,
        }
    }

    /// Builder: mark the frame as deleted.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Read-only metadata handed to actions.
    pub fn meta(&self) -> FrameMeta {
        FrameMeta {
            number: self.number,
            width: self.width,
            height: self.height,
        }
    }
}

/// Frame metadata visible to an action's per-frame transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub number: u32,
    pub width: u32,
    pub height: u32,
}

// ---------------------------------------------------------------------------
// ObjectState
// ---------------------------------------------------------------------------

/// An object visible on a frame, as reported by a state provider after
/// filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub client_id: Option<u64>,
    pub object_type: ObjectType,
    /// `None` for tags.
    pub shape_type: Option<ShapeType>,
    pub label: String,
    pub frame: u32,
    pub occluded: bool,
    pub z_order: i32,
    pub attributes: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_serializes_type_field() {
        let shape = Shape::new(ShapeType::Rectangle, 3, "car").with_client_id(7);
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["type"], "rectangle");
        assert_eq!(json["client_id"], 7);
        assert_eq!(json["frame"], 3);
    }

    #[test]
    fn shape_without_id_omits_field() {
        let shape = Shape::new(ShapeType::Points, 0, "person");
        let json = serde_json::to_value(&shape).unwrap();
        assert!(json.get("client_id").is_none());
    }

    #[test]
    fn unknown_shape_fields_are_preserved() {
        let json = r#"{
            "type": "polygon",
            "frame": 1,
            "label": "road",
            "points": [0, 0, 10, 0, 10, 10],
            "source": "auto",
            "group": 4
        }"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert_eq!(shape.extra["source"], "auto");
        assert_eq!(shape.extra["group"], 4);

        let back = serde_json::to_value(&shape).unwrap();
        assert_eq!(back["source"], "auto");
        assert_eq!(back["group"], 4);
    }

    #[test]
    fn collection_defaults_missing_sections() {
        let collection: Collection = serde_json::from_str(r#"{"shapes": []}"#).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn shapes_on_filters_by_frame() {
        let collection = Collection::from_shapes(vec![
            Shape::new(ShapeType::Rectangle, 0, "a"),
            Shape::new(ShapeType::Rectangle, 1, "b"),
            Shape::new(ShapeType::Rectangle, 0, "c"),
        ]);
        let labels: Vec<_> = collection.shapes_on(0).map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["a", "c"]);
    }

    #[test]
    fn shape_state_mirrors_shape() {
        let shape = Shape::new(ShapeType::Ellipse, 5, "cell")
            .with_client_id(2)
            .with_attribute("color", "red");
        let state = shape.state();
        assert_eq!(state.object_type, ObjectType::Shape);
        assert_eq!(state.client_id, Some(2));
        assert_eq!(state.shape_type, Some(ShapeType::Ellipse));
        assert_eq!(state.attributes["color"], "red");
    }

    #[test]
    fn frame_meta_drops_deleted_flag() {
        let frame = FrameData::new(4, 1920, 1080).deleted();
        assert!(frame.deleted);
        assert_eq!(
            frame.meta(),
            FrameMeta {
                number: 4,
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn enum_display() {
        assert_eq!(SessionKind::Task.to_string(), "task");
        assert_eq!(ObjectType::Tag.to_string(), "tag");
        assert_eq!(ShapeType::Polyline.to_string(), "polyline");
    }
}
