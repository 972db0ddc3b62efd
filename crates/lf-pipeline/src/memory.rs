//! In-memory session collaborators.
//!
//! [`MemoryAnnotations`] is both the annotation store and the object-state
//! provider for a collection held in memory; [`MemoryFrames`] serves frame
//! data from a map. [`SessionDump`] is the JSON form the CLI reads and
//! writes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use lf_core::{Collection, Error, FrameData, ObjectState, ObjectType, SessionKind, Shape};
use lf_rules::Expr;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::session::{AnnotationStore, FrameProvider, ObjectStateProvider, Session};

// ---------------------------------------------------------------------------
// MemoryAnnotations
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    collection: Collection,
    next_id: u64,
    /// Descriptions of undoable changes, newest last.
    history: Vec<String>,
}

impl Inner {
    fn taken_ids(&self) -> HashSet<u64> {
        self.collection
            .shapes
            .iter()
            .filter_map(|s| s.client_id)
            .collect()
    }

    /// Give every shape without an id, or with one already in use, a fresh id.
    fn assign_ids(&mut self, shapes: &mut [Shape]) {
        let mut taken = self.taken_ids();
        for shape in shapes {
            let needs_id = match shape.client_id {
                Some(id) => !taken.insert(id),
                None => true,
            };
            if needs_id {
                while taken.contains(&self.next_id) {
                    self.next_id += 1;
                }
                shape.client_id = Some(self.next_id);
                taken.insert(self.next_id);
                self.next_id += 1;
            }
        }
    }
}

/// A session's annotations held in memory.
#[derive(Debug, Default)]
pub struct MemoryAnnotations {
    inner: RwLock<Inner>,
}

impl MemoryAnnotations {
    /// Load an initial collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if two shapes share a client id.
    pub fn new(collection: Collection) -> lf_core::Result<Self> {
        let mut seen = HashSet::new();
        for id in collection.shapes.iter().filter_map(|s| s.client_id) {
            if !seen.insert(id) {
                return Err(Error::data(format!("duplicate shape client_id {id}")));
            }
        }

        let mut inner = Inner {
            next_id: seen.iter().max().map_or(1, |max| max + 1),
            ..Inner::default()
        };
        let Collection {
            mut shapes,
            tracks,
            tags,
        } = collection;
        inner.assign_ids(&mut shapes);
        inner.collection = Collection {
            shapes,
            tracks,
            tags,
        };

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Current collection.
    pub fn snapshot(&self) -> Collection {
        self.inner.read().collection.clone()
    }

    /// Record an undoable change made outside the pipeline.
    pub fn record_change(&self, description: impl Into<String>) {
        self.inner.write().history.push(description.into());
    }

    pub fn history_len(&self) -> usize {
        self.inner.read().history.len()
    }

    /// Replace the shapes of the collection, as an interactive edit would.
    pub fn replace_shapes(&self, mut shapes: Vec<Shape>) {
        let mut inner = self.inner.write();
        inner.collection.shapes.clear();
        inner.assign_ids(&mut shapes);
        inner.collection.shapes = shapes;
        inner.history.push("edit shapes".into());
    }
}

#[async_trait]
impl AnnotationStore for MemoryAnnotations {
    async fn export(&self) -> lf_core::Result<Collection> {
        Ok(self.snapshot())
    }

    async fn import(&self, collection: Collection) -> lf_core::Result<()> {
        let Collection {
            mut shapes,
            tracks,
            tags,
        } = collection;

        let mut inner = self.inner.write();
        inner.assign_ids(&mut shapes);
        tracing::debug!(
            shapes = shapes.len(),
            tracks = tracks.len(),
            tags = tags.len(),
            "Importing annotations"
        );
        inner.collection.shapes.extend(shapes);
        inner.collection.tracks.extend(tracks);
        inner.collection.tags.extend(tags);
        inner.history.push("import annotations".into());
        Ok(())
    }

    async fn clear(&self) -> lf_core::Result<()> {
        let mut inner = self.inner.write();
        inner.collection = Collection::default();
        inner.history.clear();
        Ok(())
    }
}

fn group_of(shape: &Shape) -> Option<String> {
    shape.extra.get("group").map(|value| match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Object state of a tag stored as opaque JSON.
fn tag_state(tag: &serde_json::Value) -> lf_core::Result<ObjectState> {
    let frame = tag
        .get("frame")
        .and_then(serde_json::Value::as_u64)
        .and_then(|f| u32::try_from(f).ok())
        .ok_or_else(|| Error::data(format!("tag without a valid frame: {tag}")))?;
    let label = tag
        .get("label")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ObjectState {
        client_id: tag.get("client_id").and_then(serde_json::Value::as_u64),
        object_type: ObjectType::Tag,
        shape_type: None,
        label,
        frame,
        occluded: false,
        z_order: 0,
        attributes: BTreeMap::new(),
    })
}

/// Removed objects are dropped eagerly, so `include_deleted` has nothing to
/// add here.
#[async_trait]
impl ObjectStateProvider for MemoryAnnotations {
    async fn get_states(
        &self,
        frame: u32,
        _include_deleted: bool,
        filters: &[Expr],
        group_filter: Option<&str>,
    ) -> lf_core::Result<Vec<ObjectState>> {
        let inner = self.inner.read();

        let mut states: Vec<ObjectState> = inner
            .collection
            .shapes_on(frame)
            .filter(|shape| group_filter.map_or(true, |g| group_of(shape).as_deref() == Some(g)))
            .map(Shape::state)
            .filter(|state| lf_rules::matches_all(filters, state))
            .collect();

        if group_filter.is_none() {
            for tag in &inner.collection.tags {
                let state = tag_state(tag)?;
                if state.frame == frame && lf_rules::matches_all(filters, &state) {
                    states.push(state);
                }
            }
        }

        Ok(states)
    }
}

// ---------------------------------------------------------------------------
// MemoryFrames
// ---------------------------------------------------------------------------

/// Frame data served from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrames {
    frames: BTreeMap<u32, FrameData>,
}

impl MemoryFrames {
    /// # Errors
    ///
    /// Returns [`Error::Data`] if a frame number appears twice.
    pub fn new(frames: Vec<FrameData>) -> lf_core::Result<Self> {
        let mut map = BTreeMap::new();
        for frame in frames {
            if map.insert(frame.number, frame).is_some() {
                return Err(Error::data(format!("frame {} listed twice", frame.number)));
            }
        }
        Ok(Self { frames: map })
    }

    /// `count` frames numbered from 0, all the same size.
    pub fn uniform(count: u32, width: u32, height: u32) -> Self {
        Self {
            frames: (0..count)
                .map(|n| (n, FrameData::new(n, width, height)))
                .collect(),
        }
    }

    /// Builder: flag the given frames as deleted.
    pub fn with_deleted(mut self, deleted: &[u32]) -> Self {
        for number in deleted {
            if let Some(frame) = self.frames.get_mut(number) {
                frame.deleted = true;
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn to_vec(&self) -> Vec<FrameData> {
        self.frames.values().copied().collect()
    }
}

#[async_trait]
impl FrameProvider for MemoryFrames {
    async fn get(&self, frame: u32) -> lf_core::Result<FrameData> {
        self.frames
            .get(&frame)
            .copied()
            .ok_or_else(|| Error::data(format!("frame {frame} is out of range")))
    }
}

// ---------------------------------------------------------------------------
// SessionDump
// ---------------------------------------------------------------------------

/// Serialized session: annotations plus frame table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDump {
    #[serde(default)]
    pub kind: SessionKind,
    #[serde(default)]
    pub collection: Collection,
    pub frames: Vec<FrameData>,
}

impl SessionDump {
    pub fn from_json(json: &str) -> lf_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> lf_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build an in-memory session from this dump. The returned store is the
    /// one the session writes to, so callers can read the result back.
    pub fn into_session(self) -> lf_core::Result<(Session, Arc<MemoryAnnotations>)> {
        let annotations = Arc::new(MemoryAnnotations::new(self.collection)?);
        let frames = Arc::new(MemoryFrames::new(self.frames)?);
        let session = Session::new(self.kind, annotations.clone(), frames, annotations.clone());
        Ok((session, annotations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::ShapeType;
    use lf_rules::Condition;

    fn rect(frame: u32, label: &str) -> Shape {
        Shape::new(ShapeType::Rectangle, frame, label)
    }

    #[test]
    fn new_assigns_missing_ids_after_max() {
        let store = MemoryAnnotations::new(Collection::from_shapes(vec![
            rect(0, "a").with_client_id(10),
            rect(0, "b"),
        ]))
        .unwrap();
        let ids: Vec<_> = store.snapshot().shapes.iter().map(|s| s.client_id).collect();
        assert_eq!(ids, [Some(10), Some(11)]);
    }

    #[test]
    fn new_rejects_duplicate_ids() {
        let err = MemoryAnnotations::new(Collection::from_shapes(vec![
            rect(0, "a").with_client_id(1),
            rect(1, "b").with_client_id(1),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[tokio::test]
    async fn import_appends_and_reassigns_colliding_ids() {
        let store =
            MemoryAnnotations::new(Collection::from_shapes(vec![rect(0, "a").with_client_id(1)]))
                .unwrap();
        store
            .import(Collection::from_shapes(vec![
                rect(0, "b").with_client_id(1),
                rect(0, "c"),
            ]))
            .await
            .unwrap();

        let shapes = store.snapshot().shapes;
        assert_eq!(shapes.len(), 3);
        let ids: HashSet<_> = shapes.iter().filter_map(|s| s.client_id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn clear_drops_annotations_and_history() {
        let store = MemoryAnnotations::new(Collection {
            shapes: vec![rect(0, "a")],
            tracks: vec![serde_json::json!({"frame": 0})],
            tags: vec![],
        })
        .unwrap();
        store.record_change("move shape");
        assert_eq!(store.history_len(), 1);

        store.clear().await.unwrap();
        assert!(store.snapshot().is_empty());
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn states_filter_by_frame_and_expression() {
        let store = MemoryAnnotations::new(Collection::from_shapes(vec![
            rect(0, "car"),
            rect(0, "person"),
            rect(1, "car"),
        ]))
        .unwrap();

        let filters = [Expr::Condition(Condition::Label(vec!["car".into()]))];
        let states = store.get_states(0, false, &filters, None).await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].label, "car");
        assert_eq!(states[0].frame, 0);

        let all = store.get_states(0, false, &[], None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn states_include_tags_on_frame() {
        let store = MemoryAnnotations::new(Collection {
            shapes: vec![rect(2, "car")],
            tracks: vec![],
            tags: vec![
                serde_json::json!({"frame": 2, "label": "night"}),
                serde_json::json!({"frame": 3, "label": "day"}),
            ],
        })
        .unwrap();

        let states = store.get_states(2, false, &[], None).await.unwrap();
        let types: Vec<_> = states.iter().map(|s| s.object_type).collect();
        assert_eq!(types, [ObjectType::Shape, ObjectType::Tag]);
    }

    #[tokio::test]
    async fn malformed_tag_is_data_error() {
        let store = MemoryAnnotations::new(Collection {
            shapes: vec![],
            tracks: vec![],
            tags: vec![serde_json::json!({"label": "no frame"})],
        })
        .unwrap();
        let err = store.get_states(0, false, &[], None).await.unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[tokio::test]
    async fn group_filter_restricts_shapes() {
        let mut grouped = rect(0, "wheel");
        grouped.extra.insert("group".into(), serde_json::json!(4));
        let store =
            MemoryAnnotations::new(Collection::from_shapes(vec![grouped, rect(0, "car")])).unwrap();

        let states = store.get_states(0, false, &[], Some("4")).await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].label, "wheel");
    }

    #[tokio::test]
    async fn frames_lookup() {
        let frames = MemoryFrames::uniform(3, 640, 480).with_deleted(&[1]);
        assert_eq!(frames.len(), 3);
        assert!(!frames.get(0).await.unwrap().deleted);
        assert!(frames.get(1).await.unwrap().deleted);

        let err = frames.get(3).await.unwrap_err();
        assert!(err.to_string().contains("frame 3 is out of range"));
    }

    #[test]
    fn frames_reject_duplicates() {
        let err = MemoryFrames::new(vec![FrameData::new(0, 1, 1), FrameData::new(0, 2, 2)])
            .unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[tokio::test]
    async fn dump_into_session() {
        let json = r#"{
            "kind": "task",
            "collection": {"shapes": [{"type": "points", "frame": 0, "label": "eye"}]},
            "frames": [{"number": 0, "width": 100, "height": 50}]
        }"#;
        let dump = SessionDump::from_json(json).unwrap();
        let (session, store) = dump.into_session().unwrap();

        assert_eq!(session.kind, SessionKind::Task);
        assert_eq!(session.frames.get(0).await.unwrap().width, 100);
        let exported = session.annotations.export().await.unwrap();
        assert_eq!(exported.shapes[0].client_id, Some(1));
        assert_eq!(store.snapshot(), exported);
    }

    #[test]
    fn dump_parse_error_is_data_error() {
        let err = SessionDump::from_json(r#"{"collection": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }
}
