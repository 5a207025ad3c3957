//! Object graph construction.
//!
//! The graph is the containment forest below a set of roots: one
//! [`ObjectInfo`] per reachable object, in pre-order, plus the containment
//! [`Edge`]s discovered on the way. Cross-reference edges are derived on
//! demand against a node subset with [`ObjectGraph::reference_edges`].
//!
//! ```text
//! /Foo[0]                    o1
//! ├── children[0]  /Foo[0]/children[0]   o2
//! └── children[1]  /Foo[0]/children[1]   o3
//! ```

use crate::base::{CanonicalPath, IdTable, LocalId, ObjectHandle};
use crate::interchange::{ModelAccess, ReferenceSlot};
use smol_str::SmolStr;
use tracing::debug;

/// A visited model object with its derived identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub handle: ObjectHandle,
    pub local_id: LocalId,
    /// First containment path that reached the object.
    pub path: CanonicalPath,
    /// The document identifier if the object has one, else the local id.
    pub preferred_id: String,
}

/// A directed relation between two objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: ObjectHandle,
    pub feature: SmolStr,
    pub target: ObjectHandle,
    pub containment: bool,
}

/// Nodes and containment edges below a set of roots.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    nodes: Vec<ObjectInfo>,
    edges: Vec<Edge>,
    index: IdTable,
}

impl ObjectGraph {
    /// Nodes in first-visit order.
    pub fn nodes(&self) -> &[ObjectInfo] {
        &self.nodes
    }

    /// Containment edges in discovery order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&ObjectInfo> {
        self.index.position(handle).map(|pos| &self.nodes[pos])
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.index.contains(handle)
    }

    /// Position of a node in [`nodes`](Self::nodes).
    pub fn position(&self, handle: ObjectHandle) -> Option<usize> {
        self.index.position(handle)
    }

    /// Containment edges whose endpoints both lie in `subset`.
    pub fn containment_edges_within(&self, subset: &IdTable) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| subset.contains(e.source) && subset.contains(e.target))
            .collect()
    }

    /// Non-containment edges between members of `subset`, in subset order
    /// and then reference-slot order.
    pub fn reference_edges<M: ModelAccess + ?Sized>(&self, model: &M, subset: &[&ObjectInfo]) -> Vec<Edge> {
        let members = subset_table(subset);
        let mut out = Vec::new();
        for info in subset {
            for slot in model.reference_slots(info.handle) {
                if slot.containment {
                    continue;
                }
                for target in slot.targets.iter().flatten() {
                    if members.contains(*target) {
                        out.push(Edge {
                            source: info.handle,
                            feature: SmolStr::new(slot.feature),
                            target: *target,
                            containment: false,
                        });
                    }
                }
            }
        }
        out
    }

    fn push_node<M: ModelAccess + ?Sized>(&mut self, model: &M, handle: ObjectHandle, path: CanonicalPath) -> usize {
        let position = self.nodes.len();
        let local_id = LocalId::from_ordinal(position + 1);
        let preferred_id = model
            .document_id(handle)
            .map(str::to_string)
            .unwrap_or_else(|| local_id.to_string());
        self.index.insert(handle, position);
        self.nodes.push(ObjectInfo {
            handle,
            local_id,
            path,
            preferred_id,
        });
        position
    }
}

/// Position table over an arbitrary node subset.
pub fn subset_table(subset: &[&ObjectInfo]) -> IdTable {
    let mut table = IdTable::with_capacity(subset.len());
    for (position, info) in subset.iter().enumerate() {
        table.insert(info.handle, position);
    }
    table
}

/// Containment slots of one object, consumed child by child.
struct Frame<'m> {
    position: usize,
    slots: Vec<ReferenceSlot<'m>>,
    slot: usize,
    index: usize,
}

impl<'m> Frame<'m> {
    fn new<M: ModelAccess + ?Sized>(model: &'m M, handle: ObjectHandle, position: usize) -> Self {
        Self {
            position,
            slots: model
                .reference_slots(handle)
                .into_iter()
                .filter(|s| s.containment)
                .collect(),
            slot: 0,
            index: 0,
        }
    }

    /// Next non-null child as `(feature, slot index, child)`.
    fn next_child(&mut self) -> Option<(&'m str, usize, ObjectHandle)> {
        while let Some(slot) = self.slots.get(self.slot) {
            if let Some(member) = slot.targets.get(self.index) {
                let index = self.index;
                self.index += 1;
                if let Some(child) = member {
                    return Some((slot.feature, index, *child));
                }
            } else {
                self.slot += 1;
                self.index = 0;
            }
        }
        None
    }
}

/// Walk containment from `roots` in pre-order.
///
/// Children are visited in feature-declaration order, then slot order. An
/// object reached a second time (including a root already reached from an
/// earlier root) keeps its first path and gets no further edge.
pub fn build_object_graph<M: ModelAccess + ?Sized>(model: &M, roots: &[ObjectHandle]) -> ObjectGraph {
    let mut graph = ObjectGraph::default();

    for (root_index, root) in roots.iter().copied().enumerate() {
        if graph.contains(root) {
            continue;
        }
        let path = CanonicalPath::root(model.class_name(root), root_index);
        let position = graph.push_node(model, root, path);
        let mut stack = vec![Frame::new(model, root, position)];

        while let Some(frame) = stack.last_mut() {
            let Some((feature, index, child)) = frame.next_child() else {
                stack.pop();
                continue;
            };
            if graph.contains(child) {
                continue;
            }
            let parent = frame.position;
            let path = graph.nodes[parent].path.child(feature, index);
            let child_position = graph.push_node(model, child, path);
            graph.edges.push(Edge {
                source: graph.nodes[parent].handle,
                feature: SmolStr::new(feature),
                target: child,
                containment: true,
            });
            stack.push(Frame::new(model, child, child_position));
        }
    }

    debug!(
        "Built object graph: nodes={} edges={}",
        graph.nodes.len(),
        graph.edges.len()
    );
    graph
}
