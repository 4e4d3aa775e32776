//! Scene graph and hierarchical scene organization.
//!
//! Subtrees are assembled as owned [`SceneNode`] values (children held by value) and
//! only become part of the [`SceneGraph`] through [`SceneGraph::insert`], which moves
//! the complete subtree into the arena in one call. A reader of the graph therefore
//! never sees a group whose children are still being built.
//!
//! The arena is append-only: nodes are never removed or re-parented, and a child is
//! always stored after its parent. The latter lets world transforms be computed in a
//! single forward pass.

use std::fmt::Debug;

use anyhow::bail;
use cgmath::SquareMatrix;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        light::Light,
        model::Mesh,
    },
    render::{DrawItem, LightItem},
};

/// Handle of a node that lives in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a node contributes to a frame, besides its transform.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Pure grouping node.
    Group,
    Mesh(Mesh),
    Light(Light),
}

/// A detached node and its (detached) children.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Instance,
    pub payload: Payload,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Instance::new(),
            payload: Payload::Group,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            payload: Payload::Mesh(mesh),
            ..Self::group(name)
        }
    }

    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self {
            payload: Payload::Light(light),
            ..Self::group(name)
        }
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(SceneNode::subtree_len).sum::<usize>()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.payload, Payload::Group)
    }
}

/// A node stored in the graph.
#[derive(Debug)]
pub struct Node {
    name: String,
    local: Instance,
    world: cgmath::Matrix4<f32>,
    payload: Payload,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &Instance {
        &self.local
    }

    /// World transform as of the last [`SceneGraph::update_world_transforms`] or insertion.
    pub fn world(&self) -> &cgmath::Matrix4<f32> {
        &self.world
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Owner of every node in the scene.
///
/// Mutation needs `&mut SceneGraph`, traversal `&SceneGraph`; the borrow checker keeps
/// the two apart, so whoever owns the graph decides when insertions happen.
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "scene".to_string(),
                local: Instance::new(),
                world: cgmath::Matrix4::identity(),
                payload: Payload::Group,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn transform(&self, id: NodeId) -> Option<&Instance> {
        self.nodes.get(id.0).map(|node| &node.local)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Instance> {
        self.nodes.get_mut(id.0).map(|node| &mut node.local)
    }

    /// Moves a fully built subtree under `parent` and returns the id of its root.
    ///
    /// Fails (dropping the subtree) if `parent` is not part of this graph.
    pub fn insert(&mut self, parent: NodeId, node: SceneNode) -> anyhow::Result<NodeId> {
        if !self.contains(parent) {
            bail!(
                "Cannot insert {:?} under {:?}: the graph only has {} nodes.",
                node.name,
                parent,
                self.nodes.len()
            );
        }
        self.nodes.reserve(node.subtree_len());
        Ok(self.attach(parent, node))
    }

    fn attach(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        let world = self.nodes[parent.0].world * node.transform.to_matrix();
        self.nodes.push(Node {
            name: node.name,
            local: node.transform,
            world,
            payload: node.payload,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        for child in node.children {
            self.attach(id, child);
        }
        id
    }

    /// Recomputes every world matrix from the local transforms.
    pub fn update_world_transforms(&mut self) {
        for idx in 0..self.nodes.len() {
            let local = self.nodes[idx].local.to_matrix();
            let world = match self.nodes[idx].parent {
                // parents are always stored before their children
                Some(parent) => self.nodes[parent.0].world * local,
                None => local,
            };
            self.nodes[idx].world = world;
        }
    }

    /// Depth-first, pre-order walk starting at `from`.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut visited = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                visited.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        visited
    }

    pub fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = self.get(of).and_then(Node::parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(Node::parent);
        }
        false
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    /// Every mesh in the graph with its current world transform.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| match &node.payload {
                Payload::Mesh(mesh) => Some(DrawItem {
                    node: NodeId(idx),
                    mesh,
                    instance: InstanceRaw::from_world(&node.world),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn lights(&self) -> Vec<LightItem> {
        self.nodes
            .iter()
            .filter_map(|node| match node.payload {
                Payload::Light(light) => Some(LightItem {
                    light,
                    position: node.world.w.truncate(),
                }),
                _ => None,
            })
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
