//! Explicit transform hierarchy
//!
//! Nodes live in one arena and refer to their parent by index. A parent is
//! always inserted before its children, so a single forward pass computes
//! every world transform. Parents may only rotate about Y.

use crate::game::presentation::{GraphicsHandle, Presentation, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u16);

#[derive(Debug, Clone)]
struct TransformNode {
    parent: Option<NodeId>,
    local: Transform,
    world: Transform,
    visual: Option<GraphicsHandle>,
}

#[derive(Debug, Default)]
pub struct TransformArena {
    nodes: Vec<TransformNode>,
}

impl TransformArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_root(&mut self, local: Transform, visual: Option<GraphicsHandle>) -> NodeId {
        self.push(None, local, visual)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeId,
        local: Transform,
        visual: Option<GraphicsHandle>,
    ) -> NodeId {
        self.push(Some(parent), local, visual)
    }

    fn push(&mut self, parent: Option<NodeId>, local: Transform, visual: Option<GraphicsHandle>) -> NodeId {
        let id = NodeId(self.nodes.len() as u16);
        self.nodes.push(TransformNode {
            parent,
            local,
            world: local,
            visual,
        });
        id
    }

    pub fn local(&self, id: NodeId) -> &Transform {
        &self.nodes[id.0 as usize].local
    }

    pub fn local_mut(&mut self, id: NodeId) -> &mut Transform {
        &mut self.nodes[id.0 as usize].local
    }

    pub fn world(&self, id: NodeId) -> &Transform {
        &self.nodes[id.0 as usize].world
    }

    pub fn visual(&self, id: NodeId) -> Option<GraphicsHandle> {
        self.nodes[id.0 as usize].visual
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recompute world transforms from the roots down
    pub fn propagate(&mut self) {
        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];
            let world = match node.parent {
                None => node.local,
                Some(parent) => compose(&self.nodes[parent.0 as usize].world, &node.local),
            };
            self.nodes[i].world = world;
        }
    }

    /// Write world transforms to every node that has a visual
    pub fn push_to(&self, gfx: &mut dyn Presentation) {
        for node in &self.nodes {
            if let Some(handle) = node.visual {
                gfx.set_transform(handle, node.world.position, node.world.rotation, node.world.scale);
            }
        }
    }
}

fn compose(parent: &Transform, local: &Transform) -> Transform {
    let offset = local.position.scale_by(parent.scale).rotate_y(parent.rotation.y);
    Transform {
        position: parent.position + offset,
        rotation: parent.rotation + local.rotation,
        scale: parent.scale.scale_by(local.scale),
    }
}
