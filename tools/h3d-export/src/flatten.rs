//! Scene flattening
//!
//! Turns the source node hierarchy into engine joints and meshes:
//!
//! | source node              | output                                       |
//! |--------------------------|----------------------------------------------|
//! | joint, no instance       | joint                                        |
//! | joint, instances         | joint + child mesh (+ submeshes under it)    |
//! | node, no instance        | nothing, transform passed on to children     |
//! | node, instances          | mesh (+ submeshes under it)                  |
//!
//! Transforms of pass-through nodes are accumulated, both the static matrix
//! and every sampled animation frame, and folded into the next emitted node.

use glam::Mat4;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::rig::is_valid_instance;
use crate::scene::{JointNode, MeshNode, NodeCommon, NodeId, OutputNode, SceneGraph};
use crate::source::{convert_matrix, SceneChild, SourceDocument, SourceInstance, SourceNode};

/// Result of flattening a document
#[derive(Debug, Clone, Default)]
pub struct FlattenedScene {
    pub graph: SceneGraph,
    pub frame_count: usize,
    /// False when a channel's sample count didn't match the frame count
    pub fully_sampled: bool,
}

/// Flatten the visual scene of `doc`
pub fn flatten(doc: &SourceDocument, diagnostics: &mut Diagnostics) -> FlattenedScene {
    let frame_count = doc.frame_count();
    let mut flattener = SceneFlattener {
        doc,
        axis: doc.axis(),
        frame_count,
        graph: SceneGraph::new(),
        fully_sampled: true,
        references: Vec::new(),
        diagnostics,
    };

    let identity_frames = vec![Mat4::IDENTITY; frame_count];
    for root in doc.scene.iter().flatten() {
        flattener.process_node(root, None, Mat4::IDENTITY, &identity_frames);
    }

    if !flattener.fully_sampled {
        flattener.diagnostics.warn(
            DiagnosticKind::DataQuality,
            "Animation is not sampled and will probably be wrong",
        );
    }

    FlattenedScene {
        graph: flattener.graph,
        frame_count,
        fully_sampled: flattener.fully_sampled,
    }
}

struct SceneFlattener<'a, 'd> {
    doc: &'a SourceDocument,
    axis: Option<Mat4>,
    frame_count: usize,
    graph: SceneGraph,
    fully_sampled: bool,
    /// Library references currently being expanded
    references: Vec<&'a str>,
    diagnostics: &'d mut Diagnostics,
}

impl<'a> SceneFlattener<'a, '_> {
    fn process_child(
        &mut self,
        child: &'a SceneChild,
        parent: Option<NodeId>,
        transform_accum: Mat4,
        anim_accum: &[Mat4],
    ) -> Option<NodeId> {
        match child {
            SceneChild::Node(node) => self.process_node(node, parent, transform_accum, anim_accum),
            SceneChild::InstanceNode(id) => {
                if self.references.contains(&id.as_str()) {
                    self.diagnostics.warn(
                        DiagnosticKind::Integrity,
                        format!("Recursive reference '{}' in instance_node", id),
                    );
                    return None;
                }
                let Some(node) = self.doc.find_library_node(id) else {
                    self.diagnostics.warn(
                        DiagnosticKind::Integrity,
                        format!("Undefined reference '{}' in instance_node", id),
                    );
                    return None;
                };
                self.references.push(id.as_str());
                let result = self.process_node(node, parent, transform_accum, anim_accum);
                self.references.pop();
                result
            }
        }
    }

    fn process_node(
        &mut self,
        node: &'a SourceNode,
        parent: Option<NodeId>,
        transform_accum: Mat4,
        anim_accum: &[Mat4],
    ) -> Option<NodeId> {
        let local = convert_matrix(self.doc.static_transform(node), self.axis);
        let relative = transform_accum * local;

        let valid: Vec<&SourceInstance> = node
            .instances
            .iter()
            .filter(|instance| is_valid_instance(self.doc, &instance.url))
            .collect();

        let common = NodeCommon::new(node.name().to_string(), node.sid().to_string(), relative);
        let emitted = if node.joint {
            Some(self.graph.insert(
                OutputNode::Joint(JointNode {
                    common,
                    index: 0,
                    inverse_bind_matrix: Mat4::IDENTITY,
                    skin_bind_matrix: Mat4::IDENTITY,
                    used: false,
                }),
                parent,
            ))
        } else {
            valid.first().map(|instance| {
                self.graph.insert(
                    OutputNode::Mesh(MeshNode {
                        common,
                        instance: (*instance).clone(),
                        tri_groups: Vec::new(),
                        lod_level: 0,
                    }),
                    parent,
                )
            })
        };

        if let Some(id) = emitted {
            self.graph.ensure_unique_name(id, self.diagnostics);
            self.create_submeshes(id, node.joint, &valid);
        }

        let child_accum = if emitted.is_some() {
            Mat4::IDENTITY
        } else {
            relative
        };

        let mut child_anim_accum = Vec::with_capacity(self.frame_count);
        for (frame, accum) in anim_accum.iter().enumerate() {
            let (sampled, fully_sampled) =
                self.doc.sample_transform(node, frame, self.frame_count);
            self.fully_sampled &= fully_sampled;
            let m = *accum * convert_matrix(sampled, self.axis);
            match emitted {
                Some(id) => {
                    self.graph.node_mut(id).common_mut().frames.push(m);
                    child_anim_accum.push(Mat4::IDENTITY);
                }
                None => child_anim_accum.push(m),
            }
        }

        let child_parent = emitted.or(parent);
        for child in &node.children {
            let child_id = self.process_child(child, child_parent, child_accum, &child_anim_accum);
            if let (Some(child_id), Some(p)) = (child_id, child_parent) {
                self.graph.attach(p, child_id);
            }
        }

        emitted
    }

    /// Template copies of the first mesh for every further valid instance.
    ///
    /// A joint with instances gets a mesh child holding the first instance;
    /// submeshes hang below that mesh. Copies have an identity relative
    /// transform and no frames. They keep the name of the node they were
    /// copied from and are not subject to the uniqueness rule.
    fn create_submeshes(&mut self, id: NodeId, joint: bool, valid: &[&SourceInstance]) {
        let Some(first) = valid.first() else {
            return;
        };

        let (owner, extra) = if joint {
            let template = self.template_copy(id, first);
            let mesh = self.graph.insert(OutputNode::Mesh(template), Some(id));
            self.graph.attach(id, mesh);
            (mesh, &valid[1..])
        } else {
            (id, &valid[1..])
        };

        for instance in extra {
            let copy = self.template_copy(owner, instance);
            let sub = self.graph.insert(OutputNode::Mesh(copy), Some(owner));
            self.graph.attach(owner, sub);
        }
    }

    fn template_copy(&self, source: NodeId, instance: &SourceInstance) -> MeshNode {
        let common = self.graph.node(source).common();
        MeshNode {
            common: NodeCommon::new(common.name.clone(), common.source_sid.clone(), Mat4::IDENTITY),
            instance: instance.clone(),
            tri_groups: Vec::new(),
            lod_level: 0,
        }
    }
}
