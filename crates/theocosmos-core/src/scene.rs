use glam::Vec3;
use std::collections::{HashMap, HashSet};

use crate::corpus::{parse_hex_color, Corpus, NodeId};

pub const HUB_RADIUS: f32 = 2.2;
pub const SUB_RADIUS: f32 = 0.37;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Locus,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Implicit locus↔sub ownership edge.
    Parent,
    /// Explicit authored cross-reference, stored once per unordered pair.
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// One positioned sphere of the cosmos. Position and radius are fixed after
/// layout; live visual attributes are kept separately by the engine.
#[derive(Debug, Clone)]
pub struct VisualNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub position: Vec3,
    pub radius: f32,
    pub color: [f32; 3],
    pub category: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<Edge>,
    index: HashMap<NodeId, usize>,
}

impl SceneGraph {
    /// Layout is a pure function of record order and fields: building twice
    /// from the same corpus yields identical positions, radii and edges.
    pub fn build(corpus: &Corpus) -> Self {
        let mut scene = SceneGraph::default();
        let outer_count = corpus
            .loci
            .iter()
            .filter(|l| l.order != 0)
            .count()
            .max(1);
        let golden = (1.0 + 5.0f32.sqrt()) / 2.0;
        let mut outer_idx = 0usize;

        for locus in &corpus.loci {
            let is_hub = locus.order == 0;
            let pos = if is_hub {
                Vec3::ZERO
            } else {
                // Fibonacci hemisphere for even angular spacing; heavier loci
                // sit on wider shells and ride slightly higher.
                let i = outer_idx as f32;
                outer_idx += 1;
                let theta = std::f32::consts::TAU * i / golden;
                let phi = (1.0 - (i + 0.5) / outer_count as f32).acos();
                let shell = 18.0 + locus.weight * 4.0;
                Vec3::new(
                    shell * phi.sin() * theta.cos(),
                    shell * phi.cos() * 0.75 + (locus.weight - 1.3) * 2.5,
                    shell * phi.sin() * theta.sin(),
                )
            };
            let radius = if is_hub {
                HUB_RADIUS
            } else {
                0.5 + locus.weight * 0.5
            };
            let color = parse_hex_color(&locus.color).unwrap_or([0.8, 0.8, 0.8]);

            scene.push_node(VisualNode {
                id: locus.id.clone(),
                kind: NodeKind::Locus,
                parent: None,
                position: pos,
                radius,
                color,
                category: locus.category.clone(),
                name: locus.name.clone(),
            });

            // Sub-topics ring their parent at a deterministic jittered
            // distance (jitter is a pure function of the sub's index).
            let sub_count = locus.subs.len().max(1) as f32;
            for (si, sub) in locus.subs.iter().enumerate() {
                let angle = (si as f32 / sub_count) * std::f32::consts::TAU;
                let dist = radius + 2.5 + sub_jitter(si);
                let sub_pos = Vec3::new(
                    pos.x + angle.cos() * dist,
                    pos.y + (angle * 0.4).sin() * dist * 0.3,
                    pos.z + angle.sin() * dist,
                );
                scene.push_node(VisualNode {
                    id: sub.id.clone(),
                    kind: NodeKind::Sub,
                    parent: Some(locus.id.clone()),
                    position: sub_pos,
                    radius: SUB_RADIUS,
                    color,
                    category: sub.category.clone().unwrap_or_else(|| locus.category.clone()),
                    name: sub.name.clone(),
                });
                scene.edges.push(Edge {
                    from: sub.id.clone(),
                    to: locus.id.clone(),
                    kind: EdgeKind::Parent,
                });
            }
        }

        // Cross-references, deduplicated per unordered pair; unknown targets
        // are skipped rather than rejected.
        let mut edge_keys: HashSet<(NodeId, NodeId)> = scene
            .edges
            .iter()
            .map(|e| pair_key(&e.from, &e.to))
            .collect();
        for locus in &corpus.loci {
            for target in &locus.cross_refs {
                if !scene.index.contains_key(target) {
                    continue;
                }
                let key = pair_key(&locus.id, target);
                if edge_keys.insert(key) {
                    scene.edges.push(Edge {
                        from: locus.id.clone(),
                        to: target.clone(),
                        kind: EdgeKind::Cross,
                    });
                }
            }
        }

        scene
    }

    fn push_node(&mut self, node: VisualNode) {
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &NodeId) -> Option<&VisualNode> {
        self.node_index(id).map(|i| &self.nodes[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn pair_key(a: &NodeId, b: &NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

fn sub_jitter(si: usize) -> f32 {
    ((si * 7919) % 97) as f32 / 97.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Locus, SubTopic};

    fn corpus_three_loci() -> Corpus {
        let locus = |id: &str, order: u32, weight: f32, cross: Vec<&str>| Locus {
            id: NodeId(id.to_string()),
            name: id.to_uppercase(),
            category: "godhead".to_string(),
            color: "#e0c050".to_string(),
            weight,
            order,
            description: String::new(),
            keywords: Vec::new(),
            subs: Vec::new(),
            cross_refs: cross.into_iter().map(|s| NodeId(s.to_string())).collect(),
        };
        Corpus {
            loci: vec![
                locus("christ", 0, 2.0, vec!["trinity"]),
                locus("trinity", 1, 1.6, vec!["christ"]),
                locus("spirit", 2, 1.4, vec!["missing"]),
            ],
            paths: Vec::new(),
        }
    }

    #[test]
    fn build_is_deterministic() {
        let corpus = corpus_three_loci();
        let a = SceneGraph::build(&corpus);
        let b = SceneGraph::build(&corpus);
        assert_eq!(a.nodes.len(), b.nodes.len());
        for (na, nb) in a.nodes.iter().zip(b.nodes.iter()) {
            assert_eq!(na.id, nb.id);
            assert_eq!(na.position, nb.position);
            assert_eq!(na.radius, nb.radius);
        }
        assert_eq!(a.edges, b.edges);
    }

    #[test]
    fn hub_sits_at_origin_with_fixed_radius() {
        let scene = SceneGraph::build(&corpus_three_loci());
        let hub = scene.node(&NodeId("christ".to_string())).expect("hub");
        assert_eq!(hub.position, Vec3::ZERO);
        assert_eq!(hub.radius, HUB_RADIUS);
        let outer = scene.node(&NodeId("trinity".to_string())).expect("outer");
        assert!(outer.position.length() > 10.0);
    }

    #[test]
    fn cross_refs_dedup_and_skip_unknown_targets() {
        let scene = SceneGraph::build(&corpus_three_loci());
        let cross: Vec<_> = scene
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Cross)
            .collect();
        // christ↔trinity authored from both sides → stored once; the
        // dangling "missing" ref is dropped.
        assert_eq!(cross.len(), 1);
    }

    #[test]
    fn subs_resolve_to_parent_and_get_parent_edges() {
        let mut corpus = corpus_three_loci();
        corpus.loci[1].subs = vec![
            SubTopic {
                id: NodeId("persons".to_string()),
                name: "Three Persons".to_string(),
                category: None,
                description: String::new(),
                keywords: Vec::new(),
            },
            SubTopic {
                id: NodeId("perichoresis".to_string()),
                name: "Perichoresis".to_string(),
                category: Some("mystery".to_string()),
                description: String::new(),
                keywords: Vec::new(),
            },
        ];
        let scene = SceneGraph::build(&corpus);
        for node in scene.nodes.iter().filter(|n| n.kind == NodeKind::Sub) {
            let parent = node.parent.as_ref().expect("sub has parent");
            let parent_node = scene.node(parent).expect("parent resolves");
            assert_eq!(parent_node.kind, NodeKind::Locus);
            assert!(node.position.distance(parent_node.position) > parent_node.radius);
        }
        let parent_edges = scene
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Parent)
            .count();
        assert_eq!(parent_edges, 2);
        // Inherited vs. explicit sub category.
        assert_eq!(
            scene.node(&NodeId("persons".to_string())).unwrap().category,
            "godhead"
        );
        assert_eq!(
            scene
                .node(&NodeId("perichoresis".to_string()))
                .unwrap()
                .category,
            "mystery"
        );
    }

    #[test]
    fn sub_radii_below_locus_radii() {
        let mut corpus = corpus_three_loci();
        corpus.loci[0].subs = vec![SubTopic {
            id: NodeId("kenosis".to_string()),
            name: "Kenosis".to_string(),
            category: None,
            description: String::new(),
            keywords: Vec::new(),
        }];
        let scene = SceneGraph::build(&corpus);
        let min_locus = scene
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Locus)
            .map(|n| n.radius)
            .fold(f32::INFINITY, f32::min);
        assert!(SUB_RADIUS < min_locus);
    }
}
