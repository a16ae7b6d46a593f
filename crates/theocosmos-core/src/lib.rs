//! Render and spatial-query core of the theological cosmos.
//!
//! This crate is deliberately free of any rendering backend: it owns the
//! doctrine scene graph, the spatial indexes, the orbit camera model, the
//! per-frame visual-state resolution and the dirty-frame scheduling. The
//! viewer crate feeds it input events and reads back positions, visual
//! attributes and camera pose for drawing.

pub mod adjacency;
pub mod bridge;
pub mod camera;
pub mod corpus;
pub mod engine;
pub mod flythrough;
pub mod geom;
pub mod octree;
pub mod quality;
pub mod scene;
pub mod scheduler;
pub mod study;
pub mod visual;

pub use adjacency::AdjacencyIndex;
pub use bridge::EngineBridge;
pub use camera::CameraRig;
pub use corpus::{Corpus, CorpusError, GuidedPath, Locus, NodeId, SubTopic};
pub use engine::{Engine, HoverNotice, TickReport};
pub use flythrough::Flythrough;
pub use octree::{Octree, SpatialItem};
pub use quality::{QualityPreset, QualityTier};
pub use scene::{Edge, EdgeKind, NodeKind, SceneGraph, VisualNode};
pub use scheduler::DirtyScheduler;
pub use study::{LearningState, StudyProgress};
