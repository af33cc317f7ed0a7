//! Frame Graph Engine - a frame graph based deferred/forward rendering core
//!
//! Passes declare the resources they create, read, write and persist. The
//! frame graph orders them by their data dependencies, aliases transient
//! resources with disjoint lifetimes onto shared GPU objects and submits the
//! recorded command buffers to the device queues.
//!
//! # Features
//! - Frame graph with automatic pass ordering and hazard validation
//! - Transient resource aliasing and a pooled, frame-persistent object cache
//! - Deferred pipeline with shadow mapping, forward transparency and compositing
//! - Backend abstraction with a headless recording device
//! - Batch-parallel pass execution on rayon

pub mod backend;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render_graph;
pub mod scene;
pub mod settings;

pub use backend::{HeadlessDevice, QueueKind, RenderDevice};
pub use engine::{Engine, FrameReport};
pub use error::{FrameError, GraphError, GraphResult};
pub use pipeline::{register_deferred_pipeline, DeferredConfig};
pub use render_graph::{
    FrameGraphBuilder, FrameGraphPass, FrameGraphPassResources, FrameGraphResource,
    FrameGraphSlot, PassOutput, PassRegistry,
};
pub use scene::Scene;
pub use settings::FrameGraphSettings;
