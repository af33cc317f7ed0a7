//! Common utilities for frame graph integration tests.
//!
//! Tests build small graphs out of [`TestPass`]es, closures that run as a
//! pass's setup and execute, and share resource handles between passes and
//! across frames through a [`Board`].

#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use glam::{Vec3, Vec4};
use parking_lot::Mutex;

use framegraph_engine::backend::{CommandBuffer, QueueKind};
use framegraph_engine::error::GraphResult;
use framegraph_engine::render_graph::{
    FrameGraphBuilder, FrameGraphPass, FrameGraphPassResources, FrameGraphResource, PassOutput,
};
use framegraph_engine::scene::{DirectionalLight, Light, Mesh, PointLight, RenderObject, Scene};

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Shared handles
// ============================================================================

/// Named resource handles shared by test passes and the test body
#[derive(Clone, Default)]
pub struct Board(Arc<Mutex<HashMap<String, FrameGraphResource>>>);

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, resource: FrameGraphResource) {
        self.0.lock().insert(name.to_string(), resource);
    }

    /// The handle stored under `name`, or an unassigned handle
    pub fn get(&self, name: &str) -> FrameGraphResource {
        self.0.lock().get(name).copied().unwrap_or_default()
    }
}

// ============================================================================
// Test passes
// ============================================================================

pub type SetupFn = Box<dyn FnMut(&mut FrameGraphBuilder, &Board) -> GraphResult<()> + Send + Sync>;
pub type ExecuteFn =
    Box<dyn Fn(&FrameGraphPassResources, &Board) -> GraphResult<()> + Send + Sync>;

/// Pass made of closures.
///
/// The registry holds one pass per type, so every pass of a test uses a
/// different `ID`. Execute submits one empty command buffer labelled with
/// the pass name to `queue`.
pub struct TestPass<const ID: usize> {
    name: String,
    board: Board,
    queue: QueueKind,
    setup: SetupFn,
    execute: ExecuteFn,
}

impl<const ID: usize> TestPass<ID> {
    pub fn new(
        name: &str,
        board: &Board,
        setup: impl FnMut(&mut FrameGraphBuilder, &Board) -> GraphResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            board: board.clone(),
            queue: QueueKind::Render,
            setup: Box::new(setup),
            execute: Box::new(|_, _| Ok(())),
        }
    }

    pub fn on_execute(
        mut self,
        execute: impl Fn(&FrameGraphPassResources, &Board) -> GraphResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.execute = Box::new(execute);
        self
    }

    pub fn on_queue(mut self, queue: QueueKind) -> Self {
        self.queue = queue;
        self
    }
}

impl<const ID: usize> FrameGraphPass for TestPass<ID> {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        (self.setup)(builder, &self.board)
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        (self.execute)(resources, &self.board)?;
        output.submit(self.queue, CommandBuffer::begin(self.name.clone()).end());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Scenes
// ============================================================================

/// Opaque and transparent cubes lit by a sun and two point lights, one casting shadows
pub fn demo_scene() -> Scene {
    let cube = Arc::new(Mesh::cube("cube"));
    let mut scene = Scene::new();
    scene.add_object(RenderObject::new(cube.clone()).with_position(Vec3::new(-1.0, 0.0, 0.0)));
    scene.add_object(RenderObject::new(cube.clone()).with_position(Vec3::new(1.0, 0.0, 0.0)));
    scene.add_object(
        RenderObject::new(cube)
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .with_albedo(Vec4::new(0.2, 0.4, 1.0, 0.5)),
    );
    scene.add_light(Light::Directional(DirectionalLight::default()));
    scene.add_light(Light::Point(PointLight::new(
        Vec3::new(0.0, 3.0, 0.0),
        Vec3::ONE,
        2.0,
        10.0,
    )));
    scene.add_light(Light::Point(
        PointLight::new(Vec3::new(2.0, 2.0, 2.0), Vec3::new(1.0, 0.8, 0.6), 1.0, 8.0)
            .with_shadows(),
    ));
    scene
}
