//! Main engine orchestrator
//!
//! Drives one frame through the frame graph:
//! reset, pass setup in registration order, resolve, realize, execute,
//! submit and release. Any error discards the frame's recorded graph while
//! objects persisted by earlier frames stay valid.

use crate::backend::traits::RenderDevice;
use crate::error::{FrameError, GraphResult};
use crate::pipeline::{register_deferred_pipeline, DeferredConfig};
use crate::render_graph::{
    resolve, ExecutionStats, FrameGraph, FrameGraphBuilder, FrameGraphExecutor, PassId,
    PassRegistry, ResolvedGraph,
};
use crate::scene::Scene;
use crate::settings::FrameGraphSettings;

/// Summary of one rendered frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    /// Pass names in execution order
    pub pass_order: Vec<String>,
    /// Pass names grouped into independent batches
    pub batches: Vec<Vec<String>>,
    /// Physical objects created this frame
    pub created: usize,
    /// Requests served by pooled or persisted objects
    pub reused: usize,
    /// Idle objects destroyed at the end of the frame
    pub destroyed: usize,
    /// Transient resources sharing a physical object with another transient
    pub aliased: usize,
    /// Physical objects backing this frame's transients
    pub transient_objects: usize,
    pub culled: usize,
    pub released: usize,
    pub execution: ExecutionStats,
}

/// Frame driver owning the device, the passes and every pooled object
pub struct Engine<D: RenderDevice> {
    device: D,
    settings: FrameGraphSettings,
    registry: PassRegistry,
    graph: FrameGraph,
    executor: FrameGraphExecutor,
    frame_index: u64,
}

impl<D: RenderDevice> Engine<D> {
    /// Create an engine without passes
    pub fn new(device: D, settings: FrameGraphSettings) -> GraphResult<Self> {
        settings.validate()?;
        log::info!("Creating frame graph engine on '{}'", device.name());
        Ok(Self {
            device,
            settings,
            registry: PassRegistry::new(),
            graph: FrameGraph::new(),
            executor: FrameGraphExecutor::new(),
            frame_index: 0,
        })
    }

    /// Create an engine running the deferred pipeline
    pub fn with_deferred_pipeline(
        device: D,
        settings: FrameGraphSettings,
        config: &DeferredConfig,
    ) -> GraphResult<Self> {
        let mut engine = Self::new(device, settings)?;
        register_deferred_pipeline(&mut engine.registry, config)?;
        Ok(engine)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn registry(&self) -> &PassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PassRegistry {
        &mut self.registry
    }

    pub fn settings(&self) -> &FrameGraphSettings {
        &self.settings
    }

    /// Replace the settings. Invalid settings are rejected and the current ones kept.
    pub fn set_settings(&mut self, settings: FrameGraphSettings) -> GraphResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Index the next rendered frame will get
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn executor(&self) -> &FrameGraphExecutor {
        &self.executor
    }

    /// Render one frame of `scene`
    pub fn render_frame(&mut self, scene: &Scene) -> Result<FrameReport, FrameError> {
        let frame = self.frame_index;
        self.frame_index += 1;
        self.graph.reset(frame);

        match self.run_frame(scene) {
            Ok(report) => Ok(report),
            Err(err) => {
                log::error!("Discarding frame {}: {}", frame, err);
                let pool = self.executor.pool();
                self.graph
                    .abort(|key, desc| pool.holds_persistent(key, desc));
                self.executor
                    .finish_frame(&mut self.device, &self.graph, self.settings.max_idle_frames);
                Err(err)
            }
        }
    }

    fn run_frame(&mut self, scene: &Scene) -> Result<FrameReport, FrameError> {
        let back_buffer = self.device.back_buffer();
        for pass in self.registry.passes_mut() {
            let id = self.graph.begin_pass(pass.name());
            let mut builder =
                FrameGraphBuilder::new(&mut self.graph, id, &self.settings, scene, &back_buffer);
            pass.setup(&mut builder)?;
        }

        let resolved = resolve(&self.graph, &self.settings)?;
        log::debug!(
            "Frame {} order: {:?}",
            self.graph.frame_index(),
            names(&self.graph, &resolved.order)
        );

        let objects = self
            .executor
            .realize(&mut self.device, &self.graph, &resolved)?;

        let mut execution = ExecutionStats::default();
        let outputs = self.executor.execute(
            &mut self.device,
            &mut self.graph,
            &resolved,
            self.registry.passes(),
            &objects,
            scene,
            &self.settings,
            &mut execution,
        )?;
        self.executor
            .submit(&mut self.device, &resolved, outputs, &mut execution)?;
        self.executor
            .finish_frame(&mut self.device, &self.graph, self.settings.max_idle_frames);

        Ok(self.report(&resolved, execution))
    }

    fn report(&self, resolved: &ResolvedGraph, execution: ExecutionStats) -> FrameReport {
        let stats = self.executor.pool().stats();
        FrameReport {
            frame_index: self.graph.frame_index(),
            pass_order: names(&self.graph, &resolved.order),
            batches: resolved
                .batches
                .iter()
                .map(|batch| names(&self.graph, batch))
                .collect(),
            created: stats.created,
            reused: stats.reused,
            destroyed: stats.destroyed,
            aliased: resolved.alias_plan.aliased_count(),
            transient_objects: resolved.alias_plan.slots.len(),
            culled: resolved.culled.len(),
            released: resolved.released.len(),
            execution,
        }
    }

    /// Destroy every pooled object. The engine can keep rendering afterwards.
    pub fn shutdown(&mut self) {
        log::info!("Shutting down frame graph engine");
        self.graph.clear();
        self.executor.cleanup(&mut self.device);
    }
}

fn names(graph: &FrameGraph, passes: &[PassId]) -> Vec<String> {
    passes
        .iter()
        .filter_map(|&id| graph.pass(id))
        .map(|node| node.name.clone())
        .collect()
}
