//! Frame graph executor
//!
//! Turns a resolved graph into device work: realises physical objects, runs
//! uploads, executes passes batch by batch and submits the produced command
//! buffers in resolved order.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::backend::command::RecordedCommands;
use crate::backend::traits::*;
use crate::error::{FrameError, GraphError, GraphResult};
use crate::render_graph::builder::{FrameGraph, PendingUpload};
use crate::render_graph::pass::{FrameGraphPass, PassId};
use crate::render_graph::pool::ResourcePool;
use crate::render_graph::resolver::{PhysicalBinding, ResolvedGraph};
use crate::render_graph::resource::FrameGraphResource;
use crate::render_graph::resources::{FrameGraphPassResources, PassOutput};
use crate::scene::Scene;
use crate::settings::FrameGraphSettings;

/// Counters of one executed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub uploads: usize,
    pub command_buffers: usize,
    pub submissions: usize,
    pub queue_fallbacks: usize,
}

/// Executor for running resolved frame graphs
#[derive(Debug, Default)]
pub struct FrameGraphExecutor {
    pool: ResourcePool,
}

impl FrameGraphExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Bind every referenced resource to a physical object
    pub fn realize<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        graph: &FrameGraph,
        resolved: &ResolvedGraph,
    ) -> Result<HashMap<FrameGraphResource, GpuObject>, FrameError> {
        let frame = graph.frame_index();
        self.pool.begin_frame();

        // Unreferenced carried objects become available to this frame first
        for resource in &resolved.released {
            log::debug!(
                "Releasing carried resource '{}' no pass referenced",
                graph.describe(*resource)
            );
            self.pool.release_persistent(resource.key(), frame);
        }

        let mut slot_objects = Vec::with_capacity(resolved.alias_plan.slots.len());
        for slot in &resolved.alias_plan.slots {
            slot_objects.push(self.pool.acquire(device, &slot.desc)?);
        }

        let mut objects = HashMap::with_capacity(resolved.bindings.len());
        for (&resource, binding) in &resolved.bindings {
            let object = match *binding {
                PhysicalBinding::Imported(object) => object,
                PhysicalBinding::Transient { slot } => slot_objects[slot],
                PhysicalBinding::Persistent => {
                    let entry = graph.validate(resource, "realize")?;
                    self.pool
                        .realize_persistent(device, resource.key(), &entry.desc, frame)?
                }
            };
            objects.insert(resource, object);
        }

        let stats = self.pool.stats();
        log::debug!(
            "Realised {} resources: {} objects created, {} reused, {} aliased",
            objects.len(),
            stats.created,
            stats.reused,
            resolved.alias_plan.aliased_count()
        );
        Ok(objects)
    }

    /// Run uploads and execute every pass, batch by batch.
    ///
    /// Returns the output of each pass, indexed by pass id.
    #[allow(clippy::too_many_arguments)]
    pub fn execute<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        graph: &mut FrameGraph,
        resolved: &ResolvedGraph,
        passes: &[Box<dyn FrameGraphPass>],
        objects: &HashMap<FrameGraphResource, GpuObject>,
        scene: &Scene,
        settings: &FrameGraphSettings,
        stats: &mut ExecutionStats,
    ) -> Result<Vec<PassOutput>, FrameError> {
        let render_resolution = device.back_buffer().desc.size.scaled(settings.render_scale);

        let mut uploads: HashMap<PassId, Vec<PendingUpload>> = HashMap::new();
        for upload in graph.take_uploads() {
            uploads.entry(upload.pass).or_default().push(upload);
        }

        let graph: &FrameGraph = graph;
        let mut outputs: Vec<Option<PassOutput>> =
            (0..graph.passes().len()).map(|_| None).collect();

        for batch in &resolved.batches {
            for pass in batch {
                for upload in uploads.remove(pass).unwrap_or_default() {
                    let object = objects
                        .get(&upload.resource)
                        .copied()
                        .ok_or_else(|| GraphError::StaleHandle {
                            handle: format!("{:?}", upload.resource),
                        })?;
                    let data = (upload.producer)();
                    device.upload(object, data.as_bytes())?;
                    stats.uploads += 1;
                }
            }

            let run = |&id: &PassId| -> GraphResult<(PassId, PassOutput)> {
                let node = &graph.passes()[id.index()];
                let resources = FrameGraphPassResources {
                    node,
                    graph,
                    objects,
                    scene,
                    settings,
                    render_resolution,
                };
                let mut output = PassOutput::new();
                log::trace!("Executing pass '{}'", node.name);
                passes[id.index()].execute(&resources, &mut output)?;
                Ok((id, output))
            };

            let results: Vec<GraphResult<(PassId, PassOutput)>> =
                if settings.parallel_execute && batch.len() > 1 {
                    batch.par_iter().map(run).collect()
                } else {
                    batch.iter().map(run).collect()
                };

            for result in results {
                let (id, output) = result?;
                outputs[id.index()] = Some(output);
            }
        }

        Ok(outputs
            .into_iter()
            .map(|output| output.unwrap_or_default())
            .collect())
    }

    /// Submit pass outputs in resolved order.
    ///
    /// Consecutive buffers for the same queue go out in one submit call.
    /// Buffers for a queue the device lacks fall back to the render queue.
    pub fn submit<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        resolved: &ResolvedGraph,
        outputs: Vec<PassOutput>,
        stats: &mut ExecutionStats,
    ) -> Result<(), FrameError> {
        let capabilities = device.queue_capabilities();
        let mut outputs: Vec<Option<PassOutput>> = outputs.into_iter().map(Some).collect();

        let mut pending: Vec<RecordedCommands> = Vec::new();
        let mut pending_queue = QueueKind::Render;

        for pass in &resolved.order {
            let Some(output) = outputs.get_mut(pass.index()).and_then(Option::take) else {
                continue;
            };
            for (requested, buffer) in output.into_submissions() {
                let queue = if capabilities.supports(requested) {
                    requested
                } else {
                    log::warn!(
                        "{:?} queue unavailable, submitting '{}' to the render queue",
                        requested,
                        buffer.label()
                    );
                    stats.queue_fallbacks += 1;
                    QueueKind::Render
                };

                if queue != pending_queue && !pending.is_empty() {
                    device.submit(pending_queue, &pending)?;
                    stats.submissions += 1;
                    pending.clear();
                }
                pending_queue = queue;
                stats.command_buffers += 1;
                pending.push(buffer);
            }
        }

        if !pending.is_empty() {
            device.submit(pending_queue, &pending)?;
            stats.submissions += 1;
        }
        Ok(())
    }

    /// Return this frame's objects to the pool and trim idle ones
    pub fn finish_frame<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        graph: &FrameGraph,
        max_idle_frames: u32,
    ) {
        self.pool.end_frame(
            device,
            graph.frame_index(),
            |key| graph.survives(key),
            max_idle_frames,
        );
    }

    /// Destroy every pooled object
    pub fn cleanup<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        self.pool.clear(device);
    }
}
