//! Physical resource pool
//!
//! Owns every GPU object the frame graph created:
//!
//! - persistent objects, keyed by the resource that persisted them
//! - objects in use by transient resources of the current frame
//! - free objects, grouped by descriptor, waiting to be reused
//!
//! Free objects that stay unused for more than `max_idle_frames` frames are
//! destroyed.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::render_graph::resource::{ResourceDesc, ResourceKey};

/// Allocation counters of one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects created on the device
    pub created: usize,
    /// Requests served by an existing object
    pub reused: usize,
    /// Objects destroyed on the device
    pub destroyed: usize,
}

#[derive(Debug)]
struct PersistentObject {
    object: GpuObject,
    desc: ResourceDesc,
}

#[derive(Debug)]
struct FreeObject {
    object: GpuObject,
    released_frame: u64,
}

/// Pool of physical objects backing frame graph resources
#[derive(Debug, Default)]
pub struct ResourcePool {
    persistent: HashMap<ResourceKey, PersistentObject>,
    free: HashMap<ResourceDesc, Vec<FreeObject>>,
    in_use: Vec<(GpuObject, ResourceDesc)>,
    stats: PoolStats,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-frame counters
    pub fn begin_frame(&mut self) {
        self.stats = PoolStats::default();
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn take_free(&mut self, desc: &ResourceDesc) -> Option<GpuObject> {
        let bucket = self.free.get_mut(desc)?;
        let object = bucket.pop().map(|f| f.object);
        if bucket.is_empty() {
            self.free.remove(desc);
        }
        object
    }

    fn obtain<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        desc: &ResourceDesc,
    ) -> BackendResult<GpuObject> {
        if let Some(object) = self.take_free(desc) {
            self.stats.reused += 1;
            return Ok(object);
        }
        let object = desc.create(device)?;
        self.stats.created += 1;
        Ok(object)
    }

    /// Get an object for a transient resource, reusing a free one if possible
    pub fn acquire<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        desc: &ResourceDesc,
    ) -> BackendResult<GpuObject> {
        let object = self.obtain(device, desc)?;
        self.in_use.push((object, desc.clone()));
        Ok(object)
    }

    /// Get the object of a persistent resource.
    ///
    /// The object persisted under `key` is returned unchanged when it was
    /// created from an equal descriptor. Otherwise it is released and a
    /// matching object takes its place.
    pub fn realize_persistent<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        key: ResourceKey,
        desc: &ResourceDesc,
        frame: u64,
    ) -> BackendResult<GpuObject> {
        if let Some(existing) = self.persistent.get(&key) {
            if existing.desc == *desc {
                self.stats.reused += 1;
                return Ok(existing.object);
            }
            log::debug!(
                "Descriptor of persistent {} {} changed, recreating",
                existing.object.kind(),
                existing.object.raw()
            );
            self.release_persistent(key, frame);
        }

        let object = self.obtain(device, desc)?;
        self.persistent.insert(
            key,
            PersistentObject {
                object,
                desc: desc.clone(),
            },
        );
        Ok(object)
    }

    pub fn persistent_object(&self, key: ResourceKey) -> Option<GpuObject> {
        self.persistent.get(&key).map(|p| p.object)
    }

    /// Whether an object created from `desc` is persisted under `key`
    pub fn holds_persistent(&self, key: ResourceKey, desc: &ResourceDesc) -> bool {
        self.persistent.get(&key).is_some_and(|p| p.desc == *desc)
    }

    /// Return a persistent object to the free list
    pub fn release_persistent(&mut self, key: ResourceKey, frame: u64) {
        if let Some(PersistentObject { object, desc }) = self.persistent.remove(&key) {
            self.push_free(object, desc, frame);
        }
    }

    fn push_free(&mut self, object: GpuObject, desc: ResourceDesc, frame: u64) {
        self.free.entry(desc).or_default().push(FreeObject {
            object,
            released_frame: frame,
        });
    }

    /// Finish a frame.
    ///
    /// Transient objects go back to the free list, as do persistent objects
    /// whose resource does not survive. Idle free objects are then trimmed.
    pub fn end_frame<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        frame: u64,
        survives: impl Fn(ResourceKey) -> bool,
        max_idle_frames: u32,
    ) {
        for (object, desc) in std::mem::take(&mut self.in_use) {
            self.push_free(object, desc, frame);
        }

        let dropped: Vec<ResourceKey> = self
            .persistent
            .keys()
            .copied()
            .filter(|&key| !survives(key))
            .collect();
        for key in dropped {
            self.release_persistent(key, frame);
        }

        self.trim(device, frame, max_idle_frames);
    }

    /// Destroy free objects unused for more than `max_idle_frames` frames
    pub fn trim<D: RenderDevice + ?Sized>(&mut self, device: &mut D, frame: u64, max_idle_frames: u32) {
        let mut destroyed = 0;
        self.free.retain(|_, bucket| {
            bucket.retain(|free| {
                let idle = frame.saturating_sub(free.released_frame);
                if idle > max_idle_frames as u64 {
                    device.destroy(free.object);
                    destroyed += 1;
                    false
                } else {
                    true
                }
            });
            !bucket.is_empty()
        });
        if destroyed > 0 {
            log::warn!("Trimmed {} idle pooled objects", destroyed);
        }
        self.stats.destroyed += destroyed;
    }

    /// Destroy every object the pool owns
    pub fn clear<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        let persistent = self.persistent.drain().map(|(_, p)| p.object);
        let in_use = self.in_use.drain(..).map(|(object, _)| object);
        let free = self
            .free
            .drain()
            .flat_map(|(_, bucket)| bucket.into_iter().map(|f| f.object));
        let objects: Vec<GpuObject> = persistent.chain(in_use).chain(free).collect();
        for object in &objects {
            device.destroy(*object);
        }
        self.stats.destroyed += objects.len();
    }

    pub fn persistent_count(&self) -> usize {
        self.persistent.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.values().map(|b| b.len()).sum()
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }
}
