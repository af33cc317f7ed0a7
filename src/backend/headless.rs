//! Headless backend for testing and tools.
//!
//! This device doesn't touch a GPU. It hands out unique handles, keeps track
//! of which objects are alive and records every upload and submission so the
//! frame graph's behaviour can be inspected.

use std::collections::BTreeMap;

use crate::backend::command::RecordedCommands;
use crate::backend::traits::*;
use crate::backend::types::*;

/// One `submit` call as seen by the device
#[derive(Debug, Clone)]
pub struct Submission {
    pub queue: QueueKind,
    pub buffers: Vec<RecordedCommands>,
}

impl Submission {
    pub fn labels(&self) -> Vec<&str> {
        self.buffers.iter().map(|b| b.label()).collect()
    }
}

/// Recording device without GPU access.
#[derive(Debug)]
pub struct HeadlessDevice {
    next_id: u64,
    capabilities: QueueCapabilities,
    back_buffer: BackBuffer,
    live: BTreeMap<u64, GpuObject>,
    created: Vec<GpuObject>,
    destroyed: Vec<GpuObject>,
    uploads: Vec<(GpuObject, usize)>,
    submissions: Vec<Submission>,
    creations_before_failure: Option<usize>,
    lost: bool,
}

impl HeadlessDevice {
    /// Create a device with a back buffer of the given size and all queues
    pub fn new(width: u32, height: u32) -> Self {
        let back_buffer = BackBuffer {
            texture: TextureBufferHandle::from_raw(0),
            desc: TextureBufferDesc::attachment(
                Extent2d::new(width, height),
                TextureFormat::Bgra8Unorm,
            ),
        };
        Self {
            next_id: 1,
            capabilities: QueueCapabilities::default(),
            back_buffer,
            live: BTreeMap::new(),
            created: Vec::new(),
            destroyed: Vec::new(),
            uploads: Vec::new(),
            submissions: Vec::new(),
            creations_before_failure: None,
            lost: false,
        }
    }

    pub fn with_queues(mut self, capabilities: QueueCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Resize the back buffer, as a window resize would
    pub fn resize(&mut self, width: u32, height: u32) {
        self.back_buffer.desc.size = Extent2d::new(width, height);
    }

    /// Let `count` more creations succeed, then fail every following one
    pub fn fail_creation_after(&mut self, count: usize) {
        self.creations_before_failure = Some(count);
    }

    /// Stop injecting creation failures
    pub fn allow_creation(&mut self) {
        self.creations_before_failure = None;
    }

    /// Simulate a lost device: every following call fails
    pub fn lose_device(&mut self) {
        self.lost = true;
    }

    pub fn is_live(&self, object: GpuObject) -> bool {
        self.live.get(&object.raw()) == Some(&object)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_objects(&self) -> impl Iterator<Item = &GpuObject> {
        self.live.values()
    }

    /// Every object created so far, in creation order
    pub fn created(&self) -> &[GpuObject] {
        &self.created
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn created_of_kind(&self, kind: ResourceKind) -> usize {
        self.created.iter().filter(|o| o.kind() == kind).count()
    }

    /// Every object destroyed so far, in destruction order
    pub fn destroyed(&self) -> &[GpuObject] {
        &self.destroyed
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed.len()
    }

    /// Uploads as (object, byte length), in upload order
    pub fn uploads(&self) -> &[(GpuObject, usize)] {
        &self.uploads
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Labels of every submitted buffer, across all queues, in submission order
    pub fn submitted_labels(&self) -> Vec<String> {
        self.submissions
            .iter()
            .flat_map(|s| s.buffers.iter().map(|b| b.label().to_string()))
            .collect()
    }

    /// Forget recorded uploads and submissions, keeping live objects
    pub fn clear_log(&mut self) {
        self.uploads.clear();
        self.submissions.clear();
    }

    fn check_device(&self) -> BackendResult<()> {
        if self.lost {
            return Err(BackendError::DeviceLost);
        }
        Ok(())
    }

    fn allocate<H: GpuHandle>(&mut self, make: fn(u64) -> H) -> BackendResult<H> {
        self.check_device()?;
        if let Some(remaining) = self.creations_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(BackendError::ResourceCreationFailed {
                    kind: H::KIND,
                    reason: "injected failure".to_string(),
                });
            }
            *remaining -= 1;
        }

        let handle = make(self.next_id);
        self.next_id += 1;
        let object = handle.into_object();
        self.live.insert(object.raw(), object);
        self.created.push(object);
        Ok(handle)
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl RenderDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "Headless Device"
    }

    fn queue_capabilities(&self) -> QueueCapabilities {
        self.capabilities
    }

    fn back_buffer(&self) -> BackBuffer {
        self.back_buffer.clone()
    }

    fn create_vertex_buffer(
        &mut self,
        desc: &VertexBufferDesc,
    ) -> BackendResult<VertexBufferHandle> {
        log::trace!("HeadlessDevice: creating vertex buffer (size: {})", desc.size);
        self.allocate(VertexBufferHandle::from_raw)
    }

    fn create_index_buffer(&mut self, desc: &IndexBufferDesc) -> BackendResult<IndexBufferHandle> {
        log::trace!(
            "HeadlessDevice: creating index buffer (size: {}, format: {:?})",
            desc.size,
            desc.format
        );
        self.allocate(IndexBufferHandle::from_raw)
    }

    fn create_uniform_buffer(
        &mut self,
        desc: &UniformBufferDesc,
    ) -> BackendResult<UniformBufferHandle> {
        log::trace!("HeadlessDevice: creating uniform buffer (size: {})", desc.size);
        self.allocate(UniformBufferHandle::from_raw)
    }

    fn create_shader_storage_buffer(
        &mut self,
        desc: &ShaderStorageBufferDesc,
    ) -> BackendResult<ShaderStorageBufferHandle> {
        log::trace!(
            "HeadlessDevice: creating shader storage buffer (size: {})",
            desc.size
        );
        self.allocate(ShaderStorageBufferHandle::from_raw)
    }

    fn create_texture_buffer(
        &mut self,
        desc: &TextureBufferDesc,
    ) -> BackendResult<TextureBufferHandle> {
        log::trace!(
            "HeadlessDevice: creating texture {:?} ({}x{})",
            desc.format,
            desc.size.width,
            desc.size.height
        );
        self.allocate(TextureBufferHandle::from_raw)
    }

    fn create_texture_array_buffer(
        &mut self,
        desc: &TextureArrayBufferDesc,
    ) -> BackendResult<TextureArrayBufferHandle> {
        log::trace!(
            "HeadlessDevice: creating texture array {:?} ({}x{}x{})",
            desc.format,
            desc.size.width,
            desc.size.height,
            desc.layers
        );
        self.allocate(TextureArrayBufferHandle::from_raw)
    }

    fn create_render_target(
        &mut self,
        desc: &RenderTargetDesc,
    ) -> BackendResult<RenderTargetHandle> {
        log::trace!(
            "HeadlessDevice: creating render target ({}x{}, {} color)",
            desc.size.width,
            desc.size.height,
            desc.color_attachments
        );
        self.allocate(RenderTargetHandle::from_raw)
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> BackendResult<RenderPassHandle> {
        log::trace!(
            "HeadlessDevice: creating render pass ({} color, depth: {})",
            desc.color_attachments,
            desc.has_depth_stencil
        );
        self.allocate(RenderPassHandle::from_raw)
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDesc,
    ) -> BackendResult<RenderPipelineHandle> {
        log::trace!(
            "HeadlessDevice: creating render pipeline ({} shaders)",
            desc.shaders.len()
        );
        self.allocate(RenderPipelineHandle::from_raw)
    }

    fn upload(&mut self, object: GpuObject, data: &[u8]) -> BackendResult<()> {
        self.check_device()?;
        if !self.is_live(object) {
            return Err(BackendError::UploadFailed {
                kind: object.kind(),
                id: object.raw(),
                len: data.len(),
                reason: "object is not alive".to_string(),
            });
        }
        log::trace!(
            "HeadlessDevice: upload {} bytes to {} {}",
            data.len(),
            object.kind(),
            object.raw()
        );
        self.uploads.push((object, data.len()));
        Ok(())
    }

    fn destroy(&mut self, object: GpuObject) {
        if self.live.remove(&object.raw()).is_none() {
            log::warn!(
                "HeadlessDevice: destroying unknown {} {}",
                object.kind(),
                object.raw()
            );
            return;
        }
        log::trace!("HeadlessDevice: destroyed {} {}", object.kind(), object.raw());
        self.destroyed.push(object);
    }

    fn submit(&mut self, queue: QueueKind, buffers: &[RecordedCommands]) -> BackendResult<()> {
        self.check_device()?;
        if !self.capabilities.supports(queue) {
            return Err(BackendError::SubmitFailed {
                queue,
                reason: "queue not available".to_string(),
            });
        }
        log::trace!(
            "HeadlessDevice: submitting {} command buffers to {:?} queue",
            buffers.len(),
            queue
        );
        self.submissions.push(Submission {
            queue,
            buffers: buffers.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::command::CommandBuffer;

    #[test]
    fn test_handles_are_unique() {
        let mut device = HeadlessDevice::default();
        let a = device.create_vertex_buffer(&VertexBufferDesc::new(64)).unwrap();
        let b = device.create_vertex_buffer(&VertexBufferDesc::new(64)).unwrap();
        assert_ne!(a, b);
        assert_eq!(device.live_count(), 2);
    }

    #[test]
    fn test_destroy_removes_live_object() {
        let mut device = HeadlessDevice::default();
        let buffer = device.create_uniform_buffer(&UniformBufferDesc::new(16)).unwrap();
        device.destroy(buffer.into_object());
        assert_eq!(device.live_count(), 0);
        assert_eq!(device.destroyed_count(), 1);

        let err = device.upload(buffer.into_object(), &[0; 16]).unwrap_err();
        assert!(matches!(err, BackendError::UploadFailed { .. }));
    }

    #[test]
    fn test_injected_creation_failure() {
        let mut device = HeadlessDevice::default();
        device.fail_creation_after(1);
        assert!(device.create_render_pass(&RenderPassDesc {
            color_attachments: 1,
            has_depth_stencil: false,
        })
        .is_ok());
        let err = device
            .create_texture_buffer(&TextureBufferDesc::default())
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::ResourceCreationFailed {
                kind: ResourceKind::TextureBuffer,
                ..
            }
        ));
    }

    #[test]
    fn test_submit_rejects_missing_queue() {
        let mut device = HeadlessDevice::default().with_queues(QueueCapabilities::render_only());
        let buffers = vec![CommandBuffer::begin("a").end()];
        assert!(device.submit(QueueKind::Render, &buffers).is_ok());
        assert!(device.submit(QueueKind::Compute, &buffers).is_err());
        assert_eq!(device.submitted_labels(), vec!["a".to_string()]);
    }
}
