//! Deferred rendering pipeline
//!
//! The passes run in this order each frame:
//! 1. Construction - creates and clears the shared render-resolution textures
//! 2. Shadow mapping - cube shadow maps of shadow casting point lights
//! 3. G-Buffer - renders opaque geometry to multiple render targets
//! 4. Deferred lighting - fullscreen pass computing lighting from the G-buffer
//! 5. Skybox - fills the background layer
//! 6. Forward - transparent geometry on top of the deferred depth
//! 7. Composite - blends background, deferred and forward layers
//! 8. Presentation - copies the composited image into the back buffer

mod common;
pub mod composite_pass;
pub mod construction_pass;
pub mod forward_pass;
pub mod gbuffer_pass;
pub mod lighting_pass;
pub mod present_pass;
pub mod shadow_pass;
pub mod skybox_pass;

pub use composite_pass::CompositePass;
pub use construction_pass::ConstructionPass;
pub use forward_pass::ForwardPass;
pub use gbuffer_pass::GBufferPass;
pub use lighting_pass::DeferredLightingPass;
pub use present_pass::PresentationPass;
pub use shadow_pass::ShadowMappingPass;
pub use skybox_pass::SkyboxPass;

use crate::error::GraphResult;
use crate::render_graph::PassRegistry;

/// Configuration for the Deferred pipeline
#[derive(Debug, Clone)]
pub struct DeferredConfig {
    /// Draw transparent objects in a forward pass
    pub enable_forward: bool,
    /// Fill the background with the scene's skybox color
    pub enable_skybox: bool,
    /// Render point light shadow maps
    pub enable_shadows: bool,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            enable_forward: true,
            enable_skybox: true,
            enable_shadows: true,
        }
    }
}

/// Register the deferred pipeline passes in execution order
pub fn register_deferred_pipeline(
    registry: &mut PassRegistry,
    config: &DeferredConfig,
) -> GraphResult<()> {
    registry.register(ConstructionPass::new())?;
    if config.enable_shadows {
        registry.register(ShadowMappingPass::new())?;
    }
    registry.register(GBufferPass::new())?;
    registry.register(DeferredLightingPass::new())?;
    if config.enable_skybox {
        registry.register(SkyboxPass::new())?;
    }
    if config.enable_forward {
        registry.register(ForwardPass::new())?;
    }
    registry.register(CompositePass::new())?;
    registry.register(PresentationPass::new())?;
    Ok(())
}
