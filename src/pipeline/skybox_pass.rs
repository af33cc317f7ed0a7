//! Skybox pass, fills the background layer with the scene's sky color

use std::any::Any;

use crate::backend::command::{Command, CommandBuffer};
use crate::backend::traits::QueueKind;
use crate::error::GraphResult;
use crate::render_graph::*;

#[derive(Debug, Default)]
pub struct SkyboxPass {
    background: FrameGraphResource,
}

impl SkyboxPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameGraphPass for SkyboxPass {
    fn name(&self) -> &str {
        "Skybox Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        self.background = builder.get_slot(FrameGraphSlot::BackgroundColor);
        builder.read(self.background)?;
        builder.write(self.background)
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let mut cmd = CommandBuffer::begin(self.name());
        cmd.add(Command::ClearColor {
            target: resources.get(self.background)?,
            color: resources.scene().skybox_color.to_array(),
        });
        output.submit(QueueKind::Render, cmd.end());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
