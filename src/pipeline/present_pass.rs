//! Presentation pass, copies the composited screen color into the back buffer

use std::any::Any;

use crate::backend::command::{Command, CommandBuffer, FilterMode};
use crate::backend::traits::QueueKind;
use crate::error::GraphResult;
use crate::render_graph::*;

#[derive(Debug, Default)]
pub struct PresentationPass {
    screen_color: FrameGraphResource,
    back_buffer: FrameGraphResource,
    /// Render resolution differs from the back buffer size
    scaled: bool,
}

impl PresentationPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameGraphPass for PresentationPass {
    fn name(&self) -> &str {
        "Presentation Pass"
    }

    fn setup(&mut self, builder: &mut FrameGraphBuilder) -> GraphResult<()> {
        self.screen_color = builder.get_slot(FrameGraphSlot::ScreenColor);
        builder.read(self.screen_color)?;

        self.back_buffer = builder.back_buffer();
        builder.write(self.back_buffer)?;
        self.scaled = builder.render_resolution() != builder.back_buffer_desc().size;
        Ok(())
    }

    fn execute(
        &self,
        resources: &FrameGraphPassResources,
        output: &mut PassOutput,
    ) -> GraphResult<()> {
        let filter = if self.scaled {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        };
        let mut cmd = CommandBuffer::begin(self.name());
        cmd.add(Command::Blit {
            source: resources.get(self.screen_color)?,
            target: resources.get(self.back_buffer)?,
            filter,
        });
        output.submit(QueueKind::Transfer, cmd.end());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::builder::record_pass;

    #[test]
    fn test_missing_screen_color_is_an_error() {
        let mut graph = FrameGraph::new();
        let mut pass = PresentationPass::new();
        let result = record_pass(&mut graph, "present", |b| pass.setup(b));
        assert!(matches!(result, Err(crate::error::GraphError::InvalidHandle { .. })));
    }
}
