//! Registered passes, owned across frames

use std::any::TypeId;

use crate::error::{GraphError, GraphResult};
use crate::render_graph::pass::FrameGraphPass;

/// Ordered set of pass instances, at most one per pass type
#[derive(Default)]
pub struct PassRegistry {
    passes: Vec<Box<dyn FrameGraphPass>>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass. Setup runs in registration order.
    pub fn register<P: FrameGraphPass + 'static>(&mut self, pass: P) -> GraphResult<()> {
        self.register_boxed(Box::new(pass))
    }

    pub fn register_boxed(&mut self, pass: Box<dyn FrameGraphPass>) -> GraphResult<()> {
        let type_id = pass.pass_type_id();
        if self.passes.iter().any(|p| p.pass_type_id() == type_id) {
            return Err(GraphError::DuplicatePass {
                name: pass.name().to_string(),
            });
        }
        log::debug!("Registered pass '{}'", pass.name());
        self.passes.push(pass);
        Ok(())
    }

    pub fn get<P: FrameGraphPass + 'static>(&self) -> Option<&P> {
        self.passes
            .iter()
            .find_map(|p| p.as_any().downcast_ref::<P>())
    }

    pub fn get_mut<P: FrameGraphPass + 'static>(&mut self) -> Option<&mut P> {
        self.passes
            .iter_mut()
            .find_map(|p| p.as_any_mut().downcast_mut::<P>())
    }

    pub fn contains<P: FrameGraphPass + 'static>(&self) -> bool {
        let type_id = TypeId::of::<P>();
        self.passes.iter().any(|p| p.pass_type_id() == type_id)
    }

    /// Remove and return the pass of type `P`
    pub fn remove<P: FrameGraphPass + 'static>(&mut self) -> Option<Box<dyn FrameGraphPass>> {
        let type_id = TypeId::of::<P>();
        let index = self.passes.iter().position(|p| p.pass_type_id() == type_id)?;
        Some(self.passes.remove(index))
    }

    pub fn passes(&self) -> &[Box<dyn FrameGraphPass>] {
        &self.passes
    }

    pub fn passes_mut(&mut self) -> &mut [Box<dyn FrameGraphPass>] {
        &mut self.passes
    }

    pub fn names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}
