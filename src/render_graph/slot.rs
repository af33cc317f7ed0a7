//! Well-known resource slots shared between passes

use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};
use crate::render_graph::resource::FrameGraphResource;

/// Named slot a pass publishes a resource under for later passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameGraphSlot {
    ScreenColor,
    ScreenDepth,
    DeferredColor,
    DeferredDepth,
    ForwardColor,
    ForwardDepth,
    BackgroundColor,
    GBufferPosition,
    GBufferNormal,
    GBufferTangent,
    GBufferRoughnessMetallicAo,
    GBufferAlbedo,
    GBufferObjectShadows,
    GBufferDepth,
    ShadowMapPoint,
}

impl FrameGraphSlot {
    /// Geometry buffer slots, in attachment order
    pub const GBUFFER: [FrameGraphSlot; 7] = [
        FrameGraphSlot::GBufferPosition,
        FrameGraphSlot::GBufferNormal,
        FrameGraphSlot::GBufferTangent,
        FrameGraphSlot::GBufferRoughnessMetallicAo,
        FrameGraphSlot::GBufferAlbedo,
        FrameGraphSlot::GBufferObjectShadows,
        FrameGraphSlot::GBufferDepth,
    ];
}

/// Slot bindings of one frame
#[derive(Debug, Default)]
pub struct SlotTable {
    bindings: HashMap<FrameGraphSlot, FrameGraphResource>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a resource to a slot. A slot can be bound once per frame.
    pub fn assign(&mut self, slot: FrameGraphSlot, resource: FrameGraphResource) -> GraphResult<()> {
        if self.bindings.contains_key(&slot) {
            return Err(GraphError::SlotAlreadyAssigned { slot });
        }
        self.bindings.insert(slot, resource);
        Ok(())
    }

    /// The bound resource, or an unassigned handle
    pub fn get(&self, slot: FrameGraphSlot) -> FrameGraphResource {
        self.bindings.get(&slot).copied().unwrap_or_default()
    }

    pub fn check(&self, slot: FrameGraphSlot) -> bool {
        self.bindings.contains_key(&slot)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::resource::ResourceKey;
    use slotmap::SlotMap;

    #[test]
    fn test_unbound_slot() {
        let table = SlotTable::new();
        assert!(!table.check(FrameGraphSlot::ShadowMapPoint));
        assert!(!table.get(FrameGraphSlot::ShadowMapPoint).is_assigned());
    }

    #[test]
    fn test_assign_once_per_frame() {
        let mut keys: SlotMap<ResourceKey, ()> = SlotMap::with_key();
        let resource = FrameGraphResource::new(keys.insert(()));

        let mut table = SlotTable::new();
        table.assign(FrameGraphSlot::ScreenColor, resource).unwrap();
        assert!(table.check(FrameGraphSlot::ScreenColor));
        assert_eq!(table.get(FrameGraphSlot::ScreenColor), resource);

        let err = table
            .assign(FrameGraphSlot::ScreenColor, resource)
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::SlotAlreadyAssigned {
                slot: FrameGraphSlot::ScreenColor
            }
        );

        table.clear();
        assert!(!table.check(FrameGraphSlot::ScreenColor));
    }
}
