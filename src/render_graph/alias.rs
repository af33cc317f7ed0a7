//! Transient resource aliasing
//!
//! Interval graph colouring over resource lifetimes: each candidate is given
//! a physical slot such that no two candidates sharing a slot are alive at the
//! same time and every member is compatible with the slot's descriptor.

use crate::render_graph::resource::ResourceDesc;

/// Resource lifetime in terms of pass execution order, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

impl ResourceLifetime {
    pub fn at(position: usize) -> Self {
        Self {
            first_use: position,
            last_use: position,
        }
    }

    pub fn extend(&mut self, position: usize) {
        self.first_use = self.first_use.min(position);
        self.last_use = self.last_use.max(position);
    }

    pub fn overlaps(&self, other: &ResourceLifetime) -> bool {
        self.first_use <= other.last_use && other.first_use <= self.last_use
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.first_use && position <= self.last_use
    }
}

/// A transient resource that may share a physical object
#[derive(Debug, Clone)]
pub struct AliasCandidate {
    pub lifetime: ResourceLifetime,
    pub desc: ResourceDesc,
}

/// One physical object shared by one or more candidates
#[derive(Debug, Clone)]
pub struct PhysicalSlot {
    /// Descriptor the physical object is created with
    pub desc: ResourceDesc,
    /// Indices into the candidate list, in assignment order
    pub members: Vec<usize>,
    last_use: usize,
}

/// Result of [`assign_physical_slots`]
#[derive(Debug, Clone, Default)]
pub struct AliasPlan {
    pub slots: Vec<PhysicalSlot>,
    /// Slot index per candidate
    pub assignment: Vec<usize>,
}

impl AliasPlan {
    /// Candidates that share a slot opened by another candidate
    pub fn aliased_count(&self) -> usize {
        self.assignment.len() - self.slots.len()
    }

    /// Append the plan of the candidates following this plan's candidates
    pub fn append(&mut self, other: AliasPlan) {
        let member_offset = self.assignment.len();
        let slot_offset = self.slots.len();
        for mut slot in other.slots {
            for member in &mut slot.members {
                *member += member_offset;
            }
            self.slots.push(slot);
        }
        self.assignment
            .extend(other.assignment.into_iter().map(|s| s + slot_offset));
    }
}

/// Assign every candidate a physical slot.
///
/// Candidates are visited by first use, ties by index. A candidate joins the
/// compatible slot whose last member ended strictly before it starts, picking
/// the one that wastes the fewest bytes. Otherwise it opens a new slot.
pub fn assign_physical_slots(candidates: &[AliasCandidate], max_waste: f32) -> AliasPlan {
    let mut visit: Vec<usize> = (0..candidates.len()).collect();
    visit.sort_by_key(|&i| (candidates[i].lifetime.first_use, i));

    let mut plan = AliasPlan {
        slots: Vec::new(),
        assignment: vec![0; candidates.len()],
    };

    for index in visit {
        let candidate = &candidates[index];
        let best = plan
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.last_use < candidate.lifetime.first_use)
            .filter(|(_, slot)| candidate.desc.alias_compatible(&slot.desc, max_waste))
            .min_by_key(|(i, slot)| (candidate.desc.waste_in(&slot.desc), *i))
            .map(|(i, _)| i);

        let slot_index = match best {
            Some(i) => {
                let slot = &mut plan.slots[i];
                slot.members.push(index);
                slot.last_use = candidate.lifetime.last_use;
                i
            }
            None => {
                plan.slots.push(PhysicalSlot {
                    desc: candidate.desc.clone(),
                    members: vec![index],
                    last_use: candidate.lifetime.last_use,
                });
                plan.slots.len() - 1
            }
        };
        plan.assignment[index] = slot_index;
    }

    plan
}

/// One slot per candidate
pub fn assign_unique_slots(candidates: &[AliasCandidate]) -> AliasPlan {
    AliasPlan {
        slots: candidates
            .iter()
            .enumerate()
            .map(|(i, c)| PhysicalSlot {
                desc: c.desc.clone(),
                members: vec![i],
                last_use: c.lifetime.last_use,
            })
            .collect(),
        assignment: (0..candidates.len()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::*;

    fn texture(size: u32) -> ResourceDesc {
        ResourceDesc::TextureBuffer(TextureBufferDesc::attachment(
            Extent2d::new(size, size),
            TextureFormat::Rgba8Unorm,
        ))
    }

    fn storage(size: u64) -> ResourceDesc {
        ResourceDesc::ShaderStorageBuffer(ShaderStorageBufferDesc::new(size))
    }

    fn candidate(first: usize, last: usize, desc: ResourceDesc) -> AliasCandidate {
        AliasCandidate {
            lifetime: ResourceLifetime {
                first_use: first,
                last_use: last,
            },
            desc,
        }
    }

    fn assert_safe(candidates: &[AliasCandidate], plan: &AliasPlan) {
        for a in 0..candidates.len() {
            for b in (a + 1)..candidates.len() {
                if plan.assignment[a] == plan.assignment[b] {
                    assert!(
                        !candidates[a].lifetime.overlaps(&candidates[b].lifetime),
                        "candidates {a} and {b} overlap but share a slot"
                    );
                }
            }
            let slot = &plan.slots[plan.assignment[a]];
            assert!(candidates[a].desc.alias_compatible(&slot.desc, 0.25));
        }
    }

    #[test]
    fn test_disjoint_equal_descriptors_share() {
        let candidates = vec![candidate(0, 1, texture(64)), candidate(2, 3, texture(64))];
        let plan = assign_physical_slots(&candidates, 0.25);
        assert_eq!(plan.slots.len(), 1);
        assert_eq!(plan.aliased_count(), 1);
        assert_safe(&candidates, &plan);
    }

    #[test]
    fn test_touching_intervals_do_not_share() {
        let candidates = vec![candidate(0, 1, texture(64)), candidate(1, 2, texture(64))];
        let plan = assign_physical_slots(&candidates, 0.25);
        assert_eq!(plan.slots.len(), 2);
    }

    #[test]
    fn test_incompatible_descriptors_do_not_share() {
        let candidates = vec![candidate(0, 0, texture(64)), candidate(1, 1, texture(32))];
        let plan = assign_physical_slots(&candidates, 0.25);
        assert_eq!(plan.slots.len(), 2);
    }

    #[test]
    fn test_prefers_least_waste() {
        let candidates = vec![
            candidate(0, 0, storage(100)),
            candidate(0, 0, storage(90)),
            candidate(1, 1, storage(85)),
        ];
        let plan = assign_physical_slots(&candidates, 0.25);
        assert_eq!(plan.slots.len(), 2);
        assert_eq!(plan.assignment[2], plan.assignment[1]);
        assert_safe(&candidates, &plan);
    }

    #[test]
    fn test_larger_buffer_never_joins_smaller_slot() {
        let candidates = vec![candidate(0, 0, storage(80)), candidate(1, 1, storage(100))];
        let plan = assign_physical_slots(&candidates, 0.25);
        assert_eq!(plan.slots.len(), 2);
    }

    #[test]
    fn test_interleaved_lifetimes_are_safe() {
        let candidates: Vec<_> = (0..12)
            .map(|i| candidate(i, i + (i % 3), texture(128)))
            .collect();
        let plan = assign_physical_slots(&candidates, 0.25);
        assert_safe(&candidates, &plan);
        assert!(plan.slots.len() < candidates.len());
        // At most two lifetimes overlap at any position
        assert_eq!(plan.slots.len(), 2);
    }

    #[test]
    fn test_unique_slots() {
        let candidates = vec![candidate(0, 0, texture(64)), candidate(1, 1, texture(64))];
        let plan = assign_unique_slots(&candidates);
        assert_eq!(plan.slots.len(), 2);
        assert_eq!(plan.aliased_count(), 0);
    }

    #[test]
    fn test_append_offsets_members() {
        let shared = vec![candidate(0, 0, texture(64)), candidate(1, 1, texture(64))];
        let exclusive = vec![candidate(0, 1, storage(16))];
        let mut plan = assign_physical_slots(&shared, 0.25);
        plan.append(assign_unique_slots(&exclusive));

        assert_eq!(plan.assignment, vec![0, 0, 1]);
        assert_eq!(plan.slots[1].members, vec![2]);
    }
}
