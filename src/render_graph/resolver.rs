//! Frame graph resolution - pass ordering, hazard validation and lifetimes

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use crate::backend::traits::GpuObject;
use crate::error::{GraphError, GraphResult};
use crate::render_graph::alias::*;
use crate::render_graph::builder::FrameGraph;
use crate::render_graph::pass::PassId;
use crate::render_graph::resource::*;
use crate::settings::FrameGraphSettings;

/// Where a resource's physical object comes from this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalBinding {
    /// Owned outside the frame graph
    Imported(GpuObject),
    /// Kept by the pool under the resource's own key
    Persistent,
    /// Shares the physical object of an alias slot
    Transient { slot: usize },
}

/// A frame graph ready for execution
#[derive(Debug)]
pub struct ResolvedGraph {
    /// Passes in execution order
    pub order: Vec<PassId>,
    /// Passes grouped by dependency depth. Passes of one batch are independent.
    pub batches: Vec<Vec<PassId>>,
    pub lifetimes: HashMap<FrameGraphResource, ResourceLifetime>,
    pub bindings: HashMap<FrameGraphResource, PhysicalBinding>,
    /// Physical slots of transient resources
    pub alias_plan: AliasPlan,
    /// Carried resources no pass referenced this frame
    pub released: Vec<FrameGraphResource>,
    /// Transient resources no pass referenced
    pub culled: Vec<FrameGraphResource>,
}

impl ResolvedGraph {
    /// Position of a pass in the execution order
    pub fn position(&self, pass: PassId) -> Option<usize> {
        self.order.iter().position(|&p| p == pass)
    }

    pub fn is_resource_alive(&self, resource: FrameGraphResource, step: usize) -> bool {
        self.lifetimes
            .get(&resource)
            .map(|lifetime| lifetime.contains(step))
            .unwrap_or(false)
    }
}

/// Dependency edges between passes, indexed by pass
struct Edges {
    successors: Vec<BTreeSet<usize>>,
    predecessors: Vec<BTreeSet<usize>>,
}

impl Edges {
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(pass) = stack.pop() {
            if pass == to {
                return true;
            }
            if visited.insert(pass) {
                stack.extend(self.successors[pass].iter().copied());
            }
        }
        false
    }
}

/// Resolve a recorded frame graph.
///
/// Fails on stale handles, dependency cycles and resources written by passes
/// that no dependency orders.
///
/// Ordering is by data, not by registration: every writer of a resource runs
/// before every other pass reading it. Two passes that both read and write
/// the same resource therefore depend on each other and resolve to
/// [`GraphError::CyclicDependency`]. A chain of in-place passes has to hand
/// its result on through a new resource instead.
pub fn resolve(graph: &FrameGraph, settings: &FrameGraphSettings) -> GraphResult<ResolvedGraph> {
    validate_handles(graph)?;

    let edges = build_edges(graph);
    let order = topological_order(graph, &edges)?;
    check_single_writer(graph, &edges)?;

    let lifetimes = compute_lifetimes(graph, &order);
    let batches = compute_batches(&edges, &order);
    let (bindings, alias_plan, released, culled) =
        assign_bindings(graph, &lifetimes, settings);

    log::debug!(
        "Resolved frame {}: {} passes in {} batches, {} alias slots for {} transients",
        graph.frame_index(),
        order.len(),
        batches.len(),
        alias_plan.slots.len(),
        alias_plan.assignment.len()
    );

    Ok(ResolvedGraph {
        order: order.into_iter().map(|i| PassId(i as u32)).collect(),
        batches: batches
            .into_iter()
            .map(|batch| batch.into_iter().map(|i| PassId(i as u32)).collect())
            .collect(),
        lifetimes,
        bindings,
        alias_plan,
        released,
        culled,
    })
}

fn validate_handles(graph: &FrameGraph) -> GraphResult<()> {
    for node in graph.passes() {
        for resource in node.accesses() {
            graph.validate(resource, "resolve")?;
        }
    }
    Ok(())
}

/// Read-after-write edges: every writer of a resource precedes every other
/// pass reading it, wherever either was registered.
fn build_edges(graph: &FrameGraph) -> Edges {
    let count = graph.passes().len();
    let mut writers: HashMap<FrameGraphResource, Vec<usize>> = HashMap::new();
    for node in graph.passes() {
        for &resource in node.writes() {
            writers.entry(resource).or_default().push(node.id.index());
        }
    }

    let mut edges = Edges {
        successors: vec![BTreeSet::new(); count],
        predecessors: vec![BTreeSet::new(); count],
    };
    for reader in graph.passes() {
        let r = reader.id.index();
        for resource in reader.reads() {
            for &w in writers.get(resource).into_iter().flatten() {
                if w != r {
                    edges.successors[w].insert(r);
                    edges.predecessors[r].insert(w);
                }
            }
        }
    }
    edges
}

/// Kahn's algorithm, always taking the earliest registered ready pass
fn topological_order(graph: &FrameGraph, edges: &Edges) -> GraphResult<Vec<usize>> {
    let count = graph.passes().len();
    let mut in_degree: Vec<usize> = edges.predecessors.iter().map(|p| p.len()).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse(pass)) = ready.pop() {
        order.push(pass);
        for &next in &edges.successors[pass] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() < count {
        let passes = (0..count)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| graph.passes()[i].name.clone())
            .collect();
        return Err(GraphError::CyclicDependency { passes });
    }
    Ok(order)
}

fn check_single_writer(graph: &FrameGraph, edges: &Edges) -> GraphResult<()> {
    let mut writers: HashMap<FrameGraphResource, Vec<usize>> = HashMap::new();
    for node in graph.passes() {
        for &resource in node.writes() {
            writers.entry(resource).or_default().push(node.id.index());
        }
    }

    let mut contested: Vec<(u64, FrameGraphResource)> = writers
        .iter()
        .filter(|(_, passes)| passes.len() > 1)
        .filter_map(|(&resource, _)| graph.resource(resource).map(|e| (e.sequence, resource)))
        .collect();
    contested.sort_by_key(|(sequence, _)| *sequence);

    for (_, resource) in contested {
        let passes = &writers[&resource];
        for (i, &a) in passes.iter().enumerate() {
            for &b in &passes[i + 1..] {
                if !edges.reaches(a, b) && !edges.reaches(b, a) {
                    return Err(GraphError::MultipleWriters {
                        resource: graph.describe(resource),
                        first: graph.passes()[a].name.clone(),
                        second: graph.passes()[b].name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn compute_lifetimes(
    graph: &FrameGraph,
    order: &[usize],
) -> HashMap<FrameGraphResource, ResourceLifetime> {
    let mut lifetimes: HashMap<FrameGraphResource, ResourceLifetime> = HashMap::new();
    for (position, &pass) in order.iter().enumerate() {
        for resource in graph.passes()[pass].accesses() {
            lifetimes
                .entry(resource)
                .and_modify(|l| l.extend(position))
                .or_insert(ResourceLifetime::at(position));
        }
    }
    lifetimes
}

/// Group passes by the longest dependency chain leading to them
fn compute_batches(edges: &Edges, order: &[usize]) -> Vec<Vec<usize>> {
    let mut depth = vec![0usize; edges.successors.len()];
    let mut batches: Vec<Vec<usize>> = Vec::new();
    for &pass in order {
        let d = edges.predecessors[pass]
            .iter()
            .map(|&p| depth[p] + 1)
            .max()
            .unwrap_or(0);
        depth[pass] = d;
        if batches.len() <= d {
            batches.resize_with(d + 1, Vec::new);
        }
        batches[d].push(pass);
    }
    batches
}

type Bindings = (
    HashMap<FrameGraphResource, PhysicalBinding>,
    AliasPlan,
    Vec<FrameGraphResource>,
    Vec<FrameGraphResource>,
);

fn assign_bindings(
    graph: &FrameGraph,
    lifetimes: &HashMap<FrameGraphResource, ResourceLifetime>,
    settings: &FrameGraphSettings,
) -> Bindings {
    let uploaded: HashSet<FrameGraphResource> = graph.uploads().map(|(_, r)| r).collect();

    let mut entries: Vec<(FrameGraphResource, &ResourceEntry)> = graph.resources().collect();
    entries.sort_by_key(|(_, entry)| entry.sequence);

    let mut bindings = HashMap::new();
    let mut released = Vec::new();
    let mut culled = Vec::new();
    // Uploads happen before any command is submitted, so uploaded transients
    // get an object of their own.
    let mut shared: Vec<(FrameGraphResource, AliasCandidate)> = Vec::new();
    let mut exclusive: Vec<(FrameGraphResource, AliasCandidate)> = Vec::new();

    for (resource, entry) in entries {
        let Some(&lifetime) = lifetimes.get(&resource) else {
            match entry.origin() {
                ResourceOrigin::Carried => released.push(resource),
                ResourceOrigin::Transient => culled.push(resource),
                ResourceOrigin::Persisted | ResourceOrigin::Imported => {}
            }
            continue;
        };

        match entry.origin() {
            ResourceOrigin::Imported => {
                if let Some(object) = entry.imported {
                    bindings.insert(resource, PhysicalBinding::Imported(object));
                }
            }
            ResourceOrigin::Persisted | ResourceOrigin::Carried => {
                bindings.insert(resource, PhysicalBinding::Persistent);
            }
            ResourceOrigin::Transient => {
                let candidate = AliasCandidate {
                    lifetime,
                    desc: entry.desc.clone(),
                };
                if settings.alias_transients && !uploaded.contains(&resource) {
                    shared.push((resource, candidate));
                } else {
                    exclusive.push((resource, candidate));
                }
            }
        }
    }

    let shared_candidates: Vec<AliasCandidate> = shared.iter().map(|(_, c)| c.clone()).collect();
    let exclusive_candidates: Vec<AliasCandidate> =
        exclusive.iter().map(|(_, c)| c.clone()).collect();
    let mut plan = assign_physical_slots(&shared_candidates, settings.max_alias_waste);
    plan.append(assign_unique_slots(&exclusive_candidates));

    for (index, (resource, _)) in shared.iter().chain(exclusive.iter()).enumerate() {
        bindings.insert(
            *resource,
            PhysicalBinding::Transient {
                slot: plan.assignment[index],
            },
        );
    }

    (bindings, plan, released, culled)
}
