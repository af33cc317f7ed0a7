//! Frame Graph System
//!
//! Passes declare the resources they create, read, write and persist during
//! setup. The graph is then resolved into an execution order with resource
//! lifetimes, transient resources are aliased onto shared physical objects,
//! and passes execute against the realised objects.

pub mod alias;
pub mod builder;
pub mod executor;
pub mod pass;
pub mod pool;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod resources;
pub mod slot;

pub use alias::{assign_physical_slots, AliasCandidate, AliasPlan, ResourceLifetime};
pub use builder::*;
pub use executor::*;
pub use pass::*;
pub use pool::*;
pub use registry::*;
pub use resolver::*;
pub use resource::*;
pub use resources::*;
pub use slot::*;
