//! fleetmirror-placement — template resolution and placement queries.
//!
//! Resolves work-unit templates into cached requirement records and answers
//! "which nodes can host this template right now" against the mirrored
//! state. It does NOT rank candidates or reserve capacity: callers get the
//! full qualifying set and decide placement themselves, re-refreshing when
//! they need a fresher view.
//!
//! # Components
//!
//! - **`resolver`** — Template reference parsing + write-once local cache
//! - **`query`** — Candidate node filtering (connectivity, CPU, memory, ports)

pub mod error;
pub mod query;
pub mod resolver;

pub use error::{PlacementError, PlacementResult};
pub use query::{PlacementEngine, node_can_host};
pub use resolver::{TemplateRef, TemplateResolver};
