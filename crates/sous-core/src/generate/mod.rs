//! Timeline generation: collaborator trait, normalization, persistence.

pub mod heuristic;
pub mod normalize;
pub mod raw;
pub mod service;

pub use heuristic::HeuristicGenerator;
pub use normalize::normalize;
pub use raw::{GenerateRequest, RawTask, TaskGenerator};
pub use service::generate_timeline;
