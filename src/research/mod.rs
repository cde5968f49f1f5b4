//! Research phase: find the target's profile pages and read what they say.

pub mod aggregator;
pub mod extractor;
pub mod resolver;
pub mod sources;
pub mod types;

pub use aggregator::Aggregator;
pub use extractor::{Extractor, FieldSlot, FieldSpec, SelectionRule};
pub use resolver::{Candidate, ProfileResolver, Resolution};
pub use sources::{SearchSpec, SourceConfig, default_sources};
pub use types::{Fields, INSTITUTION, ResearchContext, SCHOLAR, SourceResult};
