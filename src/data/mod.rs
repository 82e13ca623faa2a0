//! Registry access, study projection and result export.

pub mod export;
pub mod registry;
pub mod study;

pub use registry::{RegistryClient, SearchResults, StudyPage};
pub use study::{StructuredStudy, StudyRecord};
