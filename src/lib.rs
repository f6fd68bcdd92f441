pub mod categorize;
pub mod config;
pub mod external;
pub mod pipeline;
pub mod records;
pub mod sources;
pub mod utils;

// re-export the categorizer surface used in tests
pub use crate::categorize::{detect, detect_with_reasons, Category};
