pub mod classifier;
pub mod models;
pub mod prompt;
pub mod seed;
pub mod validation;

pub use classifier::{classify, detect_language, KeywordSet};
pub use models::*;
pub use prompt::{compose_prompt, counselor_prompt, normalize_reply, select_template};
pub use validation::ValidationError;
