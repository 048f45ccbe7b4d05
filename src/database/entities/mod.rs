pub mod account_deletions;
pub mod datasets;
pub mod projects;

pub use account_deletions::*;
pub use datasets::*;
pub use projects::*;
