pub mod account_deletion_service;
pub mod dataset_service;
pub mod project_service;

pub use account_deletion_service::*;
pub use dataset_service::*;
pub use project_service::*;
