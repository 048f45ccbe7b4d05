pub mod datasets;
pub mod health;
pub mod projects;
pub mod user_deletion;
