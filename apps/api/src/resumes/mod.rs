pub mod actions;
pub mod handlers;
pub mod repository;

pub use repository::{InMemoryResumeRepository, PgResumeRepository, ResumeRepository};
