#![forbid(unsafe_code)]

pub mod repository;
pub mod rest;
pub mod sqlite;

pub use repository::{
    AssignmentListing, AssignmentStore, ContentStore, CourseWriter, InMemoryRepository, Storage,
    StorageError,
};
