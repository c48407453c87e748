//! # Blogicum Core
//!
//! The domain layer of the blog platform: entities, the visibility and
//! ownership rules that govern content, listing queries and pagination.
//! This crate has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod policy;
pub mod ports;
pub mod query;

pub use error::{DomainError, RepoError};
pub use pagination::{PAGE_SIZE, Page, PageRequest};
pub use query::PostFilter;
