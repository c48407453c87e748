//! # Blogicum Shared
//!
//! Wire types of the blog API: the forms clients submit and the
//! envelopes the server answers with.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
