//! Domain entities - the core business objects.

mod category;
mod comment;
mod location;
mod post;
mod user;

pub use category::Category;
pub use comment::{Comment, CommentCard};
pub use location::Location;
pub use post::{Post, PostCard, PostDraft};
pub use user::{Author, User};
