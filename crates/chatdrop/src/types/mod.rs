mod document_ref;
mod user_id;

pub use document_ref::DocumentRef;
pub use user_id::UserId;
