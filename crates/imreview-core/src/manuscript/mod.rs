//! Manuscripts under editorial review

mod manuscript;
mod status;

pub use manuscript::{AuthorRecord, Manuscript, ManuscriptId, StatusOverride};
pub use status::ManuscriptStatus;
