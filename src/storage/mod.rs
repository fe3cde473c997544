//! File storage primitives: path validation, content hashing, and the
//! metadata sidecar store (§3, §4.1, §4.2, §4.4).

pub mod hash;
pub mod metadata;
pub mod path;

pub use hash::digest_file;
pub use metadata::MetadataStore;
pub use path::{PathValidationError, ValidatedName, validate_name};
