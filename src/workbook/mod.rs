pub(crate) mod content_types;
pub(crate) mod formats;
pub(crate) mod manifest;
pub(crate) mod relationships;
pub(crate) mod shared_strings;
pub(crate) mod styles;
