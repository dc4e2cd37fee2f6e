#![deny(unsafe_code)]

pub mod batch;

pub use batch::{DEFAULT_MAX_CHARS, DEFAULT_PAGES_PER_CHUNK, chunk, paginate};
