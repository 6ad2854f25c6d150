pub mod api;
pub mod chunk;
pub mod document;
