//! On-disk persistence for the node registry

pub mod document;

pub use document::{DocumentStore, StoreDocument, StoreDocumentRef, DOCUMENT_FILE};
