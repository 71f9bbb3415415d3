//! Backend adapter implementations.
//!
//! Each module provides a struct implementing [`crate::backend::SearchBackend`]
//! on top of one narrow client interface from [`crate::clients`].

pub mod catalog;
pub mod fulltext;
pub mod listing;

pub use catalog::CatalogBackend;
pub use fulltext::FullTextBackend;
pub use listing::ListingBackend;
