//! shopsync: pull and push store resources between a shop and a local
//! directory tree.
//!
//! The [`sync`] module holds the resource-agnostic engine; [`shopify`]
//! supplies one [`resource::ResourceAdapter`] per resource type.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod resource;
pub mod shopify;
pub mod sync;
