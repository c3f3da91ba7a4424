//! Helpers for walking the schema-less settings trees stored with each inbound.

pub mod reality;
pub mod tree;

pub use reality::{first_short_id, normalize_short_ids};
pub use tree::{search_host, search_key};
