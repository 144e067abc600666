//! Search backends.

pub mod memory;
pub mod solr;

pub use memory::MemoryIndex;
pub use solr::SolrBackend;
