//! Flat index files: parsing, writing, filtering and discovery.

mod filter;
mod loader;
mod source;

pub use filter::{IndexFilter, is_junk};
pub use loader::{MAX_LINE_BYTES, load_index, load_index_with_limit, save_index};
pub use source::{
    DiscoveredSource, IndexSourceFile, RemoteSource, discover_sources, parent_dir_name,
};
