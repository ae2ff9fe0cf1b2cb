//! Persisted state.
//!
//! The only state that survives between runs is the presence (and content)
//! of files: metadata snapshots, tiles and assembled pages. Everything that
//! checks or writes that state goes through [`StateStore`], so the on-disk
//! layout can be swapped for another key-value backend without touching the
//! acquisition or assembly code.

mod fs_store;
mod layout;
mod memory_store;
mod state_store;

pub use fs_store::FsStore;
pub use layout::{
    Layout, ASSEMBLED_PREFIX, DEFAULT_OUTPUT_DIR, MANUSCRIPT_METADATA_FILENAME,
    PAGE_METADATA_FILENAME,
};
pub use memory_store::MemoryStore;
pub use state_store::StateStore;
