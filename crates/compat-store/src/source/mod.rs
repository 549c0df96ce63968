//! Blob sources: where compressed report files come from.
//!
//! A source only knows keys and bytes. Status codes stay inside [`HttpSource`];
//! decoding happens in the store.

use async_trait::async_trait;

use crate::error::StoreResult;

mod http;
mod memory;

pub use http::HttpSource;
pub use memory::MemorySource;

/// Raw blob retrieval.
#[async_trait]
pub trait BlobSource: Send + Sync {
    /// Fetch the blob stored under `key`. `Ok(None)` means it does not exist.
    async fn fetch(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}
