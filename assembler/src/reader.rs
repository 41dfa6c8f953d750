use std::future::Future;
use std::io;
use std::path::PathBuf;

/// Source of file-slot content.
///
/// A seam over the filesystem: the protocol only cares that a read eventually
/// yields text, so tests can substitute readers with controlled timing to
/// exercise the ordering guarantee.
pub trait SlotReader: Clone + Send + Sync + 'static {
    fn read(&self, path: PathBuf) -> impl Future<Output = io::Result<String>> + Send;
}

/// Reads slot content from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl SlotReader for FsReader {
    fn read(&self, path: PathBuf) -> impl Future<Output = io::Result<String>> + Send {
        async move { tokio::fs::read_to_string(path).await }
    }
}
