//! Serving files: where they come from and how they are answered.

mod directory;
mod resolver;
mod response;

pub use directory::DirectoryHandler;
#[cfg(test)]
pub use resolver::MockFileResolver;
pub use resolver::{FileResolver, FsResolver, ResolveError, ResolvedFile};
pub use response::{content_type, write_file_response};
