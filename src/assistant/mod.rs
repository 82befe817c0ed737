pub mod completion;
pub mod format;

pub use completion::CompletionClient;
