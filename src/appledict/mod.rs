//! Core reader for Apple Dictionary `Body.data` containers

pub mod cache;
pub mod codec;
pub mod config;
pub mod format;
pub mod index;
pub mod reader;
pub mod scanner;
pub mod types;
pub mod utils;

pub use reader::{DictionaryReader, IndexSource};
pub use types::error::{DictError, Result};
