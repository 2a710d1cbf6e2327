//! Command implementations for OxiSeis CLI.

pub mod bench;
pub mod compress;
pub mod decompress;
pub mod info;

pub use bench::{BenchOptions, cmd_bench};
pub use compress::{CompressOptions, cmd_compress};
pub use decompress::cmd_decompress;
pub use info::cmd_info;
