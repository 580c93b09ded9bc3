pub mod archive;
pub mod checksum;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
