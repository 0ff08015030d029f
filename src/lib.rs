pub mod cli;
pub mod client;
pub mod collectors;
pub mod error;
pub mod exporter;
pub mod json;
pub mod queries;
pub mod timespan;

/// Build-time metadata captured by `built`.
pub mod built_info {
    #![allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
