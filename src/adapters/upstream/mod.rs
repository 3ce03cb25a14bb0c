//! Upstream adapters - readers for the live score provider.

mod http_source;

pub use http_source::HttpUpstreamSource;
