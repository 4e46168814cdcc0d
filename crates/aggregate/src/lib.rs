//! Pure, synchronous aggregation over raw tool output: line cleaning, endpoint
//! grouping and parameter indexing.

mod endpoint;
mod group;
mod normalize;
mod params;

pub use endpoint::{query_pairs, NormalizedUrl};
pub use group::{group, group_endpoints, EndpointGroup, Grouping};
pub use normalize::{is_static_asset, normalize_hosts, normalize_urls, STATIC_EXTENSIONS};
pub use params::{index, ParameterIndex};
