//! Regional content targeting: region tags, `targetRegions` filtering and
//! IP geolocation.

pub mod filter;
pub mod region;
pub mod resolver;

pub use filter::{filter_document, filter_items, filter_items_by, is_visible};
pub use region::{Region, ALL_REGIONS};
pub use resolver::{GeoResolver, Provider, Resolution, ResolverConfig, Source};
