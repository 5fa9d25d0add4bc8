//! Marketplace adapters and cross-catalog identity.
//!
//! Two adapters share one contract: authenticate, search by catalog item,
//! emit `RawListing`s. The eBay adapter owns an OAuth2 token cache with
//! single-flight refresh; the BrickOwl adapter owns a process-wide request
//! pacer and the opaque-id resolution workflow. Raw HTTP never leaks:
//! failures become `MarketError` at this boundary.

pub mod brickowl;
pub mod ebay;
pub mod error;
pub mod normalize;
pub mod rebrickable;
pub mod resolve;
pub mod types;

pub use brickowl::BrickOwlClient;
pub use ebay::EbayClient;
pub use error::MarketError;
pub use normalize::{NormalizeError, normalize_listing};
pub use rebrickable::RebrickableClient;
pub use resolve::{CachedId, DetectedId, IdCache, ResolveOutcome, Resolver, detect};
pub use types::RawListing;

/// Hard ceiling for any marketplace HTTP round-trip.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
