//! Campaign registry adapters.
//!
//! - `HttpCampaignRegistry` - POSTs completed briefs to the campaign service

mod http_campaign_registry;

pub use http_campaign_registry::HttpCampaignRegistry;
