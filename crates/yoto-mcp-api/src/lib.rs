//! Yoto content API client.
//!
//! Covers the authenticated HTTP surface the tools need: requesting an
//! upload slot, pushing audio bytes, polling the transcoder until it
//! produces a content-addressed reference, and creating/fetching/updating
//! MYO card documents. Card assembly itself is pure and lives in
//! [`card`].
//!
//! All calls take the bearer token as an argument; acquiring and
//! refreshing it is the business of `yoto-mcp-auth`.

pub mod card;
mod client;
mod error;
mod upload;

pub use card::{
    Card, CardContent, CardDocument, CardMetadata, CardSummary, Chapter, Display, MediaMetadata,
    Track,
};
pub use client::{ApiClient, ApiConfig};
pub use error::{ApiError, ApiResult};
pub use upload::{TranscodedAudio, TranscodedInfo, UploadSlot};
