//! Music recognition service: accepts an audio upload, transcodes it to a
//! canonical MP3, submits it to a Shazam-compatible matcher and flattens the
//! response into a stable JSON record.

pub mod config;
pub mod error;
pub mod normalize;
pub mod server;
pub mod service;
pub mod shazam;
pub mod transcode;
pub mod upload;

pub use normalize::{normalize, Recognition, TrackInfo};
pub use server::{build_router, AppState};
pub use service::RecognitionService;
