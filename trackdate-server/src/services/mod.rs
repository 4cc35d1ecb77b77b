//! Service clients and the resolution pipeline

pub mod catalog;
pub mod queue;
pub mod resolver;
pub mod sampler;
pub mod streaming;

pub use catalog::{CatalogClient, CatalogError, Master, Release, SearchEntry};
pub use queue::{QueueClient, QueueError};
pub use resolver::{fallback_to_streaming, normalize, Resolver};
pub use sampler::{extract_playlist_id, Sampler, SamplerError};
pub use streaming::{PlaylistTrack, StreamingClient, StreamingError};
