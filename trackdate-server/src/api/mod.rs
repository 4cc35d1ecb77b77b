//! HTTP API handlers for trackdate-server

pub mod health;
pub mod playlist;
pub mod process;
pub mod stream;
pub mod worker;

pub use health::health_routes;
pub use playlist::playlist_routes;
pub use process::process_routes;
pub use stream::stream_routes;
pub use worker::worker_routes;
