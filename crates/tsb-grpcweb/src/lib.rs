//! gRPC-Web adapter for the remote schedule service.
//!
//! Implements the core's `RemoteConnector`, `ScheduleService` and
//! `SnapshotSource` ports.

pub mod client;
pub mod connector;
pub mod framing;
pub mod normalize;
pub mod proto;
pub mod service;
pub mod snapshots;
pub mod token;

pub use client::GrpcWebClient;
pub use connector::{GrpcWebConnector, RemoteSettings};
pub use framing::FrameMode;
pub use service::GrpcScheduleService;
pub use snapshots::HttpSnapshotSource;
pub use token::ClientCredentials;
