//! Blocking API client for the Neon managed-Postgres control plane.
//!
//! # Overview
//! Creates, reads, updates and deletes projects and branches over the
//! `/api/v1/` REST API. Each operation is one HTTP round trip, retried on
//! transport failure up to the per-call retry count.
//!
//! # Design
//! - `NeonApiClient` holds immutable configuration and a `Transport` handle;
//!   there is no client-side state between calls.
//! - Operations are split into `build_*` (request) and `parse_*` (response)
//!   around the retry stage in `pipeline`, so each stage is testable without
//!   a network.
//! - Failures are classified into structured API errors, unstructured bad
//!   responses (with a raw dump for troubleshooting) and transport errors.
//! - Branches are projects with a parent; both map into `Project`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod region;
pub mod types;

pub use client::NeonApiClient;
pub use config::{ClientConfig, ConfigError, API_KEY_ENV};
pub use error::{ApiError, Error};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use region::{normalize_region_id, RegionParseError};
pub use types::{
    BranchCreateResult, BranchResponse, ClientOptions, MutationResult, Project, ProjectCreate,
    ProjectMutationResult, ProjectResponse, ProjectUpdate, Settings,
};
