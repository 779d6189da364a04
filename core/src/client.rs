//! Blocking client for the Neon control-plane API.
//!
//! # Design
//! Every operation is split three ways. `build_*` produces an `HttpRequest`
//! with base URL, auth and headers applied and touches nothing else.
//! `parse_*` classifies an `HttpResponse` and maps it into domain records.
//! The executing method chains them through the retry stage in
//! `crate::pipeline`. The client holds only immutable configuration and a
//! transport handle, so concurrent calls share nothing mutable.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_RETRY_BACKOFF};
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::pipeline::{self, RetryPolicy};
use crate::region::normalize_region_id;
use crate::types::{
    BranchCreateResult, ClientOptions, MutationResult, Project, ProjectCreate, ProjectEnvelope,
    ProjectMutationResult, ProjectUpdate,
};

const API_PREFIX: &str = "api/v1";

#[derive(Clone)]
pub struct NeonApiClient<T = UreqTransport> {
    transport: T,
    base_url: String,
    auth_token: String,
    debug: bool,
    retry_backoff: Duration,
}

impl<T: Transport> NeonApiClient<T> {
    pub fn new(transport: T, auth_token: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            debug: false,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn from_config(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.api_key().to_string(),
            debug: config.debug,
            retry_backoff: config.retry_backoff,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Toggle verbose request/response logging and capture of every attempt.
    /// Meant for local troubleshooting.
    pub fn set_debug(&mut self, enable: bool) -> &mut Self {
        self.debug = enable;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    pub fn build_project_create(&self, input: &ProjectCreate) -> Result<HttpRequest, Error> {
        let region_id = normalize_region_id(&input.region_id)?;
        debug!(given = %input.region_id, normalized = region_id, "normalized region id");
        let project = ProjectCreate {
            region_id: region_id.to_string(),
            ..input.clone()
        };
        self.request(HttpMethod::Post, "projects", Some(&ProjectEnvelope { project: &project }))
    }

    pub fn build_project_read(&self, project_id: &str) -> Result<HttpRequest, Error> {
        Ok(self.bodyless(HttpMethod::Get, &project_path(project_id, "")?))
    }

    pub fn build_project_update(
        &self,
        project_id: &str,
        input: &ProjectUpdate,
    ) -> Result<HttpRequest, Error> {
        self.request(
            HttpMethod::Patch,
            &project_path(project_id, "")?,
            Some(&ProjectEnvelope { project: input }),
        )
    }

    pub fn build_project_delete(&self, project_id: &str) -> Result<HttpRequest, Error> {
        Ok(self.bodyless(HttpMethod::Post, &project_path(project_id, "/delete")?))
    }

    pub fn build_branch_create(&self, parent_project_id: &str) -> Result<HttpRequest, Error> {
        Ok(self.bodyless(HttpMethod::Post, &project_path(parent_project_id, "/branches")?))
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    pub fn parse_project_create(
        &self,
        response: &HttpResponse,
    ) -> Result<ProjectMutationResult, Error> {
        parse_mutation(response)
    }

    /// A 2xx with an empty or `null` body maps to `Project::default()`; a
    /// nonexistent project surfaces as a 404 `ApiError`.
    pub fn parse_project_read(&self, response: &HttpResponse) -> Result<Project, Error> {
        let project: Option<Option<Project>> = pipeline::decode(response)?;
        Ok(project.flatten().unwrap_or_default())
    }

    pub fn parse_project_update(
        &self,
        response: &HttpResponse,
    ) -> Result<ProjectMutationResult, Error> {
        parse_mutation(response)
    }

    pub fn parse_project_delete(&self, response: &HttpResponse) -> Result<(), Error> {
        pipeline::classify(response)
    }

    pub fn parse_branch_create(
        &self,
        response: &HttpResponse,
    ) -> Result<BranchCreateResult, Error> {
        parse_mutation(response)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn project_create(
        &self,
        input: &ProjectCreate,
        options: &ClientOptions,
    ) -> Result<ProjectMutationResult, Error> {
        let request = self.build_project_create(input)?;
        let response = self.send(&request, options)?;
        self.parse_project_create(&response)
    }

    pub fn project_read(
        &self,
        project_id: &str,
        options: &ClientOptions,
    ) -> Result<Project, Error> {
        let request = self.build_project_read(project_id)?;
        let response = self.send(&request, options)?;
        self.parse_project_read(&response)
    }

    pub fn project_update(
        &self,
        project_id: &str,
        input: &ProjectUpdate,
        options: &ClientOptions,
    ) -> Result<ProjectMutationResult, Error> {
        let request = self.build_project_update(project_id, input)?;
        let response = self.send(&request, options)?;
        self.parse_project_update(&response)
    }

    /// Branches are deleted through this call as well.
    pub fn project_delete(&self, project_id: &str, options: &ClientOptions) -> Result<(), Error> {
        let request = self.build_project_delete(project_id)?;
        let response = self.send(&request, options)?;
        self.parse_project_delete(&response)
    }

    pub fn branch_create(
        &self,
        parent_project_id: &str,
        options: &ClientOptions,
    ) -> Result<BranchCreateResult, Error> {
        let request = self.build_branch_create(parent_project_id)?;
        let response = self.send(&request, options)?;
        self.parse_branch_create(&response)
    }

    fn send(&self, request: &HttpRequest, options: &ClientOptions) -> Result<HttpResponse, Error> {
        let policy = RetryPolicy {
            retries: options.num_retries,
            backoff: self.retry_backoff,
            debug: self.debug,
        };
        pipeline::send(&self.transport, request, &policy)
    }

    fn request<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, Error> {
        let mut request = self.bodyless(method, path);
        if let Some(body) = body {
            let body =
                serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
            request.body = Some(body);
        }
        Ok(request)
    }

    fn bodyless(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}/{API_PREFIX}/{path}", self.base_url),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), format!("Bearer {}", self.auth_token)),
            ],
            body: None,
        }
    }
}

impl NeonApiClient<UreqTransport> {
    /// Client over a fresh `ureq` agent, configured from `config`.
    pub fn with_default_transport(config: &ClientConfig) -> Self {
        Self::from_config(UreqTransport::new(), config)
    }
}

impl<T> fmt::Debug for NeonApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeonApiClient")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[redacted]")
            .field("debug", &self.debug)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

/// `projects/{id}{suffix}` with the id encoded as a single path segment.
fn project_path(project_id: &str, suffix: &str) -> Result<String, Error> {
    if project_id.is_empty() {
        return Err(Error::EmptyProjectId);
    }
    Ok(format!("projects/{}{suffix}", urlencoding::encode(project_id)))
}

fn parse_mutation<R>(response: &HttpResponse) -> Result<MutationResult<R>, Error>
where
    R: serde::de::DeserializeOwned,
    for<'a> Project: From<&'a R>,
{
    let response: R = pipeline::decode(response)?
        .ok_or_else(|| Error::Deserialization("empty response body".to_string()))?;
    Ok(MutationResult {
        project: Project::from(&response),
        response,
    })
}
