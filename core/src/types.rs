//! Domain records and wire payloads for the Neon control-plane API.
//!
//! # Design
//! Projects and branches come back in overlapping but distinct response
//! shapes. Both collapse into `Project`, the record callers consume; the full
//! response is kept alongside it in `MutationResult`. The API sends `null` for
//! unset fields, which decodes to the zero value rather than failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

pub type Settings = BTreeMap<String, String>;

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The common record for projects and branches.
///
/// A branch is a project with a non-empty `parent_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub instance_handle: String,
    #[serde(default, deserialize_with = "nullable")]
    pub instance_type_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub platform_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub region_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub settings: Settings,
}

impl Project {
    /// True for the record produced by an empty read response.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_branch(&self) -> bool {
        !self.parent_id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default, deserialize_with = "nullable")]
    pub id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub owner_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, deserialize_with = "nullable")]
    pub dsn: String,
    #[serde(default, deserialize_with = "nullable")]
    pub id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub password: String,
}

/// Full response to a project create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectResponse {
    #[serde(deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(deserialize_with = "nullable")]
    pub current_state: String,
    #[serde(deserialize_with = "nullable")]
    pub databases: Vec<Database>,
    #[serde(deserialize_with = "nullable")]
    pub deleted: bool,
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub instance_handle: String,
    #[serde(deserialize_with = "nullable")]
    pub instance_type_id: String,
    #[serde(deserialize_with = "nullable")]
    pub max_project_size: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub parent_id: String,
    #[serde(deserialize_with = "nullable")]
    pub pending_state: String,
    #[serde(deserialize_with = "nullable")]
    pub platform_id: String,
    #[serde(deserialize_with = "nullable")]
    pub platform_name: String,
    #[serde(deserialize_with = "nullable")]
    pub pooler_enabled: bool,
    #[serde(deserialize_with = "nullable")]
    pub region_id: String,
    #[serde(deserialize_with = "nullable")]
    pub region_name: String,
    #[serde(deserialize_with = "nullable")]
    pub roles: Vec<Role>,
    #[serde(deserialize_with = "nullable")]
    pub settings: Settings,
    #[serde(deserialize_with = "nullable")]
    pub size: i64,
    #[serde(deserialize_with = "nullable")]
    pub updated_at: String,
}

/// Full response to a branch create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchResponse {
    #[serde(deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(deserialize_with = "nullable")]
    pub current_state: String,
    #[serde(deserialize_with = "nullable")]
    pub deleted: bool,
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub instance_handle: String,
    #[serde(deserialize_with = "nullable")]
    pub instance_type_id: String,
    #[serde(deserialize_with = "nullable")]
    pub max_project_size: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub parent_id: String,
    #[serde(deserialize_with = "nullable")]
    pub pending_state: String,
    #[serde(deserialize_with = "nullable")]
    pub platform_id: String,
    #[serde(deserialize_with = "nullable")]
    pub platform_name: String,
    #[serde(deserialize_with = "nullable")]
    pub pooler_enabled: bool,
    #[serde(deserialize_with = "nullable")]
    pub region_id: String,
    #[serde(deserialize_with = "nullable")]
    pub region_name: String,
    #[serde(deserialize_with = "nullable")]
    pub settings: Settings,
    #[serde(deserialize_with = "nullable")]
    pub size: i64,
    #[serde(deserialize_with = "nullable")]
    pub updated_at: String,
}

impl From<&ProjectResponse> for Project {
    fn from(response: &ProjectResponse) -> Self {
        Project {
            id: response.id.clone(),
            name: response.name.clone(),
            instance_handle: response.instance_handle.clone(),
            instance_type_id: response.instance_type_id.clone(),
            parent_id: response.parent_id.clone(),
            platform_id: response.platform_id.clone(),
            region_id: response.region_id.clone(),
            settings: response.settings.clone(),
        }
    }
}

impl From<&BranchResponse> for Project {
    fn from(response: &BranchResponse) -> Self {
        Project {
            id: response.id.clone(),
            name: response.name.clone(),
            instance_handle: response.instance_handle.clone(),
            instance_type_id: response.instance_type_id.clone(),
            parent_id: response.parent_id.clone(),
            platform_id: response.platform_id.clone(),
            region_id: response.region_id.clone(),
            settings: response.settings.clone(),
        }
    }
}

/// A mapped record together with the response it was mapped from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult<R> {
    pub project: Project,
    pub response: R,
}

pub type ProjectMutationResult = MutationResult<ProjectResponse>;

pub type BranchCreateResult = MutationResult<BranchResponse>;

/// Input for creating a project. `region_id` uses the `aws-us-west-2` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub instance_handle: String,
    pub name: String,
    pub platform_id: String,
    pub region_id: String,
    #[serde(default)]
    pub settings: Settings,
}

/// Partial update of a project. Only the fields present are sent; omitted
/// fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pooler_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

/// The `{"project": ...}` wrapper the API expects around request bodies.
#[derive(Debug, Serialize)]
pub(crate) struct ProjectEnvelope<'a, T> {
    pub project: &'a T,
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Extra attempts after the first one fails. 0 disables retries.
    pub num_retries: u32,
}

impl ClientOptions {
    pub fn with_retries(num_retries: u32) -> Self {
        Self { num_retries }
    }
}
