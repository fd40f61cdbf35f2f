//! Contract with the remote job-execution service.
//!
//! A [`JobExecutor`] runs one job to completion and reports the outcome as a
//! [`JobResponse`]. Remote failures are data, not errors: a network problem or
//! a failed solve comes back as a response with [`JobExecutionStatus::Failed`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the bytes of an input attachment come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Read from a local file when the job is executed.
    Path(PathBuf),
    /// In-memory payload.
    Data(Vec<u8>),
}

/// A named input attachment of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    pub name: String,
    pub source: InputSource,
}

impl JobInput {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Path(path.into()),
        }
    }

    pub fn data(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Data(data),
        }
    }

    /// Attachment named after the file's own name (`models/truck.mod` -> `truck.mod`).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            source: InputSource::Path(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecuteOptions {
    /// Compress attachments before upload.
    pub gzip: bool,
    /// Download the solution attachment once the job is processed.
    pub load_solution: bool,
    /// Download the solver log once the job has finished.
    pub fetch_log: bool,
    /// Delete the job from the service after its results are fetched.
    pub delete_on_completion: bool,
    /// Give up waiting after this long; `None` waits indefinitely.
    pub wait_time: Option<Duration>,
    /// Job parameters, echoed back in the job info.
    pub parameters: BTreeMap<String, String>,
    /// Output attachment to load as the solution. When unset the client's
    /// configured default and the first JSON output are tried.
    pub output: Option<String>,
}

/// Everything needed to run one job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecuteRequest {
    pub inputs: Vec<JobInput>,
    pub options: ExecuteOptions,
}

/// Lifecycle states reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobExecutionStatus {
    Created,
    NotStarted,
    Running,
    Interrupting,
    Interrupted,
    Failed,
    Processed,
}

impl JobExecutionStatus {
    /// True once the job will not change state any more.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Failed | Self::Interrupted)
    }
}

impl fmt::Display for JobExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "CREATED",
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Interrupting => "INTERRUPTING",
            Self::Interrupted => "INTERRUPTED",
            Self::Failed => "FAILED",
            Self::Processed => "PROCESSED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobFailure {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentType {
    InputAttachment,
    OutputAttachment,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttachmentType,
}

/// Job description as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Parameters as the service reports them; not every value is a string.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInfo>,
}

impl JobInfo {
    /// Job info carrying only the given request parameters.
    pub fn from_parameters(parameters: &BTreeMap<String, String>) -> Self {
        Self {
            parameters: parameters
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect(),
            ..Self::default()
        }
    }
}

/// Outcome of one executed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResponse {
    pub job_info: JobInfo,
    pub execution_status: JobExecutionStatus,
    /// Raw solution bytes, when requested and available.
    pub solution: Option<Vec<u8>>,
    /// Raw solver log, when requested.
    pub log: Option<Vec<u8>>,
}

impl JobResponse {
    /// A failed response for a job that never produced job info of its own,
    /// keeping the request parameters so the caller can still correlate it.
    pub fn failed(parameters: &BTreeMap<String, String>, message: impl Into<String>) -> Self {
        Self {
            job_info: JobInfo {
                failure: Some(JobFailure {
                    message: message.into(),
                    kind: None,
                }),
                ..JobInfo::from_parameters(parameters)
            },
            execution_status: JobExecutionStatus::Failed,
            solution: None,
            log: None,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.execution_status == JobExecutionStatus::Processed
    }

    /// String value of a job parameter; `None` when absent or not a string.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.job_info.parameters.get(key).and_then(Value::as_str)
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.job_info.failure.as_ref().map(|failure| failure.message.as_str())
    }
}

/// Something that can run a job to completion on a remote solver.
///
/// `execute` blocks the calling thread until the job reaches a terminal
/// state (or the configured wait time runs out) and never panics on remote
/// errors.
pub trait JobExecutor {
    fn execute(&self, request: &ExecuteRequest) -> JobResponse;
}

impl<E: JobExecutor + ?Sized> JobExecutor for std::sync::Arc<E> {
    fn execute(&self, request: &ExecuteRequest) -> JobResponse {
        (**self).execute(request)
    }
}
