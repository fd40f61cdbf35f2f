//! HTTP adapter for the DOcloud job manager REST API.
//!
//! One [`JobExecutor::execute`] call walks the whole job lifecycle: create the
//! job, upload its attachments, start it, poll until it finishes, fetch job
//! info, solution and log, and optionally delete it.

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::job::{
    AttachmentType, ExecuteRequest, InputSource, JobExecutionStatus, JobExecutor, JobInfo, JobResponse,
};

/// Header carrying the API key.
const CLIENT_ID_HEADER: &str = "X-IBM-Client-Id";

#[derive(Debug, Clone)]
pub struct DocloudConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Delay between two execution status checks.
    pub poll_interval_ms: u64,
    /// Output attachment loaded as the solution.
    pub solution_attachment: String,
}

impl Default for DocloudConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-oaas.docloud.ibmcloud.com/job_manager/rest/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            poll_interval_ms: 2000,
            solution_attachment: "solution.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

impl DocloudConfig {
    /// Read the configuration from `DOCLOUD_*` environment variables.
    ///
    /// `DOCLOUD_URL` and `DOCLOUD_API_KEY` are required;
    /// `DOCLOUD_TIMEOUT_SECS` and `DOCLOUD_POLL_INTERVAL_MS` override the
    /// defaults when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let base_url = lookup("DOCLOUD_URL").ok_or(ConfigError::Missing("DOCLOUD_URL"))?;
        let api_key = lookup("DOCLOUD_API_KEY").ok_or(ConfigError::Missing("DOCLOUD_API_KEY"))?;
        let timeout_secs = parse_var(&lookup, "DOCLOUD_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs);
        let poll_interval_ms =
            parse_var(&lookup, "DOCLOUD_POLL_INTERVAL_MS")?.unwrap_or(defaults.poll_interval_ms);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
            poll_interval_ms,
            ..defaults
        })
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL `{0}` cannot carry a path")]
    NotABase(String),
    #[error("job creation response has no Location header")]
    MissingLocation,
    #[error("failed to read input file {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compress attachment `{name}`: {source}")]
    Compress {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("job {job_url} did not finish within {waited:?}")]
    Timeout { job_url: Url, waited: Duration },
}

#[derive(Debug, Serialize)]
struct CreateJobBody<'a> {
    attachments: Vec<AttachmentName<'a>>,
    parameters: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct AttachmentName<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecStatusBody {
    execution_status: JobExecutionStatus,
}

#[derive(Debug, Clone)]
pub struct DocloudClient {
    config: DocloudConfig,
    /// `config.base_url` with a trailing `/`, so relative references resolve below it.
    base_url: Url,
    client: reqwest::blocking::Client,
}

impl DocloudClient {
    pub fn new(config: DocloudConfig) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    pub fn config(&self) -> &DocloudConfig {
        &self.config
    }

    /// Run a job, returning transport and timeout problems as errors.
    ///
    /// [`JobExecutor::execute`] wraps this and turns errors into failed
    /// responses.
    pub fn try_execute(&self, request: &ExecuteRequest) -> Result<JobResponse, ClientError> {
        let job_url = self.create_job(request)?;
        let outcome = self.run_job(&job_url, request);

        if request.options.delete_on_completion {
            if let Err(err) = self.delete_job(&job_url) {
                warn!(job_url = %job_url, error = %err, "failed to delete job");
            }
        }

        outcome
    }

    fn run_job(&self, job_url: &Url, request: &ExecuteRequest) -> Result<JobResponse, ClientError> {
        for input in &request.inputs {
            self.upload_attachment(job_url, &input.name, &input.source, request.options.gzip)?;
        }

        debug!(job_url = %job_url, "starting job");
        self.client
            .post(child_url(job_url, &["execute"])?)
            .header(CLIENT_ID_HEADER, &self.config.api_key)
            .send()
            .and_then(|resp| resp.error_for_status())?;

        let execution_status = self.wait_for_completion(job_url, request.options.wait_time)?;
        let job_info = self.job_info(job_url)?;

        let attachment = solution_attachment(
            &job_info,
            request.options.output.as_deref(),
            &self.config.solution_attachment,
        );
        let solution = match attachment {
            Some(name) if request.options.load_solution && execution_status == JobExecutionStatus::Processed => {
                Some(self.download(child_url(job_url, &["attachments", name, "blob"])?)?)
            }
            _ => None,
        };
        let log = if request.options.fetch_log {
            Some(self.download(child_url(job_url, &["log", "blob"])?)?)
        } else {
            None
        };

        Ok(JobResponse {
            job_info,
            execution_status,
            solution,
            log,
        })
    }

    fn create_job(&self, request: &ExecuteRequest) -> Result<Url, ClientError> {
        let body = CreateJobBody {
            attachments: request
                .inputs
                .iter()
                .map(|input| AttachmentName { name: &input.name })
                .collect(),
            parameters: &request.options.parameters,
        };

        let response = self
            .client
            .post(child_url(&self.base_url, &["jobs"])?)
            .header(CLIENT_ID_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .and_then(|resp| resp.error_for_status())?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ClientError::MissingLocation)?;
        let job_url = resolve_location(&self.base_url, location)?;
        debug!(job_url = %job_url, "job created");
        Ok(job_url)
    }

    fn upload_attachment(&self, job_url: &Url, name: &str, source: &InputSource, gzip: bool) -> Result<(), ClientError> {
        let data = match source {
            InputSource::Data(bytes) => bytes.clone(),
            InputSource::Path(path) => std::fs::read(path).map_err(|source| ClientError::ReadInput {
                path: path.clone(),
                source,
            })?,
        };

        let mut upload = self
            .client
            .put(child_url(job_url, &["attachments", name, "blob"])?)
            .header(CLIENT_ID_HEADER, &self.config.api_key)
            .header(CONTENT_TYPE, "application/octet-stream");
        let body = if gzip {
            upload = upload.header(CONTENT_ENCODING, "gzip");
            gzip_bytes(&data).map_err(|source| ClientError::Compress {
                name: name.to_string(),
                source,
            })?
        } else {
            data
        };

        debug!(job_url = %job_url, attachment = name, bytes = body.len(), gzip, "uploading attachment");
        upload.body(body).send().and_then(|resp| resp.error_for_status())?;
        Ok(())
    }

    fn wait_for_completion(&self, job_url: &Url, wait_time: Option<Duration>) -> Result<JobExecutionStatus, ClientError> {
        let status_url = child_url(job_url, &["execStatus"])?;
        let started = Instant::now();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let status = self
                .client
                .get(status_url.clone())
                .header(CLIENT_ID_HEADER, &self.config.api_key)
                .send()
                .and_then(|resp| resp.error_for_status())
                .and_then(|resp| resp.json::<ExecStatusBody>())?
                .execution_status;
            debug!(job_url = %job_url, status = %status, "polled job");

            if status.is_terminal() {
                return Ok(status);
            }
            if let Some(limit) = wait_time {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(ClientError::Timeout {
                        job_url: job_url.clone(),
                        waited,
                    });
                }
            }
            thread::sleep(poll_interval);
        }
    }

    fn job_info(&self, job_url: &Url) -> Result<JobInfo, ClientError> {
        let info = self
            .client
            .get(job_url.clone())
            .header(CLIENT_ID_HEADER, &self.config.api_key)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<JobInfo>())?;
        Ok(info)
    }

    fn download(&self, url: Url) -> Result<Vec<u8>, ClientError> {
        debug!(url = %url, "downloading");
        let bytes = self
            .client
            .get(url)
            .header(CLIENT_ID_HEADER, &self.config.api_key)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.bytes())?;
        Ok(bytes.to_vec())
    }

    fn delete_job(&self, job_url: &Url) -> Result<(), ClientError> {
        debug!(job_url = %job_url, "deleting job");
        self.client
            .delete(job_url.clone())
            .header(CLIENT_ID_HEADER, &self.config.api_key)
            .send()
            .and_then(|resp| resp.error_for_status())?;
        Ok(())
    }
}

impl JobExecutor for DocloudClient {
    fn execute(&self, request: &ExecuteRequest) -> JobResponse {
        match self.try_execute(request) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "job execution failed");
                JobResponse::failed(&request.options.parameters, err.to_string())
            }
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut raw = raw.to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|source| ClientError::InvalidUrl { url: raw.clone(), source })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::NotABase(raw));
    }
    Ok(url)
}

/// Job URLs usually come back absolute; any other reference resolves against
/// the base URL.
fn resolve_location(base_url: &Url, location: &str) -> Result<Url, ClientError> {
    base_url.join(location).map_err(|source| ClientError::InvalidUrl {
        url: location.to_string(),
        source,
    })
}

/// `url` with `segments` appended to its path, each one percent-encoded.
fn child_url(url: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut child = url.clone();
    child
        .path_segments_mut()
        .map_err(|()| ClientError::NotABase(url.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(child)
}

/// Pick the output attachment to load as the solution.
///
/// A requested name is used only if the job has that output. Otherwise the
/// configured default wins, then the first JSON output, then the first output.
fn solution_attachment<'a>(info: &'a JobInfo, requested: Option<&str>, preferred: &str) -> Option<&'a str> {
    let outputs: Vec<&str> = info
        .attachments
        .iter()
        .filter(|attachment| attachment.kind == AttachmentType::OutputAttachment)
        .map(|attachment| attachment.name.as_str())
        .collect();

    if let Some(requested) = requested {
        return outputs.into_iter().find(|name| *name == requested);
    }
    outputs
        .iter()
        .find(|name| **name == preferred)
        .or_else(|| outputs.iter().find(|name| name.ends_with(".json")))
        .or_else(|| outputs.first())
        .copied()
}

fn gzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
