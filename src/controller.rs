//! Concurrent submission of optimization jobs.
//!
//! [`MultiJobController`] fans problems out to a [`JobExecutor`] on a fixed
//! pool of worker threads, so at most `concurrency` jobs are in flight no
//! matter how many are submitted. Each finished job appends its response to a
//! [`ResponseSink`] and then counts down a [`CountDownLatch`]; once the latch
//! is open the sink holds exactly one response per submitted job, in
//! completion order.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::codec::{self, CodecError};
use crate::docloud::{ClientError, DocloudClient, DocloudConfig};
use crate::job::{ExecuteOptions, ExecuteRequest, JobExecutor, JobInput, JobResponse};
use crate::latch::CountDownLatch;
use crate::model::{ModelError, Problem};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),
    #[error("failed to start worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to build job client")]
    Client(#[from] ClientError),
    #[error("problem has no id to correlate its response with")]
    MissingProblemId,
    #[error("problem {problem_id} is invalid")]
    InvalidProblem {
        problem_id: String,
        #[source]
        source: ModelError,
    },
    #[error("failed to encode problem {problem_id}")]
    Encode {
        problem_id: String,
        #[source]
        source: CodecError,
    },
}

/// Fixed values sent with every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOptions {
    /// Attachment name of the optimization model.
    pub model_name: String,
    /// Local file holding the optimization model.
    pub model_file: PathBuf,
    /// Attachment name of the encoded problem.
    pub data_name: String,
    /// Job parameter carrying the problem id.
    pub problem_id_key: String,
    /// Output attachment holding the solution; see [`ExecuteOptions::output`].
    pub output: Option<String>,
    pub gzip: bool,
    pub load_solution: bool,
    pub delete_on_completion: bool,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self {
            model_name: "truck.mod".to_string(),
            model_file: PathBuf::from("models/truck.mod"),
            data_name: "truck.json".to_string(),
            problem_id_key: "oaas.client.problem.id".to_string(),
            output: None,
            gzip: true,
            load_solution: true,
            delete_on_completion: true,
        }
    }
}

impl SubmissionOptions {
    fn request_for(&self, problem_id: &str, data: Vec<u8>) -> ExecuteRequest {
        let mut parameters = BTreeMap::new();
        parameters.insert(self.problem_id_key.clone(), problem_id.to_string());

        ExecuteRequest {
            inputs: vec![
                JobInput::file(self.model_name.clone(), self.model_file.clone()),
                JobInput::data(self.data_name.clone(), data),
            ],
            options: ExecuteOptions {
                gzip: self.gzip,
                load_solution: self.load_solution,
                delete_on_completion: self.delete_on_completion,
                parameters,
                output: self.output.clone(),
                ..ExecuteOptions::default()
            },
        }
    }
}

/// Shared, append-only collection of job responses.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct ResponseSink {
    responses: Arc<Mutex<Vec<JobResponse>>>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: JobResponse) {
        self.responses.lock().push(response);
    }

    pub fn len(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.lock().is_empty()
    }

    /// Copy of the responses collected so far.
    pub fn snapshot(&self) -> Vec<JobResponse> {
        self.responses.lock().clone()
    }

    /// Remove and return every collected response.
    pub fn take(&self) -> Vec<JobResponse> {
        std::mem::take(&mut *self.responses.lock())
    }
}

/// Number of tasks queued or running on the pool.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    fn enter(&self) {
        *self.count.lock() += 1;
    }

    fn leave(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }
}

/// Submits jobs asynchronously with bounded concurrency.
pub struct MultiJobController<E> {
    executor: Arc<E>,
    pool: rayon::ThreadPool,
    in_flight: Arc<InFlight>,
    options: SubmissionOptions,
    concurrency: usize,
}

impl MultiJobController<DocloudClient> {
    /// Controller backed by the DOcloud REST client.
    pub fn connect(config: DocloudConfig, concurrency: usize) -> Result<Self, ControllerError> {
        Self::new(DocloudClient::new(config)?, concurrency)
    }
}

impl<E> MultiJobController<E>
where
    E: JobExecutor + Send + Sync + 'static,
{
    pub fn new(executor: E, concurrency: usize) -> Result<Self, ControllerError> {
        if concurrency == 0 {
            return Err(ControllerError::InvalidConcurrency(concurrency));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|index| format!("job-worker-{index}"))
            .build()?;

        Ok(Self {
            executor: Arc::new(executor),
            pool,
            in_flight: Arc::new(InFlight::default()),
            options: SubmissionOptions::default(),
            concurrency,
        })
    }

    pub fn with_options(mut self, options: SubmissionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SubmissionOptions {
        &self.options
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Queue `problem` for execution and return immediately.
    ///
    /// The problem is validated and encoded on the calling thread, so those
    /// errors surface here. The remote execution runs on a worker: its
    /// response, failed or not, is pushed to `sink` and only then is `latch`
    /// counted down.
    pub fn submit(&self, problem: Problem, sink: &ResponseSink, latch: &Arc<CountDownLatch>) -> Result<(), ControllerError> {
        let (problem_id, request) = self.prepare(&problem)?;
        self.spawn(problem_id, request, sink.clone(), Arc::clone(latch));
        Ok(())
    }

    /// Submit every problem, wait for all of them and return their responses
    /// in completion order.
    ///
    /// Nothing is submitted unless every problem validates and encodes.
    pub fn submit_all(&self, problems: impl IntoIterator<Item = Problem>) -> Result<Vec<JobResponse>, ControllerError> {
        let prepared = problems
            .into_iter()
            .map(|problem| self.prepare(&problem))
            .collect::<Result<Vec<_>, _>>()?;

        let sink = ResponseSink::new();
        let latch = Arc::new(CountDownLatch::new(prepared.len()));
        for (problem_id, request) in prepared {
            self.spawn(problem_id, request, sink.clone(), Arc::clone(&latch));
        }
        latch.wait();

        Ok(sink.take())
    }

    /// Wait for every queued and running job, then stop the workers.
    pub fn shutdown(self) {
        self.in_flight.wait_drained();
        info!("job controller shut down");
    }

    fn prepare(&self, problem: &Problem) -> Result<(String, ExecuteRequest), ControllerError> {
        let problem_id = problem.problem_id.clone().ok_or(ControllerError::MissingProblemId)?;
        problem.validate().map_err(|source| ControllerError::InvalidProblem {
            problem_id: problem_id.clone(),
            source,
        })?;
        let data = codec::encode_to_vec(problem).map_err(|source| ControllerError::Encode {
            problem_id: problem_id.clone(),
            source,
        })?;

        let request = self.options.request_for(&problem_id, data);
        Ok((problem_id, request))
    }

    fn spawn(&self, problem_id: String, request: ExecuteRequest, sink: ResponseSink, latch: Arc<CountDownLatch>) {
        let executor = Arc::clone(&self.executor);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.enter();
        info!(problem_id = %problem_id, concurrency = self.concurrency, "submitting job");

        self.pool.spawn(move || {
            info!(problem_id = %problem_id, "running job");
            let response = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&request))).unwrap_or_else(|_| {
                warn!(problem_id = %problem_id, "job executor panicked");
                JobResponse::failed(&request.options.parameters, "job executor panicked")
            });

            if response.is_processed() {
                info!(problem_id = %problem_id, status = %response.execution_status, "job finished");
            } else {
                warn!(
                    problem_id = %problem_id,
                    status = %response.execution_status,
                    failure = response.failure_message().unwrap_or(""),
                    "job did not succeed"
                );
            }

            sink.push(response);
            latch.count_down();
            in_flight.leave();
        });
    }
}
