//! Job executors used in place of the remote service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use trucking_jobs::job::{ExecuteRequest, JobExecutionStatus, JobExecutor, JobInfo, JobResponse};

use super::solutions::sample_solution_bytes;

/// A processed response echoing the request parameters.
pub fn processed(request: &ExecuteRequest) -> JobResponse {
    JobResponse {
        job_info: JobInfo::from_parameters(&request.options.parameters),
        execution_status: JobExecutionStatus::Processed,
        solution: Some(sample_solution_bytes()),
        log: None,
    }
}

/// Records how many jobs run at the same time.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl JobExecutor for ConcurrencyProbe {
    fn execute(&self, request: &ExecuteRequest) -> JobResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        thread::sleep(self.delay);

        self.running.fetch_sub(1, Ordering::SeqCst);
        processed(request)
    }
}

/// Delegates to a closure.
pub struct FnExecutor<F>(pub F);

impl<F> JobExecutor for FnExecutor<F>
where
    F: Fn(&ExecuteRequest) -> JobResponse,
{
    fn execute(&self, request: &ExecuteRequest) -> JobResponse {
        (self.0)(request)
    }
}

/// Panics on every call.
pub struct PanickingExecutor;

impl JobExecutor for PanickingExecutor {
    fn execute(&self, _request: &ExecuteRequest) -> JobResponse {
        panic!("solver exploded");
    }
}
