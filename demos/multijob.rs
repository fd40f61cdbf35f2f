//! Submit several randomized problems concurrently and report each outcome.

use std::error::Error;
use std::sync::Arc;

use trucking_jobs::controller::{MultiJobController, ResponseSink};
use trucking_jobs::docloud::DocloudConfig;
use trucking_jobs::factory::build_randomized_problem;
use trucking_jobs::latch::CountDownLatch;
use trucking_jobs::report::summarize;

/// Number of jobs to submit.
const NB_JOBS: u32 = 5;
/// Number of jobs running at the same time.
const NB_CONCURRENT: usize = 3;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let controller = MultiJobController::connect(DocloudConfig::from_env()?, NB_CONCURRENT)?;
    let responses = ResponseSink::new();
    let latch = Arc::new(CountDownLatch::new(NB_JOBS as usize));

    for i in 0..NB_JOBS {
        let mean = 300.0 + f64::from(i) * 50.0;
        let std_dev = 100.0 + f64::from(i) * 20.0;
        let problem = build_randomized_problem(1, mean, std_dev)?.with_id(format!("Problem #{i}"));
        println!("Creating and submitting problem {i}");
        controller.submit(problem, &responses, &latch)?;
    }

    latch.wait();

    let key = controller.options().problem_id_key.clone();
    for response in responses.take() {
        println!("{}", summarize(&response, &key)?);
    }

    controller.shutdown();
    Ok(())
}
