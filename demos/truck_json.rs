//! Encode the sample problem as JSON, solve it and display the decoded
//! solution.

use std::error::Error;

use trucking_jobs::codec;
use trucking_jobs::docloud::{DocloudClient, DocloudConfig};
use trucking_jobs::factory::build_sample_problem;
use trucking_jobs::job::{ExecuteOptions, ExecuteRequest, JobInput};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = DocloudClient::new(DocloudConfig::from_env()?)?;
    let problem = build_sample_problem();

    let request = ExecuteRequest {
        inputs: vec![
            JobInput::from_path("models/truck.mod"),
            JobInput::data("truck.json", codec::encode_to_vec(&problem)?),
        ],
        options: ExecuteOptions {
            gzip: true,
            load_solution: true,
            delete_on_completion: true,
            ..ExecuteOptions::default()
        },
    };

    let response = client.try_execute(&request)?;
    let Some(bytes) = response.solution.as_deref() else {
        println!(
            "{}: {}",
            response.execution_status,
            response.failure_message().unwrap_or("no solution")
        );
        return Ok(());
    };
    print!("{}", codec::decode_solution(bytes)?);
    Ok(())
}
