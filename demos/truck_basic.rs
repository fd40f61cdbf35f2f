//! Run the trucking model on its `.dat` data file and save the solution.
//!
//! Requires `DOCLOUD_URL` and `DOCLOUD_API_KEY`.

use std::error::Error;

use trucking_jobs::docloud::{DocloudClient, DocloudConfig};
use trucking_jobs::job::{ExecuteOptions, ExecuteRequest, JobInput};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = DocloudClient::new(DocloudConfig::from_env()?)?;
    let request = ExecuteRequest {
        inputs: vec![
            JobInput::from_path("models/truck.dat"),
            JobInput::from_path("models/truck.mod"),
        ],
        options: ExecuteOptions {
            load_solution: true,
            ..ExecuteOptions::default()
        },
    };

    let response = client.try_execute(&request)?;
    match response.solution {
        Some(solution) => {
            std::fs::write("results.json", solution)?;
            println!("{}: solution written to results.json", response.execution_status);
        }
        None => println!(
            "{}: {}",
            response.execution_status,
            response.failure_message().unwrap_or("no solution")
        ),
    }
    Ok(())
}
