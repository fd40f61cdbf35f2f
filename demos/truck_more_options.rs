//! Same as `truck_basic`, with compression, a wait limit, the solver log and
//! job deletion.

use std::error::Error;
use std::time::Duration;

use trucking_jobs::docloud::{DocloudClient, DocloudConfig};
use trucking_jobs::job::{ExecuteOptions, ExecuteRequest, JobInput};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = DocloudClient::new(DocloudConfig::from_env()?)?;
    let model = std::fs::read("models/truck.mod")?;
    let request = ExecuteRequest {
        inputs: vec![
            JobInput::data("truck.mod", model),
            JobInput::from_path("models/truck.dat"),
        ],
        options: ExecuteOptions {
            gzip: true,
            load_solution: true,
            fetch_log: true,
            delete_on_completion: true,
            wait_time: Some(Duration::from_secs(300)),
            output: Some("solution.json".to_string()),
            ..ExecuteOptions::default()
        },
    };

    let response = client.try_execute(&request)?;
    if let Some(solution) = &response.solution {
        std::fs::write("results.json", solution)?;
    }
    if let Some(log) = &response.log {
        std::fs::write("solver.log", log)?;
    }
    println!("job {}", response.execution_status);
    Ok(())
}
