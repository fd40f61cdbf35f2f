//! Human-readable rendering of solutions and job outcomes.

use std::fmt;

use crate::codec::{self, CodecError};
use crate::job::{JobExecutionStatus, JobResponse};
use crate::solution::Solution;

const SEPARATOR_WIDTH: usize = 80;

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(SEPARATOR_WIDTH);

        match self.total_cost() {
            Some(cost) => writeln!(f, "Total cost = {cost:.6}")?,
            None => writeln!(f, "Total cost = {}", self.result.display_field("totalCost"))?,
        }
        writeln!(f, "{separator}")?;

        for row in &self.in_volume_through_hub {
            writeln!(
                f,
                "Using: {} \t--> from: {} to Hub: {} (shipment destination: {}) --> shipped quantity = {}",
                row.display_field("truckType"),
                row.display_field("origin"),
                row.display_field("hub"),
                row.display_field("destination"),
                row.display_field("quantity"),
            )?;
        }
        writeln!(f, "{separator}")?;

        for row in &self.out_volume_through_hub {
            writeln!(
                f,
                "Using: {} \t--> from Hub: {} to: {} (shipment source: {}) --> shipped quantity = {}",
                row.display_field("truckType"),
                row.display_field("hub"),
                row.display_field("destination"),
                row.display_field("origin"),
                row.display_field("quantity"),
            )?;
        }
        writeln!(f, "{separator}")?;

        for row in &self.nb_trucks_on_route {
            writeln!(
                f,
                "{} truck(s) of type: {} are assigned to route: Spoke {} <--> Hub {}",
                row.display_field("nbTruck"),
                row.display_field("truckType"),
                row.display_field("spoke"),
                row.display_field("hub"),
            )?;
        }
        writeln!(f, "{separator}")?;

        for row in &self.inbound_aggregated {
            writeln!(
                f,
                "Aggregated quantity transported from Spoke: {} to Hub: {} using truck type: {} \t= {}",
                row.display_field("spoke"),
                row.display_field("hub"),
                row.display_field("truckType"),
                row.display_field("quantity"),
            )?;
        }
        writeln!(f, "{separator}")?;

        for row in &self.outbound_aggregated {
            writeln!(
                f,
                "Aggregated quantity transported from Hub: {} to Spoke: {} using truck type: {} \t= {}",
                row.display_field("hub"),
                row.display_field("spoke"),
                row.display_field("truckType"),
                row.display_field("quantity"),
            )?;
        }
        writeln!(f, "{separator}")
    }
}

/// One-line outcome of a job, keyed by the problem id it was submitted with.
///
/// Processed jobs report their total cost, failed jobs the service's failure
/// message verbatim. A processed job whose solution does not decode is an
/// error.
pub fn summarize(response: &JobResponse, problem_id_key: &str) -> Result<String, CodecError> {
    let problem_id = response.parameter(problem_id_key).unwrap_or("<unknown problem>");

    match response.execution_status {
        JobExecutionStatus::Processed => {
            let solution = codec::decode_solution(response.solution.as_deref().unwrap_or_default())?;
            let cost = solution
                .total_cost()
                .map_or_else(|| solution.result.display_field("totalCost"), |cost| cost.to_string());
            Ok(format!("{problem_id} --> TOTAL COST = {cost}"))
        }
        JobExecutionStatus::Failed => Ok(format!(
            "{problem_id} --> FAILED = {}",
            response.failure_message().unwrap_or("")
        )),
        other => Ok(format!("{problem_id} --> {other}")),
    }
}
