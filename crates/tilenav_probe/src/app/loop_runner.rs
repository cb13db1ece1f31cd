use std::process::ExitCode;

use tracing::{error, info};

use super::bootstrap::ProbeWiring;
use super::scenario::{churn_scenario, replay};

pub(crate) fn run(mut wiring: ProbeWiring) -> ExitCode {
    let steps = churn_scenario(wiring.grid.config().chunk_size);
    let reports = match replay(&mut wiring.grid, &steps) {
        Ok(reports) => reports,
        Err(err) => {
            error!(error = %err, "scenario_failed");
            return ExitCode::FAILURE;
        }
    };

    let dirtying_steps = reports
        .iter()
        .filter(|report| !report.dirty_chunks.is_empty())
        .count();
    info!(
        steps = reports.len(),
        dirtying_steps,
        chunks = wiring.grid.chunk_count(),
        tracked_entities = wiring.grid.tracked_entity_count(),
        "scenario_complete"
    );

    ExitCode::SUCCESS
}
