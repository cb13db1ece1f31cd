use std::process::ExitCode;

use tracing::error;

mod app;

fn main() -> ExitCode {
    match app::build_probe() {
        Ok(wiring) => app::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
