mod bootstrap;
mod loop_runner;
mod scenario;

pub(crate) use bootstrap::build_probe;
pub(crate) use loop_runner::run;
