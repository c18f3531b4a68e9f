pub mod import;
pub mod process;
pub mod runner;
pub mod setup;
pub mod telemetry;

pub use import::ImportEngine;
pub use process::ProcessEngine;
