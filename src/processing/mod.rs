//! Simulation pipeline: per-sample rendering and batch dispatch

pub mod common;
pub mod dispatcher;
pub mod report;
pub mod sample;

pub use dispatcher::BatchDispatcher;
pub use report::{BatchReport, SampleFailure};
pub use sample::{check_entry, RenderedSample, SampleOutcome, SampleSimulator, SimulationOptions, Stage};
