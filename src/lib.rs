// cmewatch: Coronal mass ejection detection from solar telemetry
//
// This is the library root. Each module corresponds to a stage of the
// detection pipeline or one of the surfaces wrapped around it.

pub mod config;
pub mod detection;
pub mod feeds;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod telemetry;

#[cfg(feature = "web")]
pub mod web;
