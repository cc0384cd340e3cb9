//! Per-request markdown rendering: route a path to a content source, run the
//! plugin chain and compose the result into templates and layouts.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
