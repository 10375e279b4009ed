//! Runtime module: logging init, config boot and the line loop.

pub mod boot;
pub mod run;
