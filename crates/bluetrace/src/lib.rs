// Domain-driven module structure for bluetrace.

// Core
pub mod parser;
pub mod trace;

// Surfaces
pub mod emit;
pub mod filter;
pub mod conf;
pub mod runtime;
