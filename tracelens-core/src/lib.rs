// tracelens-core: similar-error retrieval and grounded analysis for stack traces.

pub mod analysis;
pub mod config;
pub mod embedding;
pub mod memory;
pub mod provider;
pub mod retrieval;
pub mod state;

// Test utilities - always available for use by tracelens-server and tests
pub mod testutil;
