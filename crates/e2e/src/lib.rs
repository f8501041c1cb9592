//! Earth REST API E2E Test Framework
//!
//! This crate exercises a running Earth REST API (continents, countries,
//! cities) end to end:
//! - Sends requests through a thin JSON client
//! - Asserts that responses echo submitted data with a structural matcher
//! - Chains dependent entities through live fixtures
//! - Tracks throwaway entities and deletes them concurrently
//! - Parses declarative YAML test specs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    └── run_spec(spec: TestSpec) -> TestResult               │
//! │          └── TestContext (one per run)                      │
//! │                ├── ApiClient        GET/POST/PUT/DELETE     │
//! │                ├── FixtureCatalog   current entity per kind │
//! │                └── LifecycleTracker groups pending delete   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  matcher: deep_match / match_array / match_array_property   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, description, tags, fixtures                    │
//! │    └── steps: [Step]                                        │
//! │          ├── ping                                           │
//! │          ├── create { kind }                                │
//! │          ├── update { kind, patch }                         │
//! │          ├── create_for_delete { kind, patch, group }       │
//! │          ├── delete_group { group }                         │
//! │          ├── list { kind, expect_count? }                   │
//! │          └── refresh { kinds }                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod matcher;
pub mod runner;
pub mod spec;
pub mod tracker;

pub use client::{ApiClient, ApiResponse};
pub use config::HarnessConfig;
pub use context::TestContext;
pub use error::{ApiError, E2eError, E2eResult};
pub use fixtures::FixtureCatalog;
pub use matcher::{deep_match, match_array, match_array_property, MatchError};
pub use runner::TestRunner;
pub use spec::{TestSpec, TestStep};
pub use tracker::LifecycleTracker;
