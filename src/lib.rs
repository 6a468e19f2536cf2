// src/lib.rs

//! Email-authentication DNS posture engine.
//!
//! Given a domain, the engine resolves its MX, SPF, DKIM and DMARC records,
//! parses them into typed structures, detects misconfigurations and returns
//! a scored, graded [`DomainAnalysisReport`]. The engine holds no state
//! across calls; persistence, rate limiting and the HTTP surface are the
//! caller's business.

pub mod core;
pub mod logging;

pub use crate::core::analyzer::{AnalysisError, analyze, analyze_with_config};
pub use crate::core::config::AnalyzerConfig;
pub use crate::core::models::{ComponentResult, DomainAnalysisReport, Grade};
