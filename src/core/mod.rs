// src/core/mod.rs

// This file acts as the root of the `core` module, exposing the engine's
// sub-modules to the crate.

/// Analyzer configuration: selector probe list, timeouts and fan-out limits.
pub mod config;

/// Contains all data structures of the engine, such as `DomainAnalysisReport`,
/// `ComponentResult` and the typed SPF/DKIM/DMARC record models.
pub mod models;

/// The resolver adapter wrapping MX/TXT lookups with timeouts, a bounded
/// retry and a closed error taxonomy.
pub mod resolver;

/// Houses the per-record analyzers (MX, SPF, DKIM, DMARC) and the report
/// aggregator that fans them out concurrently.
pub mod analyzer;

/// Point maxima, deduction tables, the grade ladder and the security summary.
pub mod scoring;

/// Contains the static database of all possible findings, complete with
/// human-readable issue summaries and remediation steps.
pub mod knowledge_base;
