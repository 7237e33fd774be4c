//! Legal-profile registry and jurisdiction risk engine.
//!
//! [`ProfileRegistry`] resolves per-country legal metadata (built-in defaults
//! for KR/US/DE/JP, lazy generic fallback for everything else) and
//! [`RiskEngine`] turns a set of scored clauses into a 1–10 contract risk
//! rating with jurisdiction-specific compliance issues.

pub mod engine;
pub mod profiles;

pub use engine::RiskEngine;
pub use profiles::ProfileRegistry;
