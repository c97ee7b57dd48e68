//! Request-level business rules shared by several handler modules.

pub mod accounts;
pub mod enrichment;
pub mod jobs;
pub mod ownership;
