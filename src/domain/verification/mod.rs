//! Verification domain
//!
//! A verification report is the structured judgment of whether a draft answer
//! is supported by, and relevant to, the passages it was written from.

mod report;

pub use report::{Verdict, VerificationReport};
