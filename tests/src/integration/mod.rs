//! Cross-crate integration flows.

pub mod diagnostics;
pub mod flows;
