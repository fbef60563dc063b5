// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stampwerk — Core types and error definitions shared across all crates.

pub mod config;
pub mod content;
pub mod date;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::StampConfig;
pub use content::{RegistrationContent, ResolutionContent, StampForm};
pub use error::StampError;
pub use types::*;
