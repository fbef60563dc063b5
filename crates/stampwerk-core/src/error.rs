// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Stampwerk.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Stampwerk operations.
#[derive(Debug, Error)]
pub enum StampError {
    // -- Assets --
    #[error("stamp template not found: {}", path.display())]
    AssetNotFound { path: PathBuf },

    // -- Imaging --
    #[error("image processing failed: {0}")]
    Image(String),

    // -- Documents --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("no document loaded")]
    NoDocument,

    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StampError>;
