// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Errors shown in the stamp preview area or in a blocking dialog are mapped to
// a short sentence plus a suggestion, so the person at the desk knows what to
// fix without reading a stack of library context.

use crate::error::StampError;

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
}

impl HumanError {
    /// Message and suggestion joined for single-block display.
    pub fn to_text(&self) -> String {
        format!("{}\n{}", self.message, self.suggestion)
    }
}

/// Convert a `StampError` into a `HumanError`.
pub fn humanize_error(err: &StampError) -> HumanError {
    match err {
        StampError::AssetNotFound { path } => HumanError {
            message: format!(
                "The stamp template '{}' is missing.",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            ),
            suggestion: "Place the template image next to the program and try again.".into(),
        },
        StampError::Image(detail) => HumanError {
            message: "The stamp image could not be drawn.".into(),
            suggestion: format!("Check the template image file ({detail})."),
        },
        StampError::Pdf(detail) => HumanError {
            message: "The PDF could not be read or written.".into(),
            suggestion: format!("Make sure the file is a valid, unlocked PDF ({detail})."),
        },
        StampError::Conversion(detail) => HumanError {
            message: "The Word document could not be converted to PDF.".into(),
            suggestion: format!(
                "Install LibreOffice, or save the document as PDF first ({detail})."
            ),
        },
        StampError::NoDocument => HumanError {
            message: "No document is open.".into(),
            suggestion: "Choose a PDF or Word file first.".into(),
        },
        StampError::PageOutOfRange { index, count } => HumanError {
            message: format!("Page {} does not exist.", index + 1),
            suggestion: format!("This document has {count} pages."),
        },
        StampError::InvalidConfig(detail) => HumanError {
            message: "The settings file is not valid.".into(),
            suggestion: format!("Fix or delete the settings file ({detail})."),
        },
        StampError::Io(io) => HumanError {
            message: "A file could not be read or saved.".into(),
            suggestion: format!("Check the file location and permissions ({io})."),
        },
        StampError::Serialization(detail) => HumanError {
            message: "The settings file is not valid.".into(),
            suggestion: format!("Fix or delete the settings file ({detail})."),
        },
    }
}
