// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source-document preparation.
//
// PDFs are used as they are. Word-processor files are converted to PDF by an
// external office suite, trying each converter of the chain in order. The
// converted file lives in a private temporary directory owned by the
// returned `PreparedDocument`, so it is removed when the document is
// replaced, when conversion fails, and when the program exits normally.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use stampwerk_core::error::{Result, StampError};

/// Prefix of the temporary directories holding converted documents.
pub const TEMP_DIR_PREFIX: &str = "stamp_preview_";

/// How a source file has to be handled before it can be stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    WordProcessor,
}

impl SourceKind {
    /// Detect the kind from a file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" | "docx" | "odt" | "rtf" => Some(Self::WordProcessor),
            _ => None,
        }
    }
}

/// A converter from a word-processor file to PDF.
pub trait DocumentConverter {
    /// Short name for logs and error messages.
    fn name(&self) -> &str;

    /// Convert `source` into a PDF inside `out_dir` and return its path.
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// LibreOffice in headless mode.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    program: String,
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self {
            program: "soffice".into(),
        }
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn name(&self) -> &str {
        "libreoffice"
    }

    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        let mut command = Command::new(&self.program);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(source);
        run(&mut command, self.name())?;
        expect_output(&out_dir.join(pdf_name(source)), self.name())
    }
}

/// The `unoconv` wrapper around a LibreOffice listener.
#[derive(Debug, Clone)]
pub struct UnoconvConverter {
    program: String,
}

impl Default for UnoconvConverter {
    fn default() -> Self {
        Self {
            program: "unoconv".into(),
        }
    }
}

impl DocumentConverter for UnoconvConverter {
    fn name(&self) -> &str {
        "unoconv"
    }

    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        let output = out_dir.join(pdf_name(source));
        let mut command = Command::new(&self.program);
        command.arg("-f").arg("pdf").arg("-o").arg(&output).arg(source);
        run(&mut command, self.name())?;
        expect_output(&output, self.name())
    }
}

fn pdf_name(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "document".into());
    PathBuf::from(stem).with_extension("pdf")
}

fn run(command: &mut Command, name: &str) -> Result<()> {
    debug!(converter = name, ?command, "Running converter");
    let output = command
        .output()
        .map_err(|err| StampError::Conversion(format!("{name}: {err}")))?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(StampError::Conversion(format!(
        "{name} exited with {}: {}",
        output.status,
        stderr.trim()
    )))
}

fn expect_output(path: &Path, name: &str) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(StampError::Conversion(format!(
            "{name} produced no output at {}",
            path.display()
        )))
    }
}

/// A source ready for stamping: always a PDF path.
#[derive(Debug)]
pub struct PreparedDocument {
    source: PathBuf,
    pdf: PathBuf,
    /// Holds converted output; removed on drop.
    temp: Option<TempDir>,
}

impl PreparedDocument {
    /// The file the user chose.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The PDF to read pages from.
    pub fn pdf(&self) -> &Path {
        &self.pdf
    }

    pub fn was_converted(&self) -> bool {
        self.temp.is_some()
    }

    /// Remove converted output now rather than on drop.
    pub fn cleanup(self) -> Result<()> {
        if let Some(temp) = self.temp {
            temp.close()?;
        }
        Ok(())
    }
}

/// Ordered list of converters tried until one succeeds.
pub struct ConversionChain {
    converters: Vec<Box<dyn DocumentConverter>>,
}

impl Default for ConversionChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(LibreOfficeConverter::default()),
            Box::new(UnoconvConverter::default()),
        ])
    }
}

impl ConversionChain {
    pub fn new(converters: Vec<Box<dyn DocumentConverter>>) -> Self {
        Self { converters }
    }

    /// Make `source` ready for stamping, converting it if necessary.
    #[instrument(skip(self), fields(path = %source.display()))]
    pub fn prepare(&self, source: &Path) -> Result<PreparedDocument> {
        if !source.is_file() {
            return Err(StampError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", source.display()),
            )));
        }
        match SourceKind::detect(source) {
            Some(SourceKind::Pdf) => Ok(PreparedDocument {
                source: source.to_path_buf(),
                pdf: source.to_path_buf(),
                temp: None,
            }),
            Some(SourceKind::WordProcessor) => self.convert(source),
            None => Err(StampError::Conversion(format!(
                "unsupported file type: {}",
                source.display()
            ))),
        }
    }

    fn convert(&self, source: &Path) -> Result<PreparedDocument> {
        let temp = tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?;
        let mut failures = Vec::new();

        for converter in &self.converters {
            match converter.convert(source, temp.path()) {
                Ok(pdf) => {
                    info!(converter = converter.name(), "Document converted to PDF");
                    return Ok(PreparedDocument {
                        source: source.to_path_buf(),
                        pdf,
                        temp: Some(temp),
                    });
                }
                Err(err) => {
                    warn!(converter = converter.name(), %err, "Converter failed, trying next");
                    failures.push(err.to_string());
                }
            }
        }
        // `temp` drops here, removing anything a failed converter left behind.
        Err(StampError::Conversion(if failures.is_empty() {
            "no converter configured".into()
        } else {
            failures.join("; ")
        }))
    }
}
