// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stampwerk-document — Document handling for the Stampwerk engine.
//
// Provides PDF inspection (page count, page size), the export compositor that
// embeds stamp images into PDF pages, word-processor to PDF conversion via
// external office tools, and page rasterization for previews.

pub mod convert;
pub mod pdf;
pub mod raster;

// Re-export the primary types so callers can use `stampwerk_document::PdfSource` etc.
pub use convert::{ConversionChain, DocumentConverter, PreparedDocument, SourceKind};
pub use pdf::reader::PdfSource;
pub use pdf::stamper::{ExportSettings, ExportStamp, PdfStamper};
pub use raster::{BlankPageRasterizer, PageRasterizer, PdftoppmRasterizer, default_rasterizer};
