// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stampwerk — registration and resolution stamps for PDF and Word documents
//
// Entry point. Initialises logging, loads settings, applies command-line
// overrides, and runs one editor command.

mod editor;
mod services;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use stampwerk_core::error::Result;
use stampwerk_core::human_errors::humanize_error;
use stampwerk_core::types::{Rotation, StampKind};
use stampwerk_core::{StampConfig, StampError, StampForm};
use stampwerk_document::{
    BlankPageRasterizer, ConversionChain, PageRasterizer, default_rasterizer,
};
use stampwerk_layout::DragOutcome;
use stampwerk_render::{ImageProcessor, StampBuilder};
use tracing::{info, warn};

use editor::StampEditor;
use services::config_store::load_config;

#[derive(Parser, Debug)]
#[command(name = "stampwerk", version, about = "Place registration and resolution stamps on documents.")]
struct Cli {
    /// Settings file (JSON). Defaults to the per-user data directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the current stamp and write it as PNG.
    Stamp {
        #[command(flatten)]
        stamp: StampArgs,
        #[arg(short, long, default_value = "stamp-preview.png")]
        output: PathBuf,
    },
    /// Render a page with its stamps and write it as PNG.
    Preview {
        input: PathBuf,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        stamp: StampArgs,
        #[arg(short, long, default_value = "page-preview.png")]
        output: PathBuf,
    },
    /// Write a stamped copy of a document.
    Export {
        input: PathBuf,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        stamp: StampArgs,
        /// Output PDF. Defaults to `<document number>.pdf` beside the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective settings as JSON.
    Config {
        #[command(flatten)]
        stamp: StampArgs,
    },
}

/// Preview surface controls.
#[derive(Args, Debug)]
struct PageArgs {
    /// Page to preview, starting at 1.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
    /// Preview zoom in percent.
    #[arg(long)]
    zoom: Option<u32>,
    /// Drag the stamp under x0,y0 to x1,y1 (preview pixels). Turns on free positioning.
    #[arg(long, value_parser = parse_drag, allow_hyphen_values = true)]
    drag: Option<Drag>,
}

/// Field values and placement controls. Each one overrides the settings file.
#[derive(Args, Debug)]
struct StampArgs {
    /// Stamp kind used when dual stamping is off.
    #[arg(long, value_parser = parse_kind)]
    kind: Option<StampKind>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    dual_stamp: Option<bool>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    free_position: Option<bool>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    first_page_only: Option<bool>,
    /// Stamp width as a fraction of page width.
    #[arg(long)]
    width_ratio: Option<f64>,
    #[arg(long)]
    right_margin_mm: Option<f64>,
    #[arg(long)]
    bottom_margin_mm: Option<f64>,
    /// Clockwise rotation: 0, 90, 180 or 270.
    #[arg(long, value_parser = parse_rotation)]
    rotation: Option<Rotation>,
    /// Registration template image.
    #[arg(long)]
    template: Option<PathBuf>,

    // Registration fields
    #[arg(long)]
    sheets: Option<String>,
    #[arg(long)]
    doc_no: Option<String>,
    /// Fill day, month and year from a date (YYYY-MM-DD or DD.MM.YYYY).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    #[arg(long)]
    day: Option<String>,
    #[arg(long)]
    month: Option<String>,
    #[arg(long)]
    year: Option<String>,

    // Resolution fields
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    commander: Option<String>,
    #[arg(long)]
    rank: Option<String>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    in_order: Option<bool>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    refuse: Option<bool>,
    /// Resolution font size in points.
    #[arg(long)]
    font_pt: Option<f32>,
    /// Extra pixels between the resolution body lines.
    #[arg(long, allow_hyphen_values = true)]
    line_delta: Option<f32>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    thin_stroke: Option<bool>,
}

impl StampArgs {
    fn apply_config(&self, config: &mut StampConfig) {
        set(&mut config.kind, self.kind);
        set(&mut config.dual_stamp, self.dual_stamp);
        set(&mut config.free_position, self.free_position);
        set(&mut config.first_page_only, self.first_page_only);
        set(&mut config.width_ratio, self.width_ratio);
        set(&mut config.right_margin_mm, self.right_margin_mm);
        set(&mut config.bottom_margin_mm, self.bottom_margin_mm);
        set(&mut config.rotation, self.rotation);
        set(&mut config.template_path, self.template.clone());
    }

    fn apply_form(&self, form: &mut StampForm) {
        let reg = &mut form.registration;
        if let Some(date) = self.date {
            reg.set_date(date);
        }
        set(&mut reg.sheet_count, self.sheets.clone());
        set(&mut reg.document_number, self.doc_no.clone());
        set(&mut reg.day, self.day.clone());
        set(&mut reg.month, self.month.clone());
        set(&mut reg.year_tail, self.year.clone());

        let res = &mut form.resolution;
        set(&mut res.title_line, self.title.clone());
        set(&mut res.commander_line, self.commander.clone());
        set(&mut res.rank_line, self.rank.clone());
        set(&mut res.in_order, self.in_order);
        set(&mut res.refuse, self.refuse);
        set(&mut res.font_point_size, self.font_pt);
        set(&mut res.line_spacing_adjust_px, self.line_delta);
        set(&mut res.thin_stroke, self.thin_stroke);
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// A simulated pointer drag on the preview surface.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    from: (f64, f64),
    to: (f64, f64),
}

fn parse_drag(s: &str) -> std::result::Result<Drag, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|err| format!("invalid drag coordinate in '{s}': {err}"))?;
    match values.as_slice() {
        [x0, y0, x1, y1] => Ok(Drag {
            from: (*x0, *y0),
            to: (*x1, *y1),
        }),
        _ => Err(format!("expected x0,y0,x1,y1, got '{s}'")),
    }
}

fn parse_kind(s: &str) -> std::result::Result<StampKind, String> {
    match s.to_lowercase().as_str() {
        "registration" | "reg" => Ok(StampKind::Registration),
        "resolution" | "res" => Ok(StampKind::Resolution),
        _ => Err(format!("unknown stamp kind '{s}' (registration or resolution)")),
    }
}

fn parse_rotation(s: &str) -> std::result::Result<Rotation, String> {
    s.trim()
        .parse::<u16>()
        .ok()
        .filter(|degrees| *degrees < 360)
        .and_then(|degrees| Rotation::from_degrees(i32::from(degrees)))
        .ok_or_else(|| format!("rotation must be 0, 90, 180 or 270 (got '{s}')"))
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
        .map_err(|_| format!("invalid date '{s}' (YYYY-MM-DD or DD.MM.YYYY)"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            eprintln!("{}", humanize_error(&err).to_text());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Stamp { stamp, output } => {
            let editor = open_editor(&mut config, &stamp, None, Box::new(BlankPageRasterizer))?;
            editor.current_stamp()?.save_png(&output)?;
            println!("{}", output.display());
        }
        Command::Preview {
            input,
            page,
            stamp,
            output,
        } => {
            let mut editor = open_editor(&mut config, &stamp, Some(&page), default_rasterizer())?;
            open_page(&mut editor, &input, &page)?;
            let preview = editor
                .page_preview()
                .ok_or(StampError::NoDocument)?;
            for error in &preview.errors {
                warn!("{}", error.to_text());
            }
            ImageProcessor::from_rgba(preview.image.clone()).save_png(&output)?;
            report_slots(&editor);
            println!("{}", output.display());
        }
        Command::Export {
            input,
            page,
            stamp,
            output,
        } => {
            let mut editor = open_editor(&mut config, &stamp, Some(&page), default_rasterizer())?;
            open_page(&mut editor, &input, &page)?;
            let target = match output {
                Some(path) => path,
                None => editor
                    .suggested_output()
                    .ok_or(StampError::NoDocument)?,
            };
            editor.export(&target)?;
            info!(target = %target.display(), "Stamped document written");
            println!("{}", target.display());
        }
        Command::Config { stamp } => {
            stamp.apply_config(&mut config);
            println!("{}", serde_json::to_string_pretty(&config.normalized())?);
        }
    }
    Ok(())
}

fn open_editor(
    config: &mut StampConfig,
    stamp: &StampArgs,
    page: Option<&PageArgs>,
    rasterizer: Box<dyn PageRasterizer>,
) -> Result<StampEditor> {
    stamp.apply_config(config);
    if let Some(page) = page {
        set(&mut config.zoom_percent, page.zoom);
        if page.drag.is_some() {
            config.free_position = true;
        }
    }
    let mut editor = StampEditor::new(
        config.clone(),
        StampBuilder::from_config(config),
        rasterizer,
        ConversionChain::default(),
    );
    editor.edit_form(|form| stamp.apply_form(form))?;
    Ok(editor)
}

fn open_page(editor: &mut StampEditor, input: &std::path::Path, page: &PageArgs) -> Result<()> {
    editor.load_document(input)?;
    editor.set_page(page.page as usize - 1)?;
    if let Some(drag) = page.drag {
        simulate_drag(editor, drag)?;
    }
    Ok(())
}

fn simulate_drag(editor: &mut StampEditor, drag: Drag) -> Result<()> {
    let (x0, y0) = drag.from;
    match editor.pointer_down(x0, y0) {
        DragOutcome::Grabbed { slot } => {
            let (x1, y1) = drag.to;
            if let DragOutcome::Moved { position, .. } = editor.pointer_move(x1, y1)? {
                info!(slot, x_pct = position.x_pct, y_pct = position.y_pct, "Stamp moved");
            }
            editor.pointer_up();
        }
        _ => warn!(x = x0, y = y0, "Drag start is not on a stamp; nothing moved"),
    }
    Ok(())
}

fn report_slots(editor: &StampEditor) {
    let Some(session) = editor.session() else {
        return;
    };
    info!(
        page = session.page_index() + 1,
        pages = session.page_count(),
        zoom = editor.config().zoom_percent,
        "Preview rendered"
    );
    for slot in session.slots() {
        if let Some(rect) = slot.last_rendered_rect {
            info!(
                kind = %slot.kind,
                x = rect.x,
                y = rect.y,
                w = rect.width,
                h = rect.height,
                "Stamp placed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_argument_parses_four_numbers() {
        assert_eq!(
            parse_drag("10, 20,30.5,-4").unwrap(),
            Drag {
                from: (10.0, 20.0),
                to: (30.5, -4.0)
            }
        );
        assert!(parse_drag("1,2,3").is_err());
        assert!(parse_drag("a,b,c,d").is_err());
    }

    #[test]
    fn rotation_argument_accepts_quarter_turns_only() {
        assert_eq!(parse_rotation("270").unwrap(), Rotation::Deg270);
        assert!(parse_rotation("45").is_err());
        assert!(parse_rotation("360").is_err());
    }

    #[test]
    fn date_argument_accepts_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("2024-03-05").unwrap(), expected);
        assert_eq!(parse_date("05.03.2024").unwrap(), expected);
        assert!(parse_date("March 5").is_err());
    }

    #[test]
    fn flags_override_settings_and_fields() {
        let cli = Cli::try_parse_from([
            "stampwerk",
            "stamp",
            "--kind",
            "resolution",
            "--dual-stamp",
            "--rotation",
            "90",
            "--date",
            "2024-03-05",
            "--doc-no",
            "INV-42",
            "--line-delta",
            "-12",
            "--thin-stroke=false",
        ])
        .unwrap();
        let Command::Stamp { stamp, .. } = cli.command else {
            panic!("expected the stamp command");
        };

        let mut config = StampConfig::default();
        stamp.apply_config(&mut config);
        assert_eq!(config.kind, StampKind::Resolution);
        assert!(config.dual_stamp);
        assert!(!config.free_position);
        assert_eq!(config.rotation, Rotation::Deg90);

        let mut form = StampForm::default();
        stamp.apply_form(&mut form);
        assert_eq!(form.registration.day, "05");
        assert_eq!(form.registration.year_tail, "24");
        assert_eq!(form.registration.document_number, "INV-42");
        assert_eq!(form.resolution.line_spacing_adjust_px, -12.0);
        assert!(!form.resolution.thin_stroke);
    }

    #[test]
    fn preview_page_starts_at_one() {
        assert!(Cli::try_parse_from(["stampwerk", "preview", "in.pdf", "--page", "0"]).is_err());
        let cli = Cli::try_parse_from([
            "stampwerk", "preview", "in.pdf", "--page", "2", "--drag", "1,2,3,4",
        ])
        .unwrap();
        let Command::Preview { page, .. } = cli.command else {
            panic!("expected the preview command");
        };
        assert_eq!(page.page, 2);
        assert!(page.drag.is_some());
    }
}
