// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// System font discovery.
//
// Faces are indexed with fontdb and matched by family name, so a font is found
// whatever its file is called. Configured families are tried in order, then the
// generic sans-serif family, then any face with a sans-serif name. A missing
// font never fails a build: the caller gets `None` and skips the text.

use ab_glyph::{FontArc, FontVec};
use fontdb::{Database, Family, ID, Query};
use stampwerk_core::config::app_dir;
use tracing::{debug, info, warn};

/// Environment variable naming an extra font directory searched first.
pub const FONT_DIR_ENV: &str = "STAMPWERK_FONT_DIR";

/// Serif families preferred for resolution text.
const SERIF_PREFERENCES: [&str; 3] = ["Times New Roman", "Liberation Serif", "DejaVu Serif"];

/// Loaded faces used by the stamp builder.
#[derive(Clone, Default)]
pub struct FontBook {
    sans: Option<FontArc>,
    serif: Option<FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("sans", &self.sans.is_some())
            .field("serif", &self.serif.is_some())
            .finish()
    }
}

impl FontBook {
    /// Search the system for the preferred families.
    pub fn discover(preferences: &[String]) -> Self {
        Self::from_database(&font_database(), preferences)
    }

    /// Pick faces for both roles from an already populated database.
    pub fn from_database(db: &Database, preferences: &[String]) -> Self {
        let wanted: Vec<&str> = preferences.iter().map(String::as_str).collect();
        let sans = query_face(db, &wanted, Family::SansSerif)
            .or_else(|| any_sans_face(db))
            .and_then(|id| load_face(db, id));
        let serif = query_face(db, &SERIF_PREFERENCES, Family::Serif).and_then(|id| load_face(db, id));

        if sans.is_none() {
            warn!("No usable sans-serif font found; stamp text will be skipped");
        }
        Self { sans, serif }
    }

    /// A book with no fonts at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Face for registration fields.
    pub fn sans(&self) -> Option<&FontArc> {
        self.sans.as_ref()
    }

    /// Face for resolution text, falling back to the sans face.
    pub fn serif(&self) -> Option<&FontArc> {
        self.serif.as_ref().or(self.sans.as_ref())
    }
}

/// Extra font directories first, then the system fonts.
fn font_database() -> Database {
    let mut db = Database::new();
    if let Ok(dir) = std::env::var(FONT_DIR_ENV) {
        db.load_fonts_dir(dir);
    }
    db.load_fonts_dir(app_dir().join("fonts"));
    db.load_system_fonts();
    debug!(faces = db.len(), "Font database loaded");
    db
}

/// Best regular face among `families`, in order, then `generic`.
fn query_face(db: &Database, families: &[&str], generic: Family<'_>) -> Option<ID> {
    let mut chain: Vec<Family<'_>> = families.iter().map(|name| Family::Name(*name)).collect();
    chain.push(generic);
    db.query(&Query {
        families: &chain,
        ..Query::default()
    })
}

fn any_sans_face(db: &Database) -> Option<ID> {
    let sans_named = db.faces().find(|face| {
        !face.monospaced
            && face
                .families
                .iter()
                .any(|(name, _)| name.contains("Sans") && !name.contains("Mono"))
    });
    sans_named.or_else(|| db.faces().next()).map(|face| face.id)
}

fn load_face(db: &Database, id: ID) -> Option<FontArc> {
    let family = db
        .face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
        .unwrap_or_default();
    let parsed = db.with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index))?;
    match parsed {
        Ok(font) => {
            info!(family = %family, "Font family selected");
            Some(FontArc::new(font))
        }
        Err(err) => {
            debug!(family = %family, %err, "Skipping unreadable font");
            None
        }
    }
}
