use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::assets;
use crate::config::Settings;
use crate::db;
use crate::error::ImportError;
use crate::parser::{self, ParsedPage};

pub struct Imported {
    pub slug: String,
    pub blocks: usize,
    pub fields: usize,
    pub assets: assets::Published,
}

pub struct Failed {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Default)]
pub struct ImportReport {
    pub imported: Vec<Imported>,
    pub failed: Vec<Failed>,
}

impl ImportReport {
    pub fn print(&self) {
        for page in &self.imported {
            println!(
                "  /{} - {} blocks, {} fields{}",
                page.slug,
                page.blocks,
                page.fields,
                if page.assets.files > 0 || page.assets.stylesheet {
                    format!(", {} assets", page.assets.files + page.assets.stylesheet as usize)
                } else {
                    String::new()
                }
            );
        }
        for f in &self.failed {
            println!("  FAILED {}: {}", f.path.display(), f.error);
        }
        println!("Imported {} pages ({} failed).", self.imported.len(), self.failed.len());
    }
}

/// Every `*.html` file directly inside `dir`, sorted by name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read import directory {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")))
        .collect();
    files.sort();
    Ok(files)
}

pub fn slug_for(path: &Path) -> Result<String, ImportError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ImportError::InvalidFileName(path.to_path_buf()))
}

fn parse_file(path: &Path, editable_attr: &str) -> Result<ParsedPage, ImportError> {
    let slug = slug_for(path)?;
    let raw = fs::read_to_string(path)?;
    parser::process_document(&raw, &slug, editable_attr)
}

/// Parse every document in parallel, then publish assets and store pages one
/// by one. A failing file is reported and the rest carry on.
pub fn run(conn: &Connection, settings: &Settings) -> Result<ImportReport> {
    let files = list_documents(&settings.import_dir)?;
    let mut report = ImportReport::default();
    if files.is_empty() {
        return Ok(report);
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let parsed: Vec<_> = files
        .par_iter()
        .map(|path| {
            let result = parse_file(path, &settings.editable_attribute);
            pb.inc(1);
            (path, result)
        })
        .collect();
    pb.finish_and_clear();

    for (path, result) in parsed {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                report.failed.push(Failed {
                    path: path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let published = assets::publish(&settings.import_dir, &settings.public_dir, &page.slug);
        if let Err(e) = db::save_import(conn, &page) {
            warn!("Failed to store {}: {:#}", page.slug, e);
            report.failed.push(Failed {
                path: path.clone(),
                error: format!("{:#}", e),
            });
            continue;
        }

        info!("Imported /{} ({} blocks)", page.slug, page.blocks.len());
        report.imported.push(Imported {
            blocks: page.blocks.len(),
            fields: page.blocks.iter().map(|b| b.fields.len()).sum(),
            slug: page.slug,
            assets: published,
        });
    }

    Ok(report)
}

// ── Tests ──
