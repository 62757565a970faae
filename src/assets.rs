use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::render::rewrite_css_urls;

pub const STYLESHEET: &str = "styles.css";
pub const ASSETS_DIR: &str = "assets";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Published {
    pub stylesheet: bool,
    pub files: usize,
}

/// Publish the stylesheet and asset folder sitting beside an imported page.
/// Missing sources are skipped and copy failures are only logged.
pub fn publish(import_dir: &Path, public_dir: &Path, slug: &str) -> Published {
    let mut out = Published::default();

    let css = import_dir.join(STYLESHEET);
    if css.is_file() {
        let dest = public_dir.join("css").join(format!("{}.css", slug));
        match publish_stylesheet(&css, &dest, slug) {
            Ok(()) => out.stylesheet = true,
            Err(e) => warn!(page = %slug, "Stylesheet not published: {:#}", e),
        }
    }

    let assets = import_dir.join(ASSETS_DIR);
    if assets.is_dir() {
        let dest = public_dir.join(ASSETS_DIR).join(slug);
        match copy_dir(&assets, &dest) {
            Ok(n) => out.files = n,
            Err(e) => warn!(page = %slug, "Assets not published: {:#}", e),
        }
    }

    debug!(page = %slug, stylesheet = out.stylesheet, files = out.files, "published assets");
    out
}

fn publish_stylesheet(src: &Path, dest: &Path, slug: &str) -> Result<()> {
    let css = fs::read_to_string(src).with_context(|| format!("Failed to read {}", src.display()))?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(dest, rewrite_css_urls(&css, slug)).with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}

/// Recursive copy; returns the number of files written.
fn copy_dir(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut copied = 0;
    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).with_context(|| format!("Failed to copy {}", from.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ── Tests ──
