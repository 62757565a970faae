mod assets;
mod config;
mod db;
mod editor;
mod error;
mod import;
mod model;
mod parser;
mod render;
mod utils;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use config::Settings;
use editor::{Direction, PageEdit};

#[derive(Parser)]
#[command(name = "pageblocks", about = "Import HTML pages as editable blocks and render them back")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Import every *.html file from the import directory
    Import {
        /// Directory to import from (default: import_dir setting)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Render a stored page
    Render {
        slug: String,
        /// Emit a full document instead of the body fragment
        #[arg(short, long)]
        standalone: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List stored pages
    List,
    /// Show the blocks and fields of a page
    Fields {
        slug: String,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a draggable block one step up or down
    Move {
        slug: String,
        block_id: i64,
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Apply a JSON batch of field and order edits
    Apply {
        slug: String,
        /// Edit batch: {"blocks":[{"id":..,"order":..,"fields":[..]}]}
        file: PathBuf,
    },
    /// Mark a page as published (or not)
    Publish {
        slug: String,
        #[arg(long)]
        unpublish: bool,
    },
    /// Show database statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            println!("Schema ready at {}", settings.database.display());
            Ok(())
        }
        Commands::Import { dir } => {
            if let Some(dir) = dir {
                settings.import_dir = dir;
            }
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            println!("Importing from {}...", settings.import_dir.display());
            let report = import::run(&conn, &settings)?;
            if report.imported.is_empty() && report.failed.is_empty() {
                println!("No .html files found.");
            } else {
                report.print();
            }
            Ok(())
        }
        Commands::Render { slug, standalone, out } => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            let page = load_page(&conn, &slug)?;
            let markup = render::render_markup(&page, standalone);
            match out {
                Some(path) => {
                    std::fs::write(&path, &markup)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote /{} to {} ({} bytes)", slug, path.display(), markup.len());
                }
                None => print!("{}", markup),
            }
            Ok(())
        }
        Commands::List => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            let pages = db::list_pages(&conn)?;
            if pages.is_empty() {
                println!("No pages. Run 'import' first.");
            }
            for p in &pages {
                println!(
                    "/{} ({}) - {} blocks{}",
                    p.slug,
                    p.title,
                    p.blocks,
                    if p.published { "" } else { " [unpublished]" }
                );
            }
            Ok(())
        }
        Commands::Fields { slug, json } => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            let page = load_page(&conn, &slug)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_fields(&page);
            }
            Ok(())
        }
        Commands::Move { slug, block_id, direction } => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            let mut page = load_page(&conn, &slug)?;
            editor::move_block(&mut page.blocks, block_id, direction)?;
            db::save_page_edit(&conn, &page)?;
            for b in &page.blocks {
                println!("{:>3}  {}", b.order, b.block_type);
            }
            Ok(())
        }
        Commands::Apply { slug, file } => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            let page = load_page(&conn, &slug)?;
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let edit: PageEdit = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid edit batch in {}", file.display()))?;
            let edited = editor::apply_edit(&page, &edit)?;
            db::save_page_edit(&conn, &edited)?;
            let fields: usize = edit.blocks.iter().map(|b| b.fields.len()).sum();
            println!("Applied {} block edits ({} fields) to /{}", edit.blocks.len(), fields, slug);
            Ok(())
        }
        Commands::Publish { slug, unpublish } => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            if db::set_published(&conn, &slug, !unpublish)? {
                println!("/{} {}", slug, if unpublish { "unpublished" } else { "published" });
                Ok(())
            } else {
                Err(anyhow!("No page with slug '{}'", slug))
            }
        }
        Commands::Stats => {
            let conn = db::connect(&settings.database)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Pages:     {}", s.pages);
            println!("Published: {}", s.published);
            println!("Blocks:    {}", s.blocks);
            println!("Draggable: {}", s.draggable);
            println!("Fields:    {}", s.fields);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_page(conn: &rusqlite::Connection, slug: &str) -> anyhow::Result<model::Page> {
    db::fetch_page(conn, slug)?.ok_or_else(|| anyhow!("No page with slug '{}'. Run 'list' to see pages.", slug))
}

fn print_fields(page: &model::Page) {
    println!("/{} ({})", page.slug, page.title);
    for b in &page.blocks {
        println!(
            "\n#{} {} [id {}]{}",
            b.order,
            b.block_type,
            b.id,
            if b.draggable { " (draggable)" } else { "" }
        );
        for f in &b.fields {
            println!("  {} ({}) [{}]: {:?}", f.field_name, f.display_name, f.field_type, f.value);
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
