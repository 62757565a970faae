use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::error::EditError;
use crate::model::{Block, Field, Page};
use crate::parser::ParsedPage;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id           INTEGER PRIMARY KEY,
            slug         TEXT UNIQUE NOT NULL,
            title        TEXT NOT NULL,
            head_content TEXT NOT NULL DEFAULT '',
            published    BOOLEAN NOT NULL DEFAULT 1,
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at   TEXT
        );

        CREATE TABLE IF NOT EXISTS blocks (
            id            INTEGER PRIMARY KEY,
            page_id       INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
            block_type    TEXT NOT NULL,
            sort_order    INTEGER NOT NULL,
            draggable     BOOLEAN NOT NULL DEFAULT 0,
            html_template TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_blocks_page ON blocks(page_id, sort_order);

        CREATE TABLE IF NOT EXISTS block_fields (
            id           INTEGER PRIMARY KEY,
            block_id     INTEGER NOT NULL REFERENCES blocks(id) ON DELETE CASCADE,
            position     INTEGER NOT NULL,
            field_name   TEXT NOT NULL,
            display_name TEXT NOT NULL,
            field_type   TEXT NOT NULL CHECK(field_type IN ('text','textarea','image','link')),
            value        TEXT NOT NULL DEFAULT '',
            UNIQUE(block_id, field_name)
        );
        CREATE INDEX IF NOT EXISTS idx_block_fields_block ON block_fields(block_id);
        ",
    )?;
    Ok(())
}

// ── Import ──

/// Replace everything stored for the page's slug in one transaction.
/// New pages start published; existing pages keep their flag.
pub fn save_import(conn: &Connection, page: &ParsedPage) -> Result<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    let page_id: i64 = tx.query_row(
        "INSERT INTO pages (slug, title, head_content, published)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(slug) DO UPDATE SET
             title = excluded.title,
             head_content = excluded.head_content,
             updated_at = ?4
         RETURNING id",
        rusqlite::params![page.slug, page.title, page.head_content, now],
        |r| r.get(0),
    )?;

    tx.execute(
        "DELETE FROM block_fields WHERE block_id IN (SELECT id FROM blocks WHERE page_id = ?1)",
        [page_id],
    )?;
    tx.execute("DELETE FROM blocks WHERE page_id = ?1", [page_id])?;

    {
        let mut block_stmt = tx.prepare(
            "INSERT INTO blocks (page_id, block_type, sort_order, draggable, html_template)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut field_stmt = tx.prepare(
            "INSERT INTO block_fields (block_id, position, field_name, display_name, field_type, value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (i, b) in page.blocks.iter().enumerate() {
            block_stmt.execute(rusqlite::params![
                page_id, b.block_type, i as u32 + 1, b.draggable, b.html_template,
            ])?;
            let block_id = tx.last_insert_rowid();
            for (j, f) in b.fields.iter().enumerate() {
                field_stmt.execute(rusqlite::params![
                    block_id, j as u32, f.field_name, f.display_name, f.field_type.as_str(), f.value,
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(page_id)
}

// ── Pages ──

pub fn fetch_page(conn: &Connection, slug: &str) -> Result<Option<Page>> {
    let row = conn
        .query_row(
            "SELECT id, slug, title, head_content, published FROM pages WHERE slug = ?1",
            [slug],
            |r| {
                Ok(Page {
                    id: r.get(0)?,
                    slug: r.get(1)?,
                    title: r.get(2)?,
                    head_content: r.get(3)?,
                    published: r.get(4)?,
                    blocks: Vec::new(),
                })
            },
        )
        .optional()?;
    let Some(mut page) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, block_type, sort_order, draggable, html_template
         FROM blocks WHERE page_id = ?1 ORDER BY sort_order, id",
    )?;
    let mut blocks = stmt
        .query_map([page.id], |r| {
            Ok(Block {
                id: r.get(0)?,
                block_type: r.get(1)?,
                order: r.get(2)?,
                draggable: r.get(3)?,
                html_template: r.get(4)?,
                fields: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut field_stmt = conn.prepare(
        "SELECT field_name, display_name, field_type, value
         FROM block_fields WHERE block_id = ?1 ORDER BY position, id",
    )?;
    for block in &mut blocks {
        block.fields = field_stmt
            .query_map([block.id], |r| {
                let field_type: String = r.get(2)?;
                Ok(Field {
                    field_name: r.get(0)?,
                    display_name: r.get(1)?,
                    field_type: field_type.parse().map_err(|e: String| {
                        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
                    })?,
                    value: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
    }

    page.blocks = blocks;
    Ok(Some(page))
}

pub struct PageSummary {
    pub slug: String,
    pub title: String,
    pub published: bool,
    pub blocks: usize,
}

pub fn list_pages(conn: &Connection) -> Result<Vec<PageSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.slug, p.title, p.published, COUNT(b.id)
         FROM pages p
         LEFT JOIN blocks b ON b.page_id = p.id
         GROUP BY p.id
         ORDER BY p.slug",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PageSummary {
                slug: row.get(0)?,
                title: row.get(1)?,
                published: row.get(2)?,
                blocks: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns false when no page has that slug.
pub fn set_published(conn: &Connection, slug: &str, published: bool) -> Result<bool> {
    let now = chrono::Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE pages SET published = ?1, updated_at = ?2 WHERE slug = ?3",
        rusqlite::params![published, now, slug],
    )?;
    Ok(changed > 0)
}

// ── Editing ──

/// Persist block orders and field values/display names of an edited page.
/// The first failing row rolls back the whole batch as `EditError::Storage`.
pub fn save_page_edit(conn: &Connection, page: &Page) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut block_stmt =
            tx.prepare("UPDATE blocks SET sort_order = ?1 WHERE id = ?2 AND page_id = ?3")?;
        let mut field_stmt = tx.prepare(
            "UPDATE block_fields SET value = ?1, display_name = ?2
             WHERE block_id = ?3 AND field_name = ?4",
        )?;
        for b in &page.blocks {
            let storage = |source: rusqlite::Error| EditError::Storage { block_id: b.id, source };
            let updated = block_stmt
                .execute(rusqlite::params![b.order, b.id, page.id])
                .map_err(storage)?;
            if updated == 0 {
                return Err(EditError::UnknownBlock(b.id).into());
            }
            for f in &b.fields {
                field_stmt
                    .execute(rusqlite::params![f.value, f.display_name, b.id, f.field_name])
                    .map_err(storage)?;
            }
        }
    }
    tx.execute(
        "UPDATE pages SET updated_at = ?1 WHERE id = ?2",
        rusqlite::params![chrono::Utc::now().to_rfc3339(), page.id],
    )?;
    tx.commit()?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub pages: usize,
    pub published: usize,
    pub blocks: usize,
    pub draggable: usize,
    pub fields: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let pages: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let published: usize =
        conn.query_row("SELECT COUNT(*) FROM pages WHERE published = 1", [], |r| r.get(0))?;
    let blocks: usize = conn.query_row("SELECT COUNT(*) FROM blocks", [], |r| r.get(0))?;
    let draggable: usize =
        conn.query_row("SELECT COUNT(*) FROM blocks WHERE draggable = 1", [], |r| r.get(0))?;
    let fields: usize = conn.query_row("SELECT COUNT(*) FROM block_fields", [], |r| r.get(0))?;
    Ok(Stats {
        pages,
        published,
        blocks,
        draggable,
        fields,
    })
}

// ── Tests ──
