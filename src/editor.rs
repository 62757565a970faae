use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EditError;
use crate::model::{Block, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// A batch of edits for one page, as submitted by the block editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEdit {
    pub blocks: Vec<BlockEdit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEdit {
    pub id: i64,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub fields: Vec<FieldEdit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEdit {
    pub field_name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Blocks must be in render order. Only draggable blocks move, and only past
/// another draggable block.
pub fn can_move(blocks: &[Block], index: usize, direction: Direction) -> bool {
    let Some(block) = blocks.get(index) else {
        return false;
    };
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1).and_then(|i| blocks.get(i)),
        Direction::Down => blocks.get(index + 1),
    };
    block.draggable && neighbour.is_some_and(|n| n.draggable)
}

/// Swap a block with its neighbour and renumber the page.
pub fn move_block(blocks: &mut [Block], block_id: i64, direction: Direction) -> Result<(), EditError> {
    normalize_order(blocks);
    let index = blocks
        .iter()
        .position(|b| b.id == block_id)
        .ok_or(EditError::UnknownBlock(block_id))?;

    if !can_move(blocks, index, direction) {
        return Err(EditError::CannotMove {
            block_id,
            direction: direction.as_str(),
        });
    }

    let other = match direction {
        Direction::Up => index - 1,
        Direction::Down => index + 1,
    };
    blocks.swap(index, other);
    renumber(blocks);
    debug!(block = block_id, direction = direction.as_str(), "moved block");
    Ok(())
}

/// Stable sort by `order`, then renumber to 1..N.
pub fn normalize_order(blocks: &mut [Block]) {
    blocks.sort_by_key(|b| b.order);
    renumber(blocks);
}

/// `order` follows slice position.
fn renumber(blocks: &mut [Block]) {
    for (i, block) in blocks.iter_mut().enumerate() {
        block.order = i as u32 + 1;
    }
}

/// Validate and apply a whole batch. Returns the edited page; on any error
/// nothing is applied.
pub fn apply_edit(page: &Page, edit: &PageEdit) -> Result<Page, EditError> {
    let mut page = page.clone();
    normalize_order(&mut page.blocks);
    let n = page.blocks.len();

    let mut new_order: Vec<u32> = page.blocks.iter().map(|b| b.order).collect();

    for be in &edit.blocks {
        let index = page
            .blocks
            .iter()
            .position(|b| b.id == be.id)
            .ok_or(EditError::UnknownBlock(be.id))?;
        let block = &mut page.blocks[index];

        for fe in &be.fields {
            let field = block
                .fields
                .iter_mut()
                .find(|f| f.field_name == fe.field_name)
                .ok_or_else(|| EditError::UnknownField {
                    block_id: be.id,
                    field_name: fe.field_name.clone(),
                })?;
            if let Some(value) = &fe.value {
                field.value = value.clone();
            }
            if let Some(display_name) = &fe.display_name {
                field.display_name = display_name.clone();
            }
        }

        if let Some(order) = be.order {
            new_order[index] = order;
        }
    }

    let mut sorted = new_order.clone();
    sorted.sort_unstable();
    if sorted.iter().enumerate().any(|(i, o)| *o as usize != i + 1) {
        return Err(EditError::InvalidOrder { expected: n });
    }

    let groups = draggable_runs(&page.blocks);
    for (index, order) in new_order.iter().enumerate() {
        let target = *order as usize - 1;
        if groups[target] != groups[index] {
            let block = &page.blocks[index];
            return Err(EditError::FixedBlockMoved {
                block_id: block.id,
                block_type: block.block_type.clone(),
            });
        }
    }

    for (block, order) in page.blocks.iter_mut().zip(new_order) {
        block.order = order;
    }
    page.blocks.sort_by_key(|b| b.order);

    debug!(page = %page.slug, edits = edit.blocks.len(), "edit validated");
    Ok(page)
}

/// Group id per position: consecutive draggable blocks share one, every fixed
/// block gets its own.
fn draggable_runs(blocks: &[Block]) -> Vec<usize> {
    let mut groups = Vec::with_capacity(blocks.len());
    let mut group = 0;
    for (i, block) in blocks.iter().enumerate() {
        let continues = i > 0 && block.draggable && blocks[i - 1].draggable;
        if i > 0 && !continues {
            group += 1;
        }
        groups.push(group);
    }
    groups
}

// ── Tests ──
