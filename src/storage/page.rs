// ┌─────────────────────────────────────────────────────────────────────────┐
// │ Offset              │ Length │ Description                              │
// │─────────────────────┼────────┼──────────────────────────────────────────│
// │   0                 │   2    │ NODE_TYPE (1 = internal, 2 = leaf)       │
// │   2                 │   2    │ KEY_COUNT N (u16)                        │
// │─────────────────────┼────────┼──────────────────────────────────────────│
// │   4                 │  8*N   │ POINTERS: child page ids (u64)           │
// │   4 + 8N            │  2*N   │ OFFSETS: slots for ids 1..=N (u16)       │
// │   4 + 10N           │  ...   │ KV pairs                                 │
// └─────────────────────────────────────────────────────────────────────────┘

// ┌───────────────────────────────────────────────────────────────────────┐
// │ Offset (from 4 + 10N + offset(i)) │ Length │ Description              │
// │───────────────────────────────────┼────────┼──────────────────────────│
// │        0                          │   2    │ KEY_LEN (u16)            │
// │        2                          │   2    │ VAL_LEN (u16)            │
// │        4                          │ klen   │ KEY_BYTES                │
// │        4 + klen                   │ vlen   │ VAL_BYTES                │
// └───────────────────────────────────────────────────────────────────────┘
//
// All integers are little-endian.

use crate::error::{DbError, DbResult};

pub const PAGE_SIZE: usize = 4096;

pub const NODE_TYPE_OFFSET: usize = 0;   // 2 bytes (u16)
pub const KEY_COUNT_OFFSET: usize = 2;   // 2 bytes (u16)
pub const HEADER: usize = 4;             // total header length

pub const POINTER_SIZE: usize = 8;
pub const OFFSET_SIZE: usize = 2;
pub const KV_HEADER_SIZE: usize = 4;     // klen + vlen

pub const NODE_INTERNAL: u16 = 1;
pub const NODE_LEAF: u16 = 2;

pub const MAX_KEY_SIZE: usize = 1000;
pub const MAX_VAL_SIZE: usize = 3000;

/// A raw page buffer.
pub type PageBuf = [u8; PAGE_SIZE];

const _: () = {
    assert!(PAGE_SIZE <= u16::MAX as usize + 1, "offsets must fit in a u16");
    assert!(
        HEADER + (POINTER_SIZE + OFFSET_SIZE) + KV_HEADER_SIZE + MAX_KEY_SIZE + MAX_VAL_SIZE
            <= PAGE_SIZE,
        "a single pair of maximum size must fit into a leaf page"
    );
    assert!(
        HEADER + 3 * (POINTER_SIZE + OFFSET_SIZE + KV_HEADER_SIZE + MAX_KEY_SIZE) <= PAGE_SIZE,
        "3 keys of max size must fit into an internal page"
    );
};

/// The two node variants, distinguished by the tag at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal,
    Leaf,
}

impl NodeKind {
    pub fn from_tag(tag: u16) -> DbResult<Self> {
        match tag {
            NODE_INTERNAL => Ok(NodeKind::Internal),
            NODE_LEAF => Ok(NodeKind::Leaf),
            other => Err(DbError::CorruptNode(format!("unknown node type tag {}", other))),
        }
    }

    pub fn tag(&self) -> u16 {
        match self {
            NodeKind::Internal => NODE_INTERNAL,
            NodeKind::Leaf => NODE_LEAF,
        }
    }
}

/// A zeroed page on the heap.
pub fn new_page() -> Box<PageBuf> {
    Box::new([0; PAGE_SIZE])
}

/// Read the raw node type tag (u16).
pub fn get_node_type(page: &PageBuf) -> u16 {
    u16::from_le_bytes([page[NODE_TYPE_OFFSET], page[NODE_TYPE_OFFSET + 1]])
}

/// Read the number of keys in this node (u16).
pub fn get_key_count(page: &PageBuf) -> u16 {
    u16::from_le_bytes([page[KEY_COUNT_OFFSET], page[KEY_COUNT_OFFSET + 1]])
}

/// Write both header fields.
pub fn set_header(page: &mut PageBuf, tag: u16, key_count: u16) {
    page[NODE_TYPE_OFFSET..NODE_TYPE_OFFSET + 2].copy_from_slice(&tag.to_le_bytes());
    page[KEY_COUNT_OFFSET..KEY_COUNT_OFFSET + 2].copy_from_slice(&key_count.to_le_bytes());
}

/// Position of pointer slot `id`.
pub fn pointer_pos(id: u16) -> usize {
    HEADER + POINTER_SIZE * id as usize
}

/// Position of the stored offset for pair `id` (1..=n). Slot `id - 1`.
pub fn offset_pos(key_count: u16, id: u16) -> usize {
    debug_assert!(id >= 1);
    HEADER + POINTER_SIZE * key_count as usize + OFFSET_SIZE * (id as usize - 1)
}

/// Start of the KV region for a node with `key_count` keys.
pub fn kv_region_start(key_count: u16) -> usize {
    HEADER + (POINTER_SIZE + OFFSET_SIZE) * key_count as usize
}

/// Bytes needed by a node with `key_count` keys and `kv_bytes` of pair blobs.
pub fn encoded_size(key_count: usize, kv_bytes: usize) -> usize {
    HEADER + (POINTER_SIZE + OFFSET_SIZE) * key_count + kv_bytes
}

/// Slice `len` bytes at `pos`, failing with `CorruptNode` past the page end.
pub fn slice_at(page: &PageBuf, pos: usize, len: usize) -> DbResult<&[u8]> {
    match pos.checked_add(len) {
        Some(end) if end <= PAGE_SIZE => Ok(&page[pos..end]),
        _ => Err(DbError::CorruptNode(format!(
            "read of {} bytes at {} crosses page boundary",
            len, pos
        ))),
    }
}

pub fn read_u16(page: &PageBuf, pos: usize) -> DbResult<u16> {
    let bytes = slice_at(page, pos, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn read_u64(page: &PageBuf, pos: usize) -> DbResult<u64> {
    let bytes = slice_at(page, pos, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

/// Copy `src` into the page at `pos`, failing with `PageOverflow` past the page end.
pub fn write_at(page: &mut PageBuf, pos: usize, src: &[u8]) -> DbResult<()> {
    let end = pos.saturating_add(src.len());
    if end > PAGE_SIZE {
        return Err(DbError::PageOverflow { needed: end });
    }
    page[pos..end].copy_from_slice(src);
    Ok(())
}

pub fn write_u16(page: &mut PageBuf, pos: usize, value: u16) -> DbResult<()> {
    write_at(page, pos, &value.to_le_bytes())
}

pub fn write_u64(page: &mut PageBuf, pos: usize, value: u64) -> DbResult<()> {
    write_at(page, pos, &value.to_le_bytes())
}
