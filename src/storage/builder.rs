use log::debug;

use crate::error::{DbError, DbResult};
use crate::storage::node::{Draft, Node, NodeRef};
use crate::storage::page::{
    encoded_size, NodeKind, KV_HEADER_SIZE, MAX_KEY_SIZE, MAX_VAL_SIZE, PAGE_SIZE,
};

/// Collects `(pointer, key, value)` slots and writes them into a fresh draft.
///
/// Sizes are checked up front, so a node that would not fit is rejected with
/// `PageOverflow` before any page is allocated.
///
/// ```
/// use cowdb::storage::builder::NodeBuilder;
///
/// let mut b = NodeBuilder::leaf();
/// b.push(0, b"a", b"1").push(0, b"bb", b"22");
/// let node = b.build().unwrap();
/// assert_eq!(node.view().retrieve_value(1).unwrap(), b"22");
/// ```
pub struct NodeBuilder<'a> {
    kind: NodeKind,
    slots: Vec<(u64, &'a [u8], &'a [u8])>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(kind: NodeKind) -> Self {
        NodeBuilder { kind, slots: Vec::new() }
    }

    pub fn leaf() -> Self {
        NodeBuilder::new(NodeKind::Leaf)
    }

    pub fn internal() -> Self {
        NodeBuilder::new(NodeKind::Internal)
    }

    pub fn push(&mut self, pointer: u64, key: &'a [u8], value: &'a [u8]) -> &mut Self {
        self.slots.push((pointer, key, value));
        self
    }

    /// Internal-node slot: child pointer plus separator key, no value.
    pub fn push_child(&mut self, pointer: u64, key: &'a [u8]) -> &mut Self {
        self.push(pointer, key, &[])
    }

    /// Append every slot of an existing node.
    pub fn extend_from(&mut self, node: &NodeRef<'a>) -> DbResult<&mut Self> {
        for entry in node.entries() {
            let entry = entry?;
            self.slots.push((entry.pointer, entry.key, entry.value));
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bytes the finished node will occupy.
    pub fn encoded_size(&self) -> usize {
        let kv_bytes: usize = self
            .slots
            .iter()
            .map(|(_, k, v)| KV_HEADER_SIZE + k.len() + v.len())
            .sum();
        encoded_size(self.slots.len(), kv_bytes)
    }

    pub fn fits(&self) -> bool {
        self.encoded_size() <= PAGE_SIZE
    }

    pub fn build(&self) -> DbResult<Node<Draft>> {
        for (_, key, value) in &self.slots {
            if key.len() > MAX_KEY_SIZE {
                return Err(DbError::KeyTooLarge(key.len()));
            }
            if value.len() > MAX_VAL_SIZE {
                return Err(DbError::ValueTooLarge(value.len()));
            }
        }
        let needed = self.encoded_size();
        if needed > PAGE_SIZE {
            return Err(DbError::PageOverflow { needed });
        }

        let count = self.slots.len() as u16;
        debug!("build: {:?} node with {} slots, {} bytes", self.kind, count, needed);

        let mut node = Node::empty();
        {
            let mut w = node.view_mut();
            w.set_header(self.kind, count)?;
            for (id, (pointer, key, value)) in self.slots.iter().enumerate() {
                w.append_kv(id as u16, *pointer, key, value)?;
            }
        }
        Ok(node)
    }
}
