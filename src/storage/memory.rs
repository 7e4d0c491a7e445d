use std::collections::HashMap;

use log::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::storage::node::{Committed, Draft, Node};
use crate::storage::page::PageBuf;
use crate::storage::tree::PageStore;

/// In-memory `PageStore`. Ids start at 1; released ids are reused.
#[derive(Default)]
pub struct MemoryStore {
    pages: HashMap<u64, Box<PageBuf>>,
    free: Vec<u64>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore { pages: HashMap::new(), free: Vec::new(), next_id: 1 }
    }

    /// Number of pages currently stored.
    pub fn live_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.pages.contains_key(&id)
    }

    fn allocate(&mut self) -> u64 {
        if let Some(id) = self.free.pop() {
            return id;
        }
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl PageStore for MemoryStore {
    fn load(&self, id: u64) -> DbResult<Node<Committed>> {
        let data = self.pages.get(&id).ok_or(DbError::PageNotFound(id))?;
        Node::decode(id, data.clone()).map_err(|e| {
            warn!("load: page {} failed validation: {}", id, e);
            e
        })
    }

    fn persist(&mut self, node: Node<Draft>) -> DbResult<u64> {
        let id = self.allocate();
        self.pages.insert(id, node.into_bytes());
        debug!("persist: stored page {}", id);
        Ok(id)
    }

    fn release(&mut self, id: u64) -> DbResult<()> {
        if self.pages.remove(&id).is_none() {
            return Err(DbError::PageNotFound(id));
        }
        self.free.push(id);
        debug!("release: page {} is free", id);
        Ok(())
    }
}
