use log::{debug, warn};

use crate::error::DbResult;
use crate::storage::node::{Committed, Draft, Node};

/// The storage side of the tree: maps page ids to bytes.
///
/// `persist` must hand out an id that no published root can reach, and a
/// released id may only come back from `persist` after `release` returned.
/// Those two rules are what make copy-on-write safe for concurrent readers.
pub trait PageStore {
    /// Fetch and validate a page.
    fn load(&self, id: u64) -> DbResult<Node<Committed>>;

    /// Store a finished draft under a fresh id.
    fn persist(&mut self, node: Node<Draft>) -> DbResult<u64>;

    /// Mark `id` reclaimable. No published root may still reference it.
    fn release(&mut self, id: u64) -> DbResult<()>;

    /// Make `root` the durable entry point. Every page it references has
    /// already been persisted when this is called.
    fn publish_root(&mut self, root: u64) -> DbResult<()> {
        let _ = root;
        Ok(())
    }
}

impl<S: PageStore + ?Sized> PageStore for &mut S {
    fn load(&self, id: u64) -> DbResult<Node<Committed>> {
        (**self).load(id)
    }

    fn persist(&mut self, node: Node<Draft>) -> DbResult<u64> {
        (**self).persist(node)
    }

    fn release(&mut self, id: u64) -> DbResult<()> {
        (**self).release(id)
    }

    fn publish_root(&mut self, root: u64) -> DbResult<()> {
        (**self).publish_root(root)
    }
}

/// Root page id plus the store it lives in.
///
/// The handle never edits a page. A mutation is: load, `to_draft`, edit the
/// draft, `persist` any new children, then `commit` the new root and name the
/// pages it replaced.
pub struct Tree<S: PageStore> {
    root: u64,
    store: S,
}

impl<S: PageStore> Tree<S> {
    /// Open a tree whose root is already persisted. The root is loaded once
    /// so a bad id or corrupt page fails here rather than on first use.
    pub fn open(store: S, root: u64) -> DbResult<Self> {
        store.load(root)?;
        debug!("Opened tree at root page {}.", root);
        Ok(Tree { root, store })
    }

    /// Start an empty tree: a single leaf with no keys.
    pub fn bootstrap(mut store: S) -> DbResult<Self> {
        let root = store.persist(Node::new_leaf())?;
        store.publish_root(root)?;
        debug!("Initialized empty tree: leaf root at page {}.", root);
        Ok(Tree { root, store })
    }

    pub fn root(&self) -> u64 {
        self.root
    }

    pub fn load_root(&self) -> DbResult<Node<Committed>> {
        self.store.load(self.root)
    }

    pub fn load(&self, id: u64) -> DbResult<Node<Committed>> {
        self.store.load(id)
    }

    /// Persist a non-root page built as part of the next commit.
    pub fn persist(&mut self, node: Node<Draft>) -> DbResult<u64> {
        self.store.persist(node)
    }

    /// Persist `new_root`, publish it, then release `retired`.
    ///
    /// Children of `new_root` must already be persisted. `retired` lists the
    /// pages the new version no longer reaches, usually including the old root.
    /// A failed release is returned after the root has already moved.
    pub fn commit(&mut self, new_root: Node<Draft>, retired: &[u64]) -> DbResult<u64> {
        let id = self.store.persist(new_root)?;
        self.store.publish_root(id)?;
        let old = self.root;
        self.root = id;
        debug!("commit: root {} -> {}, retiring {} pages", old, id, retired.len());

        for &page in retired {
            if page == id {
                warn!("commit: refusing to release new root {}", id);
                continue;
            }
            self.store.release(page)?;
        }
        Ok(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
