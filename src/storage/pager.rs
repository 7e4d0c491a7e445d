// ┌─────────────────────────────────────────────────────────────────────────┐
// │ Meta page (page 0)                                                      │
// │─────────────────────────────────────────────────────────────────────────│
// │ Offset │ Length │ Description                                           │
// │   0    │   8    │ SIGNATURE                                             │
// │   8    │   8    │ ROOT (u64): published root page, 0 if none            │
// │  16    │   8    │ PAGE_COUNT (u64): pages in the file incl. meta        │
// └─────────────────────────────────────────────────────────────────────────┘
//
// Node pages live at `id * PAGE_SIZE` for id >= 1.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::storage::node::{Committed, Draft, Node};
use crate::storage::page::{self, PageBuf, PAGE_SIZE};
use crate::storage::tree::PageStore;

const SIGNATURE: &[u8; 8] = b"cowdb\x00\x00\x01";
const META_ROOT_OFFSET: usize = 8;
const META_PAGE_COUNT_OFFSET: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct PagerOptions {
    /// fsync data pages on every `persist`. `publish_root` always syncs.
    pub sync_on_persist: bool,
}

impl Default for PagerOptions {
    fn default() -> Self {
        PagerOptions { sync_on_persist: true }
    }
}

/// File-backed `PageStore`. Pages are written whole and never rewritten
/// while reachable; released ids go on an in-memory free list.
///
/// The free list is not persisted: pages released before a close stay
/// allocated in the file after reopening.
pub struct Pager {
    /// Guarded so concurrent `load`s do not interleave seek and read.
    file: Mutex<File>,

    /// Pages in the file, including the meta page.
    num_pages: u64,

    /// Last published root, 0 if none.
    root: u64,

    free: Vec<u64>,
    options: PagerOptions,
}

impl Pager {
    /// Open (or create) the page file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, options: PagerOptions) -> DbResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        let file_len = file.metadata()?.len();

        if file_len == 0 {
            debug!("Initializing new page file {:?}.", path.as_ref());
            let mut pager = Pager {
                file: Mutex::new(file),
                num_pages: 1,
                root: 0,
                free: Vec::new(),
                options,
            };
            pager.write_meta()?;
            return Ok(pager);
        }

        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(DbError::CorruptNode(format!(
                "file length {} is not a multiple of the page size",
                file_len
            )));
        }

        let mut meta = page::new_page();
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut meta[..])?;
        if &meta[..SIGNATURE.len()] != SIGNATURE {
            return Err(DbError::CorruptNode("bad meta page signature".into()));
        }
        let root = page::read_u64(&meta, META_ROOT_OFFSET)?;
        let recorded = page::read_u64(&meta, META_PAGE_COUNT_OFFSET)?;
        let num_pages = file_len / PAGE_SIZE as u64;
        if recorded > num_pages {
            return Err(DbError::CorruptNode(format!(
                "meta page records {} pages but file holds {}",
                recorded, num_pages
            )));
        }

        debug!("Opened page file with {} pages, root {}.", num_pages, root);
        Ok(Pager { file: Mutex::new(file), num_pages, root, free: Vec::new(), options })
    }

    /// Root written by the last `publish_root`, if any.
    pub fn published_root(&self) -> Option<u64> {
        if self.root == 0 { None } else { Some(self.root) }
    }

    /// Pages in the file, including the meta page.
    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    /// Id the next `persist` will use. Nothing is claimed until
    /// `claim_page` runs after the write succeeds.
    fn next_page(&self) -> u64 {
        self.free.last().copied().unwrap_or(self.num_pages)
    }

    fn claim_page(&mut self, id: u64) {
        if self.free.last() == Some(&id) {
            self.free.pop();
        } else {
            self.num_pages += 1;
        }
    }

    fn file_mut(&mut self) -> &mut File {
        self.file.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_allocated(&self, id: u64) -> bool {
        id != 0 && id < self.num_pages && !self.free.contains(&id)
    }

    fn write_page(&mut self, id: u64, data: &PageBuf) -> DbResult<()> {
        let file = self.file_mut();
        file.seek(SeekFrom::Start(id * PAGE_SIZE as u64))?;
        file.write_all(data)?;
        Ok(())
    }

    fn write_meta(&mut self) -> DbResult<()> {
        let mut meta = page::new_page();
        page::write_at(&mut meta, 0, SIGNATURE)?;
        page::write_u64(&mut meta, META_ROOT_OFFSET, self.root)?;
        page::write_u64(&mut meta, META_PAGE_COUNT_OFFSET, self.num_pages)?;
        self.write_page(0, &meta)?;
        self.file_mut().sync_data()?;
        Ok(())
    }
}

impl PageStore for Pager {
    fn load(&self, id: u64) -> DbResult<Node<Committed>> {
        if !self.is_allocated(id) {
            return Err(DbError::PageNotFound(id));
        }
        let mut data = page::new_page();
        {
            let mut file = self.lock_file();
            file.seek(SeekFrom::Start(id * PAGE_SIZE as u64))?;
            file.read_exact(&mut data[..])?;
        }
        Node::decode(id, data).map_err(|e| {
            warn!("load: page {} failed validation: {}", id, e);
            e
        })
    }

    fn persist(&mut self, node: Node<Draft>) -> DbResult<u64> {
        let id = self.next_page();
        self.write_page(id, node.as_bytes())?;
        if self.options.sync_on_persist {
            self.file_mut().sync_data()?;
        }
        self.claim_page(id);
        debug!("persist: wrote page {}", id);
        Ok(id)
    }

    fn release(&mut self, id: u64) -> DbResult<()> {
        if !self.is_allocated(id) {
            return Err(DbError::PageNotFound(id));
        }
        if id == self.root {
            warn!("release: page {} is the published root", id);
            return Err(DbError::PageInUse(id));
        }
        self.free.push(id);
        debug!("release: page {} is free", id);
        Ok(())
    }

    fn publish_root(&mut self, root: u64) -> DbResult<()> {
        if !self.is_allocated(root) {
            return Err(DbError::PageNotFound(root));
        }
        // data pages reach disk before the meta page points at them
        self.file_mut().sync_data()?;
        self.root = root;
        self.write_meta()?;
        debug!("publish_root: root is now page {}", root);
        Ok(())
    }
}
