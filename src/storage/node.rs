use log::trace;

use crate::error::{DbError, DbResult};
use crate::storage::page::{
    self, kv_region_start, offset_pos, pointer_pos, NodeKind, PageBuf, KV_HEADER_SIZE,
    MAX_KEY_SIZE, MAX_VAL_SIZE, PAGE_SIZE,
};

/// Read-only view over one page.
///
/// Every accessor is bounds-checked: indices against the key count, byte
/// positions against the page end. Slices returned by `retrieve_key` and
/// `retrieve_value` borrow from the page buffer, not from the view.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    data: &'a PageBuf,
}

impl<'a> NodeRef<'a> {
    pub fn new(data: &'a PageBuf) -> Self {
        NodeRef { data }
    }

    /// Raw type tag. Not validated.
    pub fn node_type(&self) -> u16 {
        page::get_node_type(self.data)
    }

    /// Type tag validated against the known variants.
    pub fn kind(&self) -> DbResult<NodeKind> {
        NodeKind::from_tag(self.node_type())
    }

    pub fn key_count(&self) -> u16 {
        page::get_key_count(self.data)
    }

    /// Child page id at slot `id`. Valid for `0..key_count()`.
    pub fn get_pointer(&self, id: u16) -> DbResult<u64> {
        self.check_key(id)?;
        page::read_u64(self.data, pointer_pos(id))
    }

    /// Offset of pair `id` from the start of the KV region. Valid for
    /// `0..=key_count()`; `get_offset(key_count())` is the region length.
    pub fn get_offset(&self, id: u16) -> DbResult<u16> {
        if id == 0 {
            return Ok(0);
        }
        let n = self.check_slot(id)?;
        page::read_u16(self.data, offset_pos(n, id))
    }

    /// Absolute byte position of pair `id`. Valid for `0..=key_count()`.
    pub fn kv_position(&self, id: u16) -> DbResult<usize> {
        let n = self.check_slot(id)?;
        let offset = self.get_offset(id)?;
        Ok(kv_region_start(n) + offset as usize)
    }

    /// Key bytes of pair `id`. Valid for `0..key_count()`.
    pub fn retrieve_key(&self, id: u16) -> DbResult<&'a [u8]> {
        let (pos, klen, _) = self.kv_header(id)?;
        page::slice_at(self.data, pos + KV_HEADER_SIZE, klen)
    }

    /// Value bytes of pair `id`. Valid for `0..key_count()`.
    pub fn retrieve_value(&self, id: u16) -> DbResult<&'a [u8]> {
        let (pos, klen, vlen) = self.kv_header(id)?;
        page::slice_at(self.data, pos + KV_HEADER_SIZE + klen, vlen)
    }

    /// Total length of the KV region.
    pub fn kv_region_len(&self) -> DbResult<u16> {
        self.get_offset(self.key_count())
    }

    /// Bytes used by this node, header through the end of the last pair.
    pub fn encoded_size(&self) -> DbResult<usize> {
        self.kv_position(self.key_count())
    }

    /// Iterate `(pointer, key, value)` for every slot.
    pub fn entries(&self) -> Entries<'a> {
        Entries { node: *self, next: 0 }
    }

    pub fn as_bytes(&self) -> &'a PageBuf {
        self.data
    }

    /// Full structural check, run when a page is loaded from storage.
    ///
    /// Leaves must carry one well-formed pair per key. Internal nodes may be
    /// pointer-only (empty KV region); if they carry pairs, the same rules apply.
    pub fn validate(&self) -> DbResult<NodeKind> {
        let kind = self.kind()?;
        let n = self.key_count();
        if kv_region_start(n) > PAGE_SIZE {
            return Err(DbError::CorruptNode(format!(
                "key count {} does not fit in a page",
                n
            )));
        }

        let mut prev = 0u16;
        for id in 1..=n {
            let offset = self.get_offset(id)?;
            if offset < prev {
                return Err(DbError::CorruptNode(format!(
                    "offset {} at slot {} is below previous offset {}",
                    offset, id, prev
                )));
            }
            prev = offset;
        }
        if kv_region_start(n) + prev as usize > PAGE_SIZE {
            return Err(DbError::CorruptNode(format!(
                "kv region of {} bytes runs past the page",
                prev
            )));
        }

        if kind == NodeKind::Leaf || prev > 0 {
            for id in 0..n {
                let (_, klen, vlen) = self.kv_header(id)?;
                let span = self.get_offset(id + 1)? - self.get_offset(id)?;
                if KV_HEADER_SIZE + klen + vlen != span as usize {
                    return Err(DbError::CorruptNode(format!(
                        "pair {} is {} bytes but its offsets span {}",
                        id,
                        KV_HEADER_SIZE + klen + vlen,
                        span
                    )));
                }
            }
        }
        Ok(kind)
    }

    fn entry(&self, id: u16) -> DbResult<Entry<'a>> {
        Ok(Entry {
            pointer: self.get_pointer(id)?,
            key: self.retrieve_key(id)?,
            value: self.retrieve_value(id)?,
        })
    }

    /// Position, key length and value length of pair `id`.
    fn kv_header(&self, id: u16) -> DbResult<(usize, usize, usize)> {
        self.check_key(id)?;
        let pos = self.kv_position(id)?;
        let klen = page::read_u16(self.data, pos)? as usize;
        let vlen = page::read_u16(self.data, pos + 2)? as usize;
        if klen > MAX_KEY_SIZE {
            return Err(DbError::CorruptNode(format!("pair {} has key length {}", id, klen)));
        }
        if vlen > MAX_VAL_SIZE {
            return Err(DbError::CorruptNode(format!("pair {} has value length {}", id, vlen)));
        }
        if pos + KV_HEADER_SIZE + klen + vlen > PAGE_SIZE {
            return Err(DbError::CorruptNode(format!(
                "pair {} at {} runs past the page",
                id, pos
            )));
        }
        Ok((pos, klen, vlen))
    }

    /// `id` must name a stored key: `0..key_count()`.
    fn check_key(&self, id: u16) -> DbResult<u16> {
        let n = self.key_count();
        if id >= n {
            return Err(DbError::IndexOutOfRange { id, limit: n });
        }
        Ok(n)
    }

    /// `id` must name a position: `0..=key_count()`.
    fn check_slot(&self, id: u16) -> DbResult<u16> {
        let n = self.key_count();
        if id > n {
            return Err(DbError::IndexOutOfRange { id, limit: n });
        }
        Ok(n)
    }
}

/// One slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub pointer: u64,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

pub struct Entries<'a> {
    node: NodeRef<'a>,
    next: u16,
}

impl<'a> Iterator for Entries<'a> {
    type Item = DbResult<Entry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.node.key_count() {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(self.node.entry(id))
    }
}

/// Mutable view over a page that has not been persisted yet.
///
/// Only reachable through `Node<Draft>::view_mut` or by wrapping a raw buffer
/// the caller owns exclusively.
pub struct NodeMut<'a> {
    data: &'a mut PageBuf,
}

impl<'a> NodeMut<'a> {
    pub fn new(data: &'a mut PageBuf) -> Self {
        NodeMut { data }
    }

    pub fn view(&self) -> NodeRef<'_> {
        NodeRef::new(&*self.data)
    }

    /// Write node type and key count. Pointer, offset and KV addressing all
    /// derive from `key_count`, so set the header before filling the node.
    pub fn set_header(&mut self, kind: NodeKind, key_count: u16) -> DbResult<()> {
        let needed = kv_region_start(key_count);
        if needed > PAGE_SIZE {
            return Err(DbError::PageOverflow { needed });
        }
        page::set_header(self.data, kind.tag(), key_count);
        Ok(())
    }

    pub fn set_pointer(&mut self, id: u16, child: u64) -> DbResult<()> {
        self.view().check_key(id)?;
        page::write_u64(self.data, pointer_pos(id), child)
    }

    /// Store the offset of pair `id`. Writing slot 0 is a no-op.
    pub fn set_offset(&mut self, id: u16, offset: u16) -> DbResult<()> {
        if id == 0 {
            return Ok(());
        }
        let n = self.view().check_slot(id)?;
        let needed = kv_region_start(n) + offset as usize;
        if needed > PAGE_SIZE {
            return Err(DbError::PageOverflow { needed });
        }
        page::write_u16(self.data, offset_pos(n, id), offset)
    }

    /// Write pointer, pair and the following offset for slot `id`.
    ///
    /// Slots must be filled in order: the pair lands at `kv_position(id)`,
    /// which depends on the offset written for `id - 1`.
    pub fn append_kv(&mut self, id: u16, pointer: u64, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.view().check_key(id)?;
        if key.len() > MAX_KEY_SIZE {
            return Err(DbError::KeyTooLarge(key.len()));
        }
        if value.len() > MAX_VAL_SIZE {
            return Err(DbError::ValueTooLarge(value.len()));
        }
        let pos = self.view().kv_position(id)?;
        let pair_len = KV_HEADER_SIZE + key.len() + value.len();
        let end = pos + pair_len;
        if end > PAGE_SIZE {
            return Err(DbError::PageOverflow { needed: end });
        }

        trace!("append_kv: slot {} at {} ({} bytes)", id, pos, pair_len);

        self.set_pointer(id, pointer)?;
        // 2B klen, 2B vlen, key, value
        page::write_u16(self.data, pos, key.len() as u16)?;
        page::write_u16(self.data, pos + 2, value.len() as u16)?;
        page::write_at(self.data, pos + KV_HEADER_SIZE, key)?;
        page::write_at(self.data, pos + KV_HEADER_SIZE + key.len(), value)?;

        let next = self.view().get_offset(id)? as usize + pair_len;
        self.set_offset(id + 1, next as u16)
    }

    /// Copy `count` consecutive slots from `src[src_start..]` into
    /// `self[dst_start..]`. Slots before `dst_start` must already be filled.
    pub fn append_range(
        &mut self,
        src: &NodeRef<'_>,
        dst_start: u16,
        src_start: u16,
        count: u16,
    ) -> DbResult<()> {
        if count == 0 {
            return Ok(());
        }
        let src_n = src.key_count();
        if src_start as u32 + count as u32 > src_n as u32 {
            return Err(DbError::IndexOutOfRange {
                id: src_start.saturating_add(count),
                limit: src_n,
            });
        }
        let dst_n = self.view().key_count();
        if dst_start as u32 + count as u32 > dst_n as u32 {
            return Err(DbError::IndexOutOfRange {
                id: dst_start.saturating_add(count),
                limit: dst_n,
            });
        }

        let src_begin = src.kv_position(src_start)?;
        let src_end = src.kv_position(src_start + count)?;
        let blob_len = src_end.checked_sub(src_begin).ok_or_else(|| {
            DbError::CorruptNode(format!("source offsets decrease after slot {}", src_start))
        })?;
        let dst_begin = self.view().kv_position(dst_start)?;
        let needed = dst_begin + blob_len;
        if needed > PAGE_SIZE {
            return Err(DbError::PageOverflow { needed });
        }

        // everything is read and checked before the first write
        let pointers = (0..count)
            .map(|i| src.get_pointer(src_start + i))
            .collect::<DbResult<Vec<u64>>>()?;

        let dst_base = self.view().get_offset(dst_start)?;
        let src_base = src.get_offset(src_start)?;
        let mut prev = src_base;
        let mut offsets = Vec::with_capacity(count as usize);
        for i in 1..=count {
            let off = src.get_offset(src_start + i)?;
            if off < prev {
                return Err(DbError::CorruptNode(format!(
                    "source offset {} decreases ({} < {})",
                    src_start + i,
                    off,
                    prev
                )));
            }
            prev = off;
            let rebased = dst_base.checked_add(off - src_base).ok_or(DbError::PageOverflow {
                needed: dst_base as usize + (off - src_base) as usize,
            })?;
            offsets.push(rebased);
        }
        let blob = page::slice_at(src.as_bytes(), src_begin, blob_len)?;

        for (i, pointer) in (0..count).zip(pointers) {
            self.set_pointer(dst_start + i, pointer)?;
        }
        // offsets, rebased onto the destination
        for (i, off) in (1..=count).zip(offsets) {
            self.set_offset(dst_start + i, off)?;
        }
        page::write_at(self.data, dst_begin, blob)
    }
}

/// Marker for a node that has not been persisted. Mutable.
#[derive(Debug)]
pub struct Draft;

/// Marker for a node that has been persisted under `id`. Read-only.
#[derive(Debug)]
pub struct Committed {
    id: u64,
}

/// An owned page, either still being built (`Draft`) or already persisted
/// (`Committed`). Only drafts hand out a `NodeMut`, so published pages cannot
/// be changed in place.
pub struct Node<S> {
    data: Box<PageBuf>,
    state: S,
}

impl<S> Node<S> {
    pub fn view(&self) -> NodeRef<'_> {
        NodeRef::new(&self.data)
    }

    pub fn as_bytes(&self) -> &PageBuf {
        &self.data
    }

    pub fn into_bytes(self) -> Box<PageBuf> {
        self.data
    }
}

impl Node<Draft> {
    /// A zeroed page with no header. Call `set_header` before anything else.
    pub fn empty() -> Self {
        Node { data: page::new_page(), state: Draft }
    }

    pub fn new_leaf() -> Self {
        let mut node = Node::empty();
        page::set_header(&mut node.data, NodeKind::Leaf.tag(), 0);
        node
    }

    pub fn new_internal() -> Self {
        let mut node = Node::empty();
        page::set_header(&mut node.data, NodeKind::Internal.tag(), 0);
        node
    }

    /// Copy raw bytes into a fresh draft. `bytes` must be exactly one page.
    pub fn from_bytes(bytes: &[u8]) -> DbResult<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DbError::CorruptNode(format!(
                "page is {} bytes, expected {}",
                bytes.len(),
                PAGE_SIZE
            )));
        }
        let mut node = Node::empty();
        node.data.copy_from_slice(bytes);
        Ok(node)
    }

    pub fn view_mut(&mut self) -> NodeMut<'_> {
        NodeMut::new(&mut self.data)
    }

    /// Tag this draft as persisted under `id`. Called by `PageStore`
    /// implementations once the bytes are stored.
    pub fn into_committed(self, id: u64) -> Node<Committed> {
        Node { data: self.data, state: Committed { id } }
    }
}

impl Node<Committed> {
    /// Wrap bytes read back from storage, rejecting anything that fails
    /// `NodeRef::validate`.
    pub fn decode(id: u64, data: Box<PageBuf>) -> DbResult<Self> {
        NodeRef::new(&data).validate()?;
        Ok(Node { data, state: Committed { id } })
    }

    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Copy this page into a new draft. The copy-on-write entry point.
    pub fn to_draft(&self) -> Node<Draft> {
        Node { data: self.data.clone(), state: Draft }
    }
}

impl<S> std::fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view();
        f.debug_struct("Node")
            .field("node_type", &view.node_type())
            .field("key_count", &view.key_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::encoded_size;

    fn two_pair_leaf() -> Node<Draft> {
        let mut node = Node::new_leaf();
        let mut w = node.view_mut();
        w.set_header(NodeKind::Leaf, 2).unwrap();
        w.append_kv(0, 0, b"a", b"1").unwrap();
        w.append_kv(1, 0, b"bb", b"22").unwrap();
        node
    }

    #[test]
    fn two_pair_leaf_offsets_and_payloads() {
        let node = two_pair_leaf();
        let r = node.view();
        assert_eq!(r.get_offset(0).unwrap(), 0);
        assert_eq!(r.get_offset(1).unwrap(), 6);
        assert_eq!(r.get_offset(2).unwrap(), 14);
        assert_eq!(r.kv_position(0).unwrap(), 24);
        assert_eq!(r.retrieve_key(0).unwrap(), b"a");
        assert_eq!(r.retrieve_value(0).unwrap(), b"1");
        assert_eq!(r.retrieve_key(1).unwrap(), b"bb");
        assert_eq!(r.retrieve_value(1).unwrap(), b"22");
        assert_eq!(r.encoded_size().unwrap(), 38);
        assert_eq!(r.validate().unwrap(), NodeKind::Leaf);
    }

    #[test]
    fn payload_and_position_bounds_differ() {
        let node = two_pair_leaf();
        let r = node.view();
        assert!(matches!(r.retrieve_key(2), Err(DbError::IndexOutOfRange { id: 2, limit: 2 })));
        assert!(matches!(r.retrieve_value(2), Err(DbError::IndexOutOfRange { .. })));
        assert!(matches!(r.get_pointer(2), Err(DbError::IndexOutOfRange { .. })));
        assert_eq!(r.kv_position(2).unwrap(), 38);
        assert!(matches!(r.kv_position(3), Err(DbError::IndexOutOfRange { id: 3, limit: 2 })));
        assert!(matches!(r.get_offset(3), Err(DbError::IndexOutOfRange { .. })));
    }

    #[test]
    fn set_offset_zero_is_noop() {
        let mut node = Node::new_leaf();
        let mut w = node.view_mut();
        w.set_header(NodeKind::Leaf, 1).unwrap();
        w.set_offset(0, 99).unwrap();
        assert_eq!(w.view().get_offset(0).unwrap(), 0);
        assert!(node.as_bytes()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn set_offset_past_page_overflows() {
        let mut node = Node::new_leaf();
        let mut w = node.view_mut();
        w.set_header(NodeKind::Leaf, 1).unwrap();
        // region starts at 14
        w.set_offset(1, (PAGE_SIZE - 14) as u16).unwrap();
        assert!(matches!(
            w.set_offset(1, (PAGE_SIZE - 13) as u16),
            Err(DbError::PageOverflow { .. })
        ));
    }

    #[test]
    fn header_rejects_counts_that_cannot_fit() {
        let mut node = Node::empty();
        let mut w = node.view_mut();
        let max = ((PAGE_SIZE - page::HEADER) / 10) as u16;
        w.set_header(NodeKind::Internal, max).unwrap();
        assert!(matches!(
            w.set_header(NodeKind::Internal, max + 1),
            Err(DbError::PageOverflow { .. })
        ));
        assert_eq!(w.view().key_count(), max);
    }

    #[test]
    fn oversize_payloads_are_rejected_before_writing() {
        let mut node = Node::new_leaf();
        let mut w = node.view_mut();
        w.set_header(NodeKind::Leaf, 1).unwrap();
        let big_key = vec![b'k'; MAX_KEY_SIZE + 1];
        let big_val = vec![b'v'; MAX_VAL_SIZE + 1];
        assert!(matches!(w.append_kv(0, 7, &big_key, b""), Err(DbError::KeyTooLarge(1001))));
        assert!(matches!(w.append_kv(0, 7, b"k", &big_val), Err(DbError::ValueTooLarge(3001))));
        assert_eq!(w.view().get_pointer(0).unwrap(), 0);
        assert_eq!(w.view().get_offset(1).unwrap(), 0);
    }

    #[test]
    fn append_kv_overflow_leaves_page_untouched() {
        let mut node = Node::new_leaf();
        let mut w = node.view_mut();
        w.set_header(NodeKind::Leaf, 2).unwrap();
        let key = vec![1u8; MAX_KEY_SIZE];
        let val = vec![2u8; MAX_VAL_SIZE];
        w.append_kv(0, 0, &key, &val).unwrap();
        let before = *w.view().as_bytes();
        assert!(matches!(w.append_kv(1, 0, &key, &val), Err(DbError::PageOverflow { .. })));
        assert_eq!(w.view().as_bytes()[..], before[..]);
    }

    #[test]
    fn append_range_rebases_offsets() {
        let src = two_pair_leaf();

        let mut dst = Node::new_leaf();
        let mut w = dst.view_mut();
        w.set_header(NodeKind::Leaf, 3).unwrap();
        w.append_kv(0, 0, b"zzz", b"").unwrap();
        w.append_range(&src.view(), 1, 0, 2).unwrap();

        let r = dst.view();
        assert_eq!(r.get_offset(1).unwrap(), 7);
        assert_eq!(r.get_offset(2).unwrap(), 13);
        assert_eq!(r.get_offset(3).unwrap(), 21);
        assert_eq!(r.retrieve_key(1).unwrap(), b"a");
        assert_eq!(r.retrieve_value(2).unwrap(), b"22");
        assert_eq!(r.validate().unwrap(), NodeKind::Leaf);
    }

    #[test]
    fn append_range_checks_both_ranges() {
        let src = two_pair_leaf();
        let mut dst = Node::new_leaf();
        let mut w = dst.view_mut();
        w.set_header(NodeKind::Leaf, 1).unwrap();
        assert!(matches!(
            w.append_range(&src.view(), 0, 1, 2),
            Err(DbError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            w.append_range(&src.view(), 0, 0, 2),
            Err(DbError::IndexOutOfRange { .. })
        ));
        w.append_range(&src.view(), 0, 1, 1).unwrap();
        assert_eq!(w.view().retrieve_key(0).unwrap(), b"bb");
    }

    #[test]
    fn append_range_rejects_decreasing_source_offsets() {
        let mut src = Node::new_leaf();
        src.view_mut().set_header(NodeKind::Leaf, 2).unwrap();
        page::write_u64(&mut src.data, page::pointer_pos(0), 11).unwrap();
        page::write_u16(&mut src.data, offset_pos(2, 1), u16::MAX).unwrap();
        page::write_u16(&mut src.data, offset_pos(2, 2), 4).unwrap();

        let mut dst = Node::new_leaf();
        let mut w = dst.view_mut();
        w.set_header(NodeKind::Leaf, 3).unwrap();
        w.append_kv(0, 0, b"k", b"v").unwrap();
        let before = *w.view().as_bytes();

        assert!(w.append_range(&src.view(), 1, 0, 2).is_err());
        assert_eq!(w.view().as_bytes()[..], before[..]);

        // same shape, but the first rebased offset runs past u16
        page::write_u16(&mut src.data, offset_pos(2, 2), u16::MAX).unwrap();
        assert!(w.append_range(&src.view(), 1, 0, 2).is_err());
        assert_eq!(w.view().as_bytes()[..], before[..]);
    }

    #[test]
    fn validate_catches_corruption() {
        let mut node = two_pair_leaf();
        page::set_header(&mut node.data, 9, 2);
        assert!(matches!(node.view().validate(), Err(DbError::CorruptNode(_))));

        let mut node = two_pair_leaf();
        // offset(2) < offset(1)
        page::write_u16(&mut node.data, offset_pos(2, 2), 3).unwrap();
        assert!(matches!(node.view().validate(), Err(DbError::CorruptNode(_))));

        let mut node = two_pair_leaf();
        // klen of pair 1 no longer matches its span
        let pos = node.view().kv_position(1).unwrap();
        page::write_u16(&mut node.data, pos, 3).unwrap();
        assert!(matches!(node.view().validate(), Err(DbError::CorruptNode(_))));

        let mut node = Node::empty();
        page::set_header(&mut node.data, NodeKind::Leaf.tag(), u16::MAX);
        assert!(matches!(node.view().validate(), Err(DbError::CorruptNode(_))));
    }

    #[test]
    fn pointer_only_internal_node_is_valid() {
        let mut node = Node::new_internal();
        let mut w = node.view_mut();
        w.set_header(NodeKind::Internal, 3).unwrap();
        for id in 0..3 {
            w.set_pointer(id, 100 + id as u64).unwrap();
        }
        let r = node.view();
        assert_eq!(r.validate().unwrap(), NodeKind::Internal);
        assert_eq!(r.get_pointer(2).unwrap(), 102);
        assert_eq!(r.kv_region_len().unwrap(), 0);
    }

    #[test]
    fn committed_copy_is_independent() {
        let committed = Node::<Committed>::decode(5, two_pair_leaf().into_bytes()).unwrap();
        let mut draft = committed.to_draft();
        draft.view_mut().set_header(NodeKind::Leaf, 1).unwrap();
        assert_eq!(committed.view().key_count(), 2);
        assert_eq!(draft.view().key_count(), 1);
        assert_eq!(committed.id(), 5);
    }

    #[test]
    fn into_committed_keeps_bytes() {
        let committed = two_pair_leaf().into_committed(11);
        assert_eq!(committed.id(), 11);
        assert_eq!(committed.view().retrieve_key(1).unwrap(), b"bb");
    }

    #[test]
    fn mutable_view_over_a_raw_buffer() {
        let mut buf = [0u8; PAGE_SIZE];
        {
            let mut w = NodeMut::new(&mut buf);
            w.set_header(NodeKind::Leaf, 1).unwrap();
            w.append_kv(0, 3, b"key", b"val").unwrap();
        }
        let r = NodeRef::new(&buf);
        assert_eq!(r.validate().unwrap(), NodeKind::Leaf);
        assert_eq!(r.get_pointer(0).unwrap(), 3);
        assert_eq!(r.retrieve_value(0).unwrap(), b"val");
    }

    #[test]
    fn from_bytes_requires_a_full_page() {
        assert!(matches!(Node::<Draft>::from_bytes(&[0u8; 10]), Err(DbError::CorruptNode(_))));
        let node = Node::<Draft>::from_bytes(two_pair_leaf().as_bytes()).unwrap();
        assert_eq!(node.view().retrieve_key(1).unwrap(), b"bb");
    }

    #[test]
    fn entries_yield_every_slot() {
        let node = two_pair_leaf();
        let all: Vec<_> = node.view().entries().collect::<DbResult<_>>().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], Entry { pointer: 0, key: b"bb", value: b"22" });
    }

    #[test]
    fn encoded_size_matches_layout() {
        let node = two_pair_leaf();
        assert_eq!(node.view().encoded_size().unwrap(), encoded_size(2, 14));
    }
}
