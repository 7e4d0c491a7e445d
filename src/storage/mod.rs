//! Page format, node codec and the store contract a tree is built on.

pub mod builder;
pub mod memory;
pub mod node;
pub mod page;
pub mod pager;
pub mod tree;

pub use builder::NodeBuilder;
pub use memory::MemoryStore;
pub use node::{Committed, Draft, Entry, Node, NodeMut, NodeRef};
pub use page::{NodeKind, PageBuf, PAGE_SIZE};
pub use pager::{Pager, PagerOptions};
pub use tree::{PageStore, Tree};
