//! Fixed set of remote clients, one per worker thread

use sbx_core::{SbxError, SbxResult};

/// Independent client handles indexed by worker thread.
///
/// The pool never grows, shrinks or reassigns a handle after construction.
#[derive(Debug)]
pub struct ClientPool<C> {
    clients: Vec<C>,
}

impl<C> ClientPool<C> {
    pub fn new(clients: Vec<C>) -> SbxResult<Self> {
        if clients.is_empty() {
            return Err(SbxError::InvalidConfig("client pool needs at least one client".into()));
        }
        Ok(Self { clients })
    }

    /// Build `threads` clients with `make`, which receives the thread index
    pub fn from_fn(threads: usize, make: impl FnMut(usize) -> C) -> SbxResult<Self> {
        Self::new((0..threads).map(make).collect())
    }

    pub fn get(&self, thread_index: usize) -> SbxResult<&C> {
        self.clients.get(thread_index).ok_or(SbxError::InvalidThreadIndex {
            index: thread_index,
            threads: self.clients.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
