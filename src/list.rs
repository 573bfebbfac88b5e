//! Entry arena and sentinel-bounded intrusive lists.
//!
//! Entries live in an [`Arena`] and are addressed by [`EntryId`]. A list only
//! stores the two sentinel slots it owns; every node carries its own `prev` and
//! `next` indices, so unlinking and relinking never allocates. Several lists
//! can share one arena (the LFU cache keeps one list per frequency).
//!
//! ```text
//!   head ─► [A] ◄──► [B] ◄──► [C] ◄── tail
//!          front                back
//!          (MRU)            (evict first)
//! ```

// Marks a node that is not linked into any list
const DETACHED: usize = usize::MAX;

/// Stable handle to an entry slot inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(usize);

/// The unit of storage: a key, its value and how often it has been touched.
#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) access_count: u64,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            access_count: 1,
        }
    }
}

#[derive(Debug)]
enum Slot<K, V> {
    Sentinel,
    Occupied(Entry<K, V>),
    Free,
}

#[derive(Debug)]
struct Node<K, V> {
    slot: Slot<K, V>,
    prev: usize,
    next: usize,
}

/// Slot storage for entries and list sentinels, with a free list for reuse.
#[derive(Debug)]
pub(crate) struct Arena<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
}

impl<K, V> Arena<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, slot: Slot<K, V>) -> usize {
        let node = Node {
            slot,
            prev: DETACHED,
            next: DETACHED,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Stores a detached entry and returns its handle.
    pub(crate) fn insert(&mut self, entry: Entry<K, V>) -> EntryId {
        EntryId(self.alloc(Slot::Occupied(entry)))
    }

    /// Frees an entry slot. The entry must already be unlinked from its list.
    pub(crate) fn remove(&mut self, id: EntryId) -> Option<Entry<K, V>> {
        let node = self.nodes.get_mut(id.0)?;
        if !matches!(node.slot, Slot::Occupied(_)) {
            return None;
        }
        debug_assert!(node.prev == DETACHED && node.next == DETACHED);
        let Slot::Occupied(entry) = std::mem::replace(&mut node.slot, Slot::Free) else {
            return None;
        };
        self.free.push(id.0);
        Some(entry)
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&Entry<K, V>> {
        match self.nodes.get(id.0).map(|node| &node.slot) {
            Some(Slot::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry<K, V>> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.slot) {
            Some(Slot::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Number of live entries (sentinels excluded).
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.slot, Slot::Occupied(_)))
            .count()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }

    fn is_linked_entry(&self, idx: usize) -> bool {
        self.nodes.get(idx).is_some_and(|node| {
            matches!(node.slot, Slot::Occupied(_)) && node.prev != DETACHED && node.next != DETACHED
        })
    }

    fn is_detached_entry(&self, idx: usize) -> bool {
        self.nodes.get(idx).is_some_and(|node| {
            matches!(node.slot, Slot::Occupied(_)) && node.prev == DETACHED && node.next == DETACHED
        })
    }
}

/// Doubly linked list bounded by a head and a tail sentinel.
///
/// The list never owns entries: [`insert_front`](Self::insert_front) links an
/// entry already stored in the arena and [`remove`](Self::remove) only unlinks
/// it. Callers free the slot through [`Arena::remove`].
#[derive(Debug)]
pub(crate) struct IntrusiveList {
    head: usize,
    tail: usize,
    len: usize,
}

impl IntrusiveList {
    pub(crate) fn new<K, V>(arena: &mut Arena<K, V>) -> Self {
        let head = arena.alloc(Slot::Sentinel);
        let tail = arena.alloc(Slot::Sentinel);
        arena.nodes[head].next = tail;
        arena.nodes[tail].prev = head;
        Self { head, tail, len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty<K, V>(&self, arena: &Arena<K, V>) -> bool {
        arena.nodes[self.head].next == self.tail
    }

    /// Links a detached entry right after the head sentinel.
    ///
    /// Returns `false` if `id` is a sentinel, a free slot or already linked.
    pub(crate) fn insert_front<K, V>(&mut self, arena: &mut Arena<K, V>, id: EntryId) -> bool {
        if !arena.is_detached_entry(id.0) {
            return false;
        }
        let first = arena.nodes[self.head].next;
        arena.nodes[id.0].prev = self.head;
        arena.nodes[id.0].next = first;
        arena.nodes[first].prev = id.0;
        arena.nodes[self.head].next = id.0;
        self.len += 1;
        true
    }

    /// Unlinks an entry from this list.
    ///
    /// Sentinels and detached entries are left untouched and yield `false`.
    pub(crate) fn remove<K, V>(&mut self, arena: &mut Arena<K, V>, id: EntryId) -> bool {
        if !arena.is_linked_entry(id.0) {
            return false;
        }
        let (prev, next) = (arena.nodes[id.0].prev, arena.nodes[id.0].next);
        arena.nodes[prev].next = next;
        arena.nodes[next].prev = prev;
        arena.nodes[id.0].prev = DETACHED;
        arena.nodes[id.0].next = DETACHED;
        self.len -= 1;
        true
    }

    /// Moves a linked entry to the front.
    pub(crate) fn move_to_front<K, V>(&mut self, arena: &mut Arena<K, V>, id: EntryId) {
        if self.remove(arena, id) {
            self.insert_front(arena, id);
        }
    }

    /// Returns the least recently inserted entry, if any.
    pub(crate) fn peek_back<K, V>(&self, arena: &Arena<K, V>) -> Option<EntryId> {
        let last = arena.nodes[self.tail].prev;
        (last != self.head).then_some(EntryId(last))
    }

    /// Unlinks and returns the back entry. The slot stays allocated.
    pub(crate) fn pop_back<K, V>(&mut self, arena: &mut Arena<K, V>) -> Option<EntryId> {
        let id = self.peek_back(arena)?;
        self.remove(arena, id);
        Some(id)
    }

    /// Returns the sentinel slots to the arena. The list must be empty.
    pub(crate) fn release<K, V>(self, arena: &mut Arena<K, V>) {
        debug_assert!(self.is_empty(arena));
        for idx in [self.head, self.tail] {
            arena.nodes[idx] = Node {
                slot: Slot::Free,
                prev: DETACHED,
                next: DETACHED,
            };
            arena.free.push(idx);
        }
    }

    /// Iterates entry ids from front to back.
    #[cfg(test)]
    pub(crate) fn ids<'a, K, V>(&self, arena: &'a Arena<K, V>) -> Ids<'a, K, V> {
        Ids {
            arena,
            current: arena.nodes[self.head].next,
            tail: self.tail,
        }
    }
}

#[cfg(test)]
pub(crate) struct Ids<'a, K, V> {
    arena: &'a Arena<K, V>,
    current: usize,
    tail: usize,
}

#[cfg(test)]
impl<K, V> Iterator for Ids<'_, K, V> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        if self.current == self.tail {
            return None;
        }
        let id = EntryId(self.current);
        self.current = self.arena.nodes[self.current].next;
        Some(id)
    }
}
