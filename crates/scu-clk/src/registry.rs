//! Named clock registry.
//!
//! Nodes are registered once, in dependency order, and never removed. A parent
//! named before it exists leaves the child's link pending; the child reports
//! [`ClockError::NotReady`] until [`ClockRegistry::resolve_pending`] links it.
//! [`ClockRegistry::finalize`] never links anything: it closes the registry and
//! turns any link still pending into a build error, so a build pass that names
//! a parent before registering it fails there.

use heapless::index_map::FnvIndexMap;
use heapless::Vec;

use crate::error::{ClockError, TopologyError};
use crate::node::{ClockFlags, ClockId, ClockKind, ClockNode, Hertz, Link};
use crate::regs::RegisterMap;

/// Node table capacity.
pub const MAX_CLOCKS: usize = 96;
/// Name index capacity (power of two, ≥ [`MAX_CLOCKS`]).
const INDEX_CAPACITY: usize = 128;

/// Visited set for ancestry walks; one bit per node.
type Visited = u128;
const _: () = assert!(MAX_CLOCKS <= Visited::BITS as usize);

/// Lookup-by-name node table.
pub struct ClockRegistry {
    nodes: Vec<ClockNode, MAX_CLOCKS>,
    index: FnvIndexMap<&'static str, ClockId, INDEX_CAPACITY>,
    finalized: bool,
}

impl Default for ClockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockRegistry {
    /// Empty, open registry.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: FnvIndexMap::new(),
            finalized: false,
        }
    }

    /// Add a node. Parent names already registered are linked immediately.
    pub fn register(
        &mut self,
        name: &'static str,
        mut kind: ClockKind,
        flags: ClockFlags,
    ) -> Result<ClockId, TopologyError> {
        if self.finalized {
            return Err(TopologyError::Finalized);
        }
        if self.index.contains_key(name) {
            return Err(TopologyError::DuplicateName(name));
        }
        let raw = u16::try_from(self.nodes.len()).map_err(|_| TopologyError::CapacityExceeded)?;
        let id = ClockId::new(raw);

        for link in kind.parents_mut() {
            if let Link::Pending(parent) = *link {
                if let Some(&parent_id) = self.index.get(parent) {
                    *link = Link::Resolved(parent_id);
                }
            }
        }

        let node = ClockNode { id, name, kind, flags };
        if let Some(parent) = node.pending_parent() {
            debug!("clock {} waits for parent {}", name, parent);
        }
        self.nodes
            .push(node)
            .map_err(|_| TopologyError::CapacityExceeded)?;
        if self.index.insert(name, id).is_err() {
            self.nodes.pop();
            return Err(TopologyError::CapacityExceeded);
        }
        trace!("registered clock {} as {}", name, raw);
        Ok(id)
    }

    /// Link every pending parent that now exists.
    ///
    /// Returns the number of links made. A link that would make a node its
    /// own ancestor is refused with [`TopologyError::Cycle`].
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // child < len, slot < links
    pub fn resolve_pending(&mut self) -> Result<usize, TopologyError> {
        let mut linked = 0;
        for child in 0..self.nodes.len() {
            let links = self.nodes[child].kind.parents().len();
            for slot in 0..links {
                let Link::Pending(parent) = self.nodes[child].kind.parents()[slot] else {
                    continue;
                };
                let Some(&parent_id) = self.index.get(parent) else {
                    continue;
                };
                if self.reaches(parent_id, child) {
                    let clock = self.nodes[child].name;
                    error!("linking {} to {} would create a cycle", clock, parent);
                    return Err(TopologyError::Cycle { clock, parent });
                }
                self.nodes[child].kind.parents_mut()[slot] = Link::Resolved(parent_id);
                linked += 1;
            }
        }
        Ok(linked)
    }

    /// `true` if `target` is `from` or one of its resolved ancestors.
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // indices come from registered ids, all < MAX_CLOCKS
    fn reaches(&self, from: ClockId, target: usize) -> bool {
        let mut visited: Visited = 0;
        let mut stack: Vec<usize, MAX_CLOCKS> = Vec::new();
        // Every node is pushed at most once, so the stack cannot overflow.
        let _ = stack.push(from.index());
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            let mask: Visited = 1 << current;
            if visited & mask != 0 {
                continue;
            }
            visited |= mask;
            for link in self.nodes[current].kind.parents() {
                if let Some(id) = link.id() {
                    if visited & (1 << id.index()) == 0 {
                        let _ = stack.push(id.index());
                    }
                }
            }
        }
        false
    }

    /// Close the registry.
    ///
    /// Every link must already be resolved, either at registration or by an
    /// explicit [`resolve_pending`](Self::resolve_pending). A link still
    /// pending names a parent not registered before its child.
    pub fn finalize(&mut self) -> Result<(), TopologyError> {
        if self.finalized {
            return Err(TopologyError::Finalized);
        }
        if let Some(node) = self.nodes.iter().find(|node| !node.is_ready()) {
            let parent = node.pending_parent().unwrap_or_default();
            error!("clock {} names parent {} before it is registered", node.name, parent);
            return Err(TopologyError::ParentUnresolved {
                clock: node.name,
                parent,
            });
        }
        self.finalized = true;
        debug!("clock topology finalized with {} nodes", self.nodes.len());
        Ok(())
    }

    /// `true` once [`finalize`](Self::finalize) has succeeded.
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Id of the node called `name`.
    pub fn lookup(&self, name: &str) -> Result<ClockId, TopologyError> {
        self.index.get(name).copied().ok_or(TopologyError::UnknownClock)
    }

    /// Node `id`.
    pub fn node(&self, id: ClockId) -> Result<&ClockNode, TopologyError> {
        self.nodes.get(id.index()).ok_or(TopologyError::UnknownId(id.raw()))
    }

    /// Node called `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&ClockNode> {
        self.lookup(name).ok().and_then(|id| self.nodes.get(id.index()))
    }

    /// All nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ClockNode> {
        self.nodes.iter()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current rate of node `id`, derived from register contents.
    ///
    /// Nothing is cached: every divider and mux field on the path to the
    /// root is read again.
    pub fn rate<M: RegisterMap + ?Sized>(&self, regs: &M, id: ClockId) -> Result<Hertz, ClockError<M::Error>> {
        let node = self.node(id)?;
        if let Some(parent) = node.pending_parent() {
            trace!("clock {} not ready: {} unresolved", node.name, parent);
            return Err(ClockError::NotReady(node.name));
        }
        let parent_rate = |link: &Link| match link.id() {
            Some(parent) => self.rate(regs, parent),
            None => Err(ClockError::NotReady(node.name)),
        };

        match &node.kind {
            ClockKind::FixedRate { rate } => Ok(*rate),
            ClockKind::FixedFactor { parent, mult, div } => parent_rate(parent)?
                .scale(*mult, *div)
                .ok_or(ClockError::ZeroDivisor(node.name)),
            ClockKind::DividerTable { parent, field, table } => {
                let encoding = field.read(regs).map_err(ClockError::Register)?;
                let divisor = table.divisor(encoding).ok_or(ClockError::InvalidEncoding {
                    clock: node.name,
                    encoding,
                })?;
                parent_rate(parent)?
                    .scale(1, divisor)
                    .ok_or(ClockError::ZeroDivisor(node.name))
            }
            ClockKind::Mux { parents, field } => {
                let encoding = field.read(regs).map_err(ClockError::Register)?;
                let selected = usize::try_from(encoding)
                    .ok()
                    .and_then(|i| parents.get(i))
                    .ok_or(ClockError::InvalidEncoding {
                        clock: node.name,
                        encoding,
                    })?;
                parent_rate(selected)
            }
            ClockKind::Gate { parent: None, .. } => Ok(Hertz(0)),
            ClockKind::Gate {
                parent: Some(parent),
                ..
            }
            | ClockKind::BitGate { parent, .. } => parent_rate(parent),
        }
    }
}
