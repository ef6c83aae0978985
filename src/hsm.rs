//! Hierarchical state machine engine.
//!
//! The classic function-pointer state table, extended with a parent
//! relation so states nest:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌─────────┬────────┬─────────┬──────────┬─────────┬────────┐  │
//! │  │ StateId │ parent │ initial │ on_enter │ on_exit │ handle │  │
//! │  ├─────────┼────────┼─────────┼──────────┼─────────┼────────┤  │
//! │  │ Root    │  -     │ Stopped │ fn(ctx)  │ fn(ctx) │ fn(..) │  │
//! │  │ Stopped │ Root   │  -      │ ...      │ ...     │ ...    │  │
//! │  │ Started │ Root   │ Off     │ ...      │ ...     │ ...    │  │
//! │  └─────────┴────────┴─────────┴──────────┴─────────┴────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dispatch starts at the current leaf and bubbles unhandled events up
//! the parent chain; an event unhandled at the root is silently
//! discarded. A transition exits from the current leaf up to (excluding)
//! the lowest common ancestor with the target, enters down to the
//! target, then drills through default children (init pseudo-states)
//! until a resting state is reached. Entry/exit/init never appear as
//! queued events; the engine synthesizes them as direct calls on the
//! table's action functions.
//!
//! History: whenever a subtree is exited the engine records the leaf
//! that was active in every exited composite; `TransitionToHistory`
//! restores it. The parent relation is validated at construction: a
//! malformed table is a defect, reported as [`Error::StateTable`] before
//! the machine ever runs.

use log::{info, trace};

use crate::active::Outbox;
use crate::error::{Error, Result};
use crate::event::Event;

/// Deepest supported nesting.
pub const MAX_DEPTH: usize = 8;

/// Identity of a state within one component's tree.
///
/// Implementors are small `Copy` enums; `index` maps a state to its row
/// in the table and must be a bijection onto `0..COUNT`.
pub trait StateId: Copy + Eq + core::fmt::Debug + 'static {
    /// Total number of states; sizes the table array.
    const COUNT: usize;

    /// Row index of this state.
    fn index(self) -> usize;
}

/// Signature for entry and exit actions. Run exactly once per crossing.
pub type ActionFn<C> = fn(&mut C, &mut Outbox);

/// Signature for the event handler of one state.
pub type EventFn<C, S> = fn(&mut C, &Event, &mut Outbox) -> Response<S>;

/// What a state handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<S> {
    /// Consumed; dispatch stops here.
    Handled,
    /// Not consumed; the engine offers the event to the parent state.
    Unhandled,
    /// Consumed, and the machine transitions to the named target.
    /// Naming the current leaf performs an explicit exit + re-entry.
    Transition(S),
    /// Consumed; restore the remembered leaf of the named composite
    /// (falling back to its init chain if no history was recorded).
    TransitionToHistory(S),
}

/// Static descriptor for a single state, one row in the table.
/// Stored in a fixed-size array; no heap, no `dyn`.
pub struct StateDescriptor<C, S> {
    pub id: S,
    pub name: &'static str,
    /// Superstate, or `None` for the root.
    pub parent: Option<S>,
    /// Default child entered when this state is the transition target
    /// (init pseudo-state). `None` makes this a resting state.
    pub initial: Option<S>,
    pub on_enter: Option<ActionFn<C>>,
    pub on_exit: Option<ActionFn<C>>,
    pub on_event: EventFn<C, S>,
}

/// The hierarchical state machine engine for one component.
///
/// Owns the state table and the current/history pointers; the mutable
/// context `C` is threaded through every handler call.
pub struct Hsm<C, S: StateId, const N: usize> {
    name: &'static str,
    table: [StateDescriptor<C, S>; N],
    current: usize,
    root: usize,
    /// Last active leaf per composite, recorded on subtree exit.
    history: [Option<usize>; N],
}

impl<C, S: StateId, const N: usize> Hsm<C, S, N> {
    /// Construct and consistency-check the machine. The current state is
    /// the root until [`Hsm::init`] runs the initial transition.
    pub fn new(name: &'static str, table: [StateDescriptor<C, S>; N]) -> Result<Self> {
        if N != S::COUNT {
            return Err(Error::StateTable("table size does not match state count"));
        }
        let mut root = None;
        for (i, desc) in table.iter().enumerate() {
            if desc.id.index() != i {
                return Err(Error::StateTable("state id does not match its row index"));
            }
            match desc.parent {
                None => {
                    if root.is_some() {
                        return Err(Error::StateTable("more than one root state"));
                    }
                    root = Some(i);
                }
                Some(p) => {
                    if p.index() >= N {
                        return Err(Error::StateTable("parent index out of range"));
                    }
                    if p.index() == i {
                        return Err(Error::StateTable("state is its own parent"));
                    }
                }
            }
            if let Some(child) = desc.initial {
                if child.index() >= N {
                    return Err(Error::StateTable("initial child index out of range"));
                }
                match table[child.index()].parent {
                    Some(p) if p.index() == i => {}
                    _ => return Err(Error::StateTable("initial child is not a direct child")),
                }
            }
        }
        let root = root.ok_or(Error::StateTable("no root state"))?;
        // Every parent chain must reach the root, within the depth bound
        // that sizes the transition path buffers.
        for i in 0..N {
            let mut steps = 0;
            let mut at = i;
            while let Some(p) = table[at].parent {
                at = p.index();
                steps += 1;
                if steps > N {
                    return Err(Error::StateTable("parent relation contains a cycle"));
                }
            }
            if at != root {
                return Err(Error::StateTable("state not connected to the root"));
            }
            if steps >= MAX_DEPTH {
                return Err(Error::StateTable("state nesting exceeds the depth bound"));
            }
        }
        Ok(Self { name, table, current: root, root, history: [None; N] })
    }

    /// Run the initial transition: enter the root, then drill through
    /// default children to the initial leaf. Call once before the first
    /// `dispatch`.
    pub fn init(&mut self, ctx: &mut C, outbox: &mut Outbox) {
        self.current = self.root;
        self.enter(self.root, ctx, outbox);
        self.drill_initial(ctx, outbox);
        info!("{}: started in {}", self.name, self.state_name(self.current));
    }

    /// The current leaf state.
    pub fn state(&self) -> S {
        self.table[self.current].id
    }

    /// `true` if the current leaf is `s` or lies inside `s`'s subtree.
    pub fn state_in(&self, s: S) -> bool {
        let target = s.index();
        let mut at = self.current;
        loop {
            if at == target {
                return true;
            }
            match self.table[at].parent {
                Some(p) => at = p.index(),
                None => return false,
            }
        }
    }

    /// Dispatch one event against the current state, bubbling unhandled
    /// events toward the root. Returns whether any state consumed it.
    pub fn dispatch(&mut self, ctx: &mut C, event: &Event, outbox: &mut Outbox) -> bool {
        let mut level = self.current;
        loop {
            match (self.table[level].on_event)(ctx, event, outbox) {
                Response::Handled => return true,
                Response::Transition(target) => {
                    self.transition(target.index(), ctx, outbox);
                    return true;
                }
                Response::TransitionToHistory(composite) => {
                    let leaf = self.history[composite.index()].unwrap_or(composite.index());
                    self.transition(leaf, ctx, outbox);
                    return true;
                }
                Response::Unhandled => match self.table[level].parent {
                    Some(p) => level = p.index(),
                    None => {
                        trace!(
                            "{}: {:?} unhandled in {}, discarded",
                            self.name,
                            event.signal,
                            self.state_name(self.current)
                        );
                        return false;
                    }
                },
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn state_name(&self, idx: usize) -> &'static str {
        self.table[idx].name
    }

    fn enter(&mut self, idx: usize, ctx: &mut C, outbox: &mut Outbox) {
        trace!("{}: enter {}", self.name, self.state_name(idx));
        if let Some(enter) = self.table[idx].on_enter {
            enter(ctx, outbox);
        }
    }

    fn exit(&mut self, idx: usize, ctx: &mut C, outbox: &mut Outbox) {
        trace!("{}: exit {}", self.name, self.state_name(idx));
        if let Some(exit) = self.table[idx].on_exit {
            exit(ctx, outbox);
        }
    }

    /// Ancestors of `idx`, starting with `idx` itself, ending at the root.
    fn path_to_root(&self, idx: usize) -> heapless::Vec<usize, MAX_DEPTH> {
        let mut path = heapless::Vec::new();
        let mut at = idx;
        loop {
            // Depth bound is validated at construction.
            path.push(at).ok();
            match self.table[at].parent {
                Some(p) => at = p.index(),
                None => return path,
            }
        }
    }

    fn transition(&mut self, target: usize, ctx: &mut C, outbox: &mut Outbox) {
        let source = self.current;
        info!(
            "{}: {} -> {}",
            self.name,
            self.state_name(source),
            self.state_name(target)
        );

        if source == target {
            // Explicit re-entry of the current leaf.
            self.history[source] = Some(source);
            self.exit(source, ctx, outbox);
            self.enter(source, ctx, outbox);
        } else {
            let src_path = self.path_to_root(source);
            let tgt_path = self.path_to_root(target);
            // Lowest common ancestor: first state on the source chain
            // that also lies on the target chain.
            let lca = *src_path
                .iter()
                .find(|s| tgt_path.contains(s))
                .unwrap_or(&self.root);

            // Exit from the leaf up to (excluding) the LCA, writing the
            // history marker of every exited state.
            for &s in src_path.iter().take_while(|&&s| s != lca) {
                self.exit(s, ctx, outbox);
                self.history[s] = Some(source);
            }
            // Enter from below the LCA down to the target. The LCA is
            // always on the target chain (it falls back to the root).
            let cut = tgt_path.iter().position(|&s| s == lca).unwrap_or(tgt_path.len());
            for &s in tgt_path[..cut].iter().rev() {
                self.enter(s, ctx, outbox);
            }
            self.current = target;
        }

        self.drill_initial(ctx, outbox);
    }

    /// Follow default children from the current state to a resting leaf.
    fn drill_initial(&mut self, ctx: &mut C, outbox: &mut Outbox) {
        while let Some(child) = self.table[self.current].initial {
            let idx = child.index();
            self.enter(idx, ctx, outbox);
            self.current = idx;
        }
    }
}
