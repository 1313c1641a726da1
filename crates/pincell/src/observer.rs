//! Change observation over a render tree.
//!
//! An [`Observer`] watches one node for attribute, child-list or text
//! mutations (optionally anywhere in its subtree) and hands the matching
//! records to a [`Reaction`], which re-applies some invariant to the tree.
//! Reactions may mutate the tree themselves; [`ObserverSet::settle`] keeps
//! delivering until the tree is quiet or the pass bound is hit.

use pincell_host::{MutationRecord, NodeId, RenderTree, TreeError};

/// Which mutations an observer cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub attributes: bool,
    pub child_list: bool,
    pub text: bool,
    /// Also match mutations on descendants of the target.
    pub subtree: bool,
    /// Restrict attribute records to these names. Empty means all.
    pub attribute_filter: Vec<String>,
}

impl ObserveOptions {
    pub fn attributes(names: &[&str]) -> Self {
        Self {
            attributes: true,
            attribute_filter: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Default::default()
        }
    }

    fn wants(&self, record: &MutationRecord) -> bool {
        match record {
            MutationRecord::Attribute { name, .. } => {
                self.attributes
                    && (self.attribute_filter.is_empty()
                        || self.attribute_filter.iter().any(|f| f == name))
            }
            MutationRecord::ChildList { .. } => self.child_list,
            MutationRecord::Text { .. } => self.text,
        }
    }
}

/// A rule re-applied whenever its observer sees matching mutations.
pub trait Reaction: Send {
    fn react(&mut self, tree: &mut RenderTree, records: &[MutationRecord])
        -> Result<(), TreeError>;
}

pub struct Observer {
    name: &'static str,
    target: NodeId,
    options: ObserveOptions,
    reaction: Box<dyn Reaction>,
    connected: bool,
}

impl Observer {
    pub fn new(
        name: &'static str,
        target: NodeId,
        options: ObserveOptions,
        reaction: impl Reaction + 'static,
    ) -> Self {
        Self {
            name,
            target,
            options,
            reaction: Box::new(reaction),
            connected: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    fn select(&self, tree: &RenderTree, records: &[MutationRecord]) -> Vec<MutationRecord> {
        records
            .iter()
            .filter(|r| self.options.wants(r))
            .filter(|r| {
                let target = r.target();
                target == self.target
                    || (self.options.subtree && tree.is_ancestor_or_self(self.target, target))
            })
            .cloned()
            .collect()
    }
}

/// All observers attached to one tree.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Observer>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn connected(&self) -> usize {
        self.observers.iter().filter(|o| o.connected).count()
    }

    pub fn disconnect_all(&mut self) {
        for observer in &mut self.observers {
            observer.disconnect();
        }
    }

    /// Deliver one batch of pending mutations. Returns how many records were
    /// taken from the tree.
    ///
    /// An observer whose target has died is disconnected instead of invoked.
    pub fn deliver(&mut self, tree: &mut RenderTree) -> Result<usize, TreeError> {
        let records = tree.take_mutations();
        if records.is_empty() {
            return Ok(0);
        }
        for observer in self.observers.iter_mut().filter(|o| o.connected) {
            if !tree.is_alive(observer.target) {
                tracing::debug!(observer = observer.name, "observer target gone, disconnecting");
                observer.disconnect();
                continue;
            }
            let selected = observer.select(tree, &records);
            if !selected.is_empty() {
                observer.reaction.react(tree, &selected)?;
            }
        }
        Ok(records.len())
    }

    /// Deliver until the tree has no pending mutations, at most `max_passes`
    /// times. Returns the number of passes that delivered records.
    ///
    /// Hitting the bound leaves the remaining records queued for the next
    /// settle.
    pub fn settle(&mut self, tree: &mut RenderTree, max_passes: usize) -> Result<usize, TreeError> {
        let mut passes = 0;
        while tree.has_pending_mutations() {
            if passes == max_passes {
                tracing::warn!(
                    passes,
                    "observers did not settle, deferring remaining mutations"
                );
                break;
            }
            self.deliver(tree)?;
            passes += 1;
        }
        Ok(passes)
    }
}
