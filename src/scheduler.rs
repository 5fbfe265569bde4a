/*
Deferred-command scheduler.

Several DRAM transitions only take effect some cycles after the command that
caused them: the implicit precharge a fixed delay after RDA/WRA, the
bank close at refresh end, the deferred power-down entry once every bank
satisfies its minimum timing.  Handlers express these as continuations
scheduled at a future timestamp; before any state is read, the queue is
drained up to the query time so reads never observe state older than
everything knowable at that point.

Entries are ordered by (due, sequence) where the sequence number is assigned
at insertion, so entries sharing a due time execute in FIFO order.  A
continuation may schedule further continuations; the drain loop re-examines
the queue head after every pop until no eligible entry remains.
*/

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::interval::Cycle;

pub type Continuation<S> = Box<dyn FnOnce(&mut S, &mut ImplicitCommandQueue<S>)>;

struct Entry<S> {
    due: Cycle,
    seq: u64,
    run: Continuation<S>,
}

// BinaryHeap is a max-heap; reverse the ordering to pop the earliest
// (due, seq) first.
impl<S> Ord for Entry<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl<S> PartialOrd for Entry<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> PartialEq for Entry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<S> Eq for Entry<S> {}

pub struct ImplicitCommandQueue<S> {
    heap: BinaryHeap<Entry<S>>,
    next_seq: u64,
    drained_to: Cycle,
}

impl<S> ImplicitCommandQueue<S> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            drained_to: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    // Furthest timestamp already drained.  Scheduling behind it would imply
    // retroactive state mutation.
    pub fn drained_to(&self) -> Cycle {
        self.drained_to
    }

    pub fn add_implicit_command<F>(&mut self, due: Cycle, run: F)
    where
        F: FnOnce(&mut S, &mut ImplicitCommandQueue<S>) + 'static,
    {
        assert!(
            due >= self.drained_to,
            "implicit command due at {} scheduled behind drain point {}",
            due,
            self.drained_to
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            due,
            seq,
            run: Box::new(run),
        });
    }

    /// Executes every entry due at or before `timestamp` against `state`, in
    /// (due, seq) order.  Returns the due time of the last entry executed.
    pub fn drain_up_to(&mut self, timestamp: Cycle, state: &mut S) -> Option<Cycle> {
        let mut last_due = None;
        while let Some(entry) = self.pop_due(timestamp) {
            self.drained_to = entry.due;
            last_due = Some(entry.due);
            (entry.run)(state, self);
        }
        self.drained_to = self.drained_to.max(timestamp);
        last_due
    }

    fn pop_due(&mut self, timestamp: Cycle) -> Option<Entry<S>> {
        if self.heap.peek()?.due <= timestamp {
            return self.heap.pop();
        }
        None
    }
}

impl<S> Default for ImplicitCommandQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}
