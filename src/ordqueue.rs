use crate::error::CatResult;
use crossbeam_channel::{Receiver, Sender};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::iter::FusedIterator;

/// Sending half. Items may be pushed in any order from any number of clones.
pub(crate) struct OrdQueue<T> {
    sender: Sender<Indexed<T>>,
}

impl<T> Clone for OrdQueue<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

/// Yields items strictly by index, starting at 0, buffering any that arrive early.
///
/// Ends when all senders are gone and the next index can't be produced.
pub(crate) struct OrdQueueIter<T> {
    receiver: Receiver<Indexed<T>>,
    next_index: usize,
    early: BinaryHeap<Reverse<Indexed<T>>>,
}

pub(crate) fn new<T>(depth: usize) -> (OrdQueue<T>, OrdQueueIter<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(depth);
    (OrdQueue { sender }, OrdQueueIter {
        receiver,
        next_index: 0,
        early: BinaryHeap::new(),
    })
}

impl<T: Send> OrdQueue<T> {
    #[inline]
    pub fn push(&self, index: usize, item: T) -> CatResult<()> {
        self.sender.send(Indexed(index, item))?;
        Ok(())
    }
}

impl<T> OrdQueueIter<T> {
    /// How many items have been yielded so far
    #[inline]
    pub fn yielded(&self) -> usize {
        self.next_index
    }

    #[inline]
    fn is_next_buffered(&self) -> bool {
        self.early.peek().map(|Reverse(item)| item.0) == Some(self.next_index)
    }
}

impl<T> FusedIterator for OrdQueueIter<T> {}

impl<T> Iterator for OrdQueueIter<T> {
    type Item = T;

    #[inline(never)]
    fn next(&mut self) -> Option<T> {
        while !self.is_next_buffered() {
            match self.receiver.recv() {
                Ok(item) => self.early.push(Reverse(item)),
                // a gap can't be filled any more
                Err(_) => return None,
            }
        }
        let Reverse(Indexed(_, item)) = self.early.pop()?;
        self.next_index += 1;
        Some(item)
    }
}

struct Indexed<T>(usize, T);

impl<T> PartialEq for Indexed<T> {
    #[inline]
    fn eq(&self, o: &Self) -> bool { self.0 == o.0 }
}
impl<T> Eq for Indexed<T> {}
impl<T> PartialOrd for Indexed<T> {
    #[inline]
    fn partial_cmp(&self, o: &Self) -> Option<Ordering> { Some(self.cmp(o)) }
}
impl<T> Ord for Indexed<T> {
    #[inline]
    fn cmp(&self, o: &Self) -> Ordering { self.0.cmp(&o.0) }
}
