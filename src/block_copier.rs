//! Resumable copy of a length-prefixed run of bytes.
//!
//! Both metadata scanners know the size of a segment or chunk before they see
//! its body, but the body may be split over any number of `consume` calls.
//! [`PendingCopy`] keeps the bookkeeping for such a copy in the scanner's
//! persistent state so each call picks up at the next unconsumed byte.

/// Bookkeeping for a copy that may span several input slices.
///
/// `copied + remaining` always equals the size passed to [`PendingCopy::new`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PendingCopy {
    copied: usize,
    remaining: usize,
}

impl PendingCopy {
    pub fn new(size: usize) -> Self {
        Self {
            copied: 0,
            remaining: size,
        }
    }

    pub fn copied(&self) -> usize {
        self.copied
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Appends as much of the pending run as `input[*cursor..]` holds to
    /// `dest` and advances `cursor` past the copied bytes.
    ///
    /// Returns `complete` when the run is fully copied (the bookkeeping is
    /// reset) and `continuation` when the input ran out first.
    pub fn copy_block<S>(
        &mut self,
        dest: &mut Vec<u8>,
        input: &[u8],
        cursor: &mut usize,
        complete: S,
        continuation: S,
    ) -> S {
        let count = self.take(input.len() - *cursor);
        dest.extend_from_slice(&input[*cursor..*cursor + count]);
        self.finish_step(cursor, count, complete, continuation)
    }

    /// Same as [`PendingCopy::copy_block`] for a fixed size destination.
    /// Bytes land at `dest[copied..]`.
    pub fn copy_into<S>(
        &mut self,
        dest: &mut [u8],
        input: &[u8],
        cursor: &mut usize,
        complete: S,
        continuation: S,
    ) -> S {
        let count = self.take(input.len() - *cursor);
        let start = self.copied;
        dest[start..start + count].copy_from_slice(&input[*cursor..*cursor + count]);
        self.finish_step(cursor, count, complete, continuation)
    }

    /// Discards the pending run instead of copying it.
    pub fn skip<S>(&mut self, input: &[u8], cursor: &mut usize, complete: S, continuation: S) -> S {
        let count = self.take(input.len() - *cursor);
        self.finish_step(cursor, count, complete, continuation)
    }

    fn take(&self, available: usize) -> usize {
        self.remaining.min(available)
    }

    fn finish_step<S>(&mut self, cursor: &mut usize, count: usize, complete: S, continuation: S) -> S {
        *cursor += count;
        self.copied += count;
        self.remaining -= count;
        if self.remaining == 0 {
            *self = Self::default();
            complete
        } else {
            continuation
        }
    }
}
