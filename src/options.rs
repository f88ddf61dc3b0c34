//! Caller-tunable limits for deriving values from captured blocks.

use crate::constants::{DEFAULT_INFLATE_STEP, DEFAULT_MAXIMUM_ICC_SIZE};

/// Resource limits applied when a colour profile is synthesized.
///
/// The scanners themselves only ever hold the blocks the stream declares;
/// these limits bound the work done afterwards, chiefly the inflation of a
/// compressed PNG iCCP profile.
///
/// ```
/// use metastream_rs::ReaderOptions;
///
/// let options = ReaderOptions::default().with_max_icc_size(4 * 1024 * 1024);
/// assert_eq!(options.max_icc_size, 4 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Initial size of the inflate output buffer. The buffer doubles every
    /// time it fills up.
    pub inflate_step: usize,
    /// Hard ceiling on the inflated ICC profile size. Larger profiles are
    /// rejected.
    pub max_icc_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            inflate_step: DEFAULT_INFLATE_STEP,
            max_icc_size: DEFAULT_MAXIMUM_ICC_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn with_inflate_step(mut self, bytes: usize) -> Self {
        self.inflate_step = bytes.max(1);
        self
    }

    pub fn with_max_icc_size(mut self, bytes: usize) -> Self {
        self.max_icc_size = bytes;
        self
    }
}
