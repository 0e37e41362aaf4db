/// Outbound packet counter for one direction of one connection.
///
/// The counter starts at zero and pre-increments, so the first packet sent
/// carries sequence number `1`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SequenceCounter {
    last: u64,
}

impl SequenceCounter {
    /// Creates a counter that has not issued any numbers yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Advances the counter and returns the new value.
    pub const fn next(&mut self) -> u64 {
        self.last = self.last.wrapping_add(1);
        self.last
    }

    /// Most recently issued number, or zero before the first call to
    /// [`Self::next`].
    #[must_use]
    pub const fn last(&self) -> u64 {
        self.last
    }
}
