//! Ping-pong storage for simulation state.
//!
//! A [`DoubleBuffer`] owns both halves of the pair and a single role index,
//! so the readable and writable halves can never refer to the same value.
//! A program execution reads [`readable`](DoubleBuffer::readable), writes
//! [`writable`](DoubleBuffer::writable), then calls
//! [`swap`](DoubleBuffer::swap) to publish the result.

/// Which half of the pair a value occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Two equally-shaped values with a readable/writable role flip.
#[derive(Debug)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    read: Slot,
    swaps: u64,
}

impl<T> DoubleBuffer<T> {
    /// Create a pair. `a` starts out readable.
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            read: Slot::A,
            swaps: 0,
        }
    }

    /// The value holding the last fully computed state.
    #[inline]
    pub fn readable(&self) -> &T {
        &self.slots[self.read.index()]
    }

    /// The target of the next program execution.
    #[inline]
    pub fn writable(&self) -> &T {
        &self.slots[self.read.other().index()]
    }

    /// Mutable access to the write target.
    #[inline]
    pub fn writable_mut(&mut self) -> &mut T {
        &mut self.slots[self.read.other().index()]
    }

    /// Borrow both halves at once: `(readable, writable)`.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.slots;
        match self.read {
            Slot::A => (&*a, b),
            Slot::B => (&*b, a),
        }
    }

    /// Flip the roles.
    #[inline]
    pub fn swap(&mut self) {
        self.read = self.read.other();
        self.swaps += 1;
    }

    /// Slot currently holding the readable value.
    #[inline]
    pub fn readable_slot(&self) -> Slot {
        self.read
    }

    /// Slot currently holding the writable value.
    #[inline]
    pub fn writable_slot(&self) -> Slot {
        self.read.other()
    }

    /// Number of swaps since creation.
    #[inline]
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Access a half by slot regardless of its role.
    pub fn get(&self, slot: Slot) -> &T {
        &self.slots[slot.index()]
    }
}
