//! Frame scheduling with generation-based cancellation.
//!
//! Every scheduled frame carries a [`FrameTicket`] stamped with the
//! scheduler's generation. [`FrameScheduler::stop`] bumps the generation, so
//! any ticket issued before it is rejected by [`FrameScheduler::accepts`]
//! when its frame eventually fires. A restarted loop never revives tickets
//! from an earlier run.

/// Handle for one pending frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
    frame: u64,
}

impl FrameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sequence number of this frame within its generation.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Issues and validates frame tickets.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    generation: u64,
    running: bool,
    issued: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return its first ticket.
    pub fn start(&mut self) -> FrameTicket {
        self.generation += 1;
        self.running = true;
        self.issued = 0;
        self.next_ticket()
    }

    /// Stop the loop. Outstanding tickets become stale.
    pub fn stop(&mut self) {
        if self.running {
            self.generation += 1;
            self.running = false;
        }
    }

    /// Ticket for the next frame of the current generation.
    pub fn next_ticket(&mut self) -> FrameTicket {
        let ticket = FrameTicket {
            generation: self.generation,
            frame: self.issued,
        };
        self.issued += 1;
        ticket
    }

    /// Whether a frame holding `ticket` may run.
    pub fn accepts(&self, ticket: FrameTicket) -> bool {
        self.running && ticket.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
