//! Per-reader state records and transition detection

use pcsc::State;

use crate::card::Card;

/// What a reader record carries between detection and emission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    /// No card was read for this transition
    #[default]
    Empty,
    /// The card read for this presence transition
    Card(Card),
}

/// State of one reader as tracked across waits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderRecord {
    name: String,
    current: State,
    event: State,
    current_count: u32,
    event_count: u32,
    payload: Payload,
}

impl ReaderRecord {
    /// Create a record the middleware has not reported on yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: State::UNAWARE,
            event: State::UNAWARE,
            current_count: 0,
            event_count: 0,
            payload: Payload::Empty,
        }
    }

    /// Reader name
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Flags the next wait compares against
    pub const fn current_state(&self) -> State {
        self.current
    }

    /// Flags reported by the most recent wait
    pub const fn event_state(&self) -> State {
        self.event
    }

    /// Record the flags a wait observed for this reader
    pub const fn set_event_state(&mut self, state: State) {
        self.event = state;
    }

    /// Card insertions and removals counted by the middleware, as of the
    /// current flags
    pub const fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Card insertions and removals counted by the middleware, as of the
    /// most recent wait
    pub const fn event_count(&self) -> u32 {
        self.event_count
    }

    /// Record the event count a wait observed for this reader
    pub const fn set_event_count(&mut self, count: u32) {
        self.event_count = count;
    }

    /// Card read for this transition, if any
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether the last wait reported something other than the baseline
    ///
    /// A moved event count counts as a change even when the flags match,
    /// e.g. a card pulled and put back between two waits.
    pub fn has_changed(&self) -> bool {
        self.event != self.current || self.event_count != self.current_count
    }

    /// Whether the last wait reported a card that was not there before
    pub fn is_presence_transition(&self) -> bool {
        self.event.contains(State::PRESENT) && !self.current.contains(State::PRESENT)
    }

    pub(crate) fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    pub(crate) fn take_payload(&mut self) -> Payload {
        std::mem::take(&mut self.payload)
    }

    /// Adopt the observed flags as the new baseline and drop the payload
    pub(crate) fn settle(&mut self) {
        self.current = self.event;
        self.current_count = self.event_count;
        self.payload = Payload::Empty;
    }
}

/// Ordered reader records, one per reader name
#[derive(Debug, Clone, Default)]
pub(crate) struct ReaderStateTable {
    records: Vec<ReaderRecord>,
}

impl ReaderStateTable {
    /// Create a table mirroring the reader order
    pub(crate) fn new<S: AsRef<str>>(readers: &[S]) -> Self {
        Self {
            records: readers
                .iter()
                .map(|name| ReaderRecord::new(name.as_ref()))
                .collect(),
        }
    }

    pub(crate) fn records_mut(&mut self) -> &mut [ReaderRecord] {
        &mut self.records
    }

    #[cfg(test)]
    pub(crate) fn records(&self) -> &[ReaderRecord] {
        &self.records
    }
}
