//! Ready/valid streaming handshake
//!
//! A word moves across a channel only on a step where the sender presents it
//! (`valid`) and the receiver accepts it (`ready`).  Once presented, a word
//! stays presented, unchanged, until it transfers.
//!
//! [`Producer`] and [`Consumer`] are host-side endpoints used to drive the
//! coprocessor; [`Monitor`] checks a channel for handshake violations.

/// One word on a channel, with its end-of-transfer marker
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Beat {
    /// Payload
    pub data: u32,
    /// Set on the final word of a transfer
    pub last: bool,
}

impl Beat {
    /// Builds a new beat
    pub const fn new(data: u32, last: bool) -> Self {
        Self { data, last }
    }
}

/// Evaluates the handshake for a single step
///
/// Returns the beat which transfers, i.e. `valid` if `ready` is set.
#[inline]
pub fn transfer(valid: Option<Beat>, ready: bool) -> Option<Beat> {
    valid.filter(|_| ready)
}

/// Host-side sender for a sequence of words
///
/// The end-of-transfer marker is placed on the final word, unless overridden
/// with [`Producer::with_marker`].
#[derive(Clone, Debug)]
pub struct Producer {
    words: Vec<u32>,
    marker: Option<usize>,
    pos: usize,
    presenting: bool,
}

impl Producer {
    /// Builds a producer which sends `words` as one transfer
    pub fn new(words: Vec<u32>) -> Self {
        let marker = words.len().checked_sub(1);
        Self::with_marker(words, marker)
    }

    /// Builds a producer with the end marker on an arbitrary word (or none)
    pub fn with_marker(words: Vec<u32>, marker: Option<usize>) -> Self {
        Self {
            words,
            marker,
            pos: 0,
            presenting: false,
        }
    }

    /// Returns the beat presented on this step, if any
    pub fn valid(&self) -> Option<Beat> {
        if self.presenting {
            self.words
                .get(self.pos)
                .map(|w| Beat::new(*w, self.marker == Some(self.pos)))
        } else {
            None
        }
    }

    /// Completes a step
    ///
    /// `ready` is the receiver's ready signal for this step.  If no beat is
    /// presented afterwards, `offer` decides whether the next word is
    /// presented on the following step; it has no effect on a beat which is
    /// already presented.
    pub fn step(&mut self, ready: bool, offer: bool) -> Option<Beat> {
        let out = transfer(self.valid(), ready);
        if out.is_some() {
            self.pos += 1;
            self.presenting = false;
        }
        if !self.presenting {
            self.presenting = offer && self.pos < self.words.len();
        }
        out
    }

    /// Checks whether every word has been sent
    pub fn is_done(&self) -> bool {
        self.pos >= self.words.len()
    }

    /// Number of words sent so far
    pub fn sent(&self) -> usize {
        self.pos
    }
}

/// Host-side receiver, collecting words and transfer boundaries
#[derive(Clone, Debug, Default)]
pub struct Consumer {
    words: Vec<u32>,
    ends: Vec<usize>,
}

impl Consumer {
    /// Builds an empty consumer
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transferred beat
    pub fn accept(&mut self, beat: Beat) {
        self.words.push(beat.data);
        if beat.last {
            self.ends.push(self.words.len());
        }
    }

    /// Records any number of transferred beats
    pub fn accept_all(&mut self, beats: impl IntoIterator<Item = Beat>) {
        for b in beats {
            self.accept(b);
        }
    }

    /// Returns every word received so far
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Returns the word count at the end of each completed transfer
    pub fn ends(&self) -> &[usize] {
        &self.ends
    }

    /// Number of completed transfers
    pub fn transfers(&self) -> usize {
        self.ends.len()
    }
}

/// Watches one channel for handshake violations
///
/// A violation is a presented beat that is retracted or modified before it
/// transfers.
#[derive(Clone, Debug, Default)]
pub struct Monitor {
    pending: Option<Beat>,
    violations: usize,
}

impl Monitor {
    /// Builds a new monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes the channel signals for one step, returning the transfer
    pub fn observe(
        &mut self,
        valid: Option<Beat>,
        ready: bool,
    ) -> Option<Beat> {
        if let Some(p) = self.pending {
            if valid != Some(p) {
                log::warn!("beat {p:?} changed to {valid:?} before transfer");
                self.violations += 1;
            }
        }
        let out = transfer(valid, ready);
        self.pending = if out.is_some() { None } else { valid };
        out
    }

    /// Number of violations seen so far
    pub fn violations(&self) -> usize {
        self.violations
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transfer() {
        let b = Beat::new(7, true);
        assert_eq!(transfer(Some(b), true), Some(b));
        assert_eq!(transfer(Some(b), false), None);
        assert_eq!(transfer(None, true), None);
    }

    #[test]
    fn test_producer() {
        let mut p = Producer::new(vec![1, 2, 3]);
        assert_eq!(p.valid(), None);
        assert_eq!(p.step(true, true), None);
        assert_eq!(p.valid(), Some(Beat::new(1, false)));

        // Held while the receiver isn't ready, even if offer is unset
        assert_eq!(p.step(false, false), None);
        assert_eq!(p.valid(), Some(Beat::new(1, false)));

        assert_eq!(p.step(true, true), Some(Beat::new(1, false)));
        assert_eq!(p.step(true, false), Some(Beat::new(2, false)));
        assert_eq!(p.valid(), None);
        assert_eq!(p.step(true, true), None);
        assert_eq!(p.step(true, true), Some(Beat::new(3, true)));
        assert!(p.is_done());
        assert_eq!(p.sent(), 3);
        assert_eq!(p.valid(), None);
    }

    #[test]
    fn test_producer_marker() {
        let mut p = Producer::with_marker(vec![1, 2, 3], Some(1));
        let mut c = Consumer::new();
        while !p.is_done() {
            if let Some(b) = p.step(true, true) {
                c.accept(b);
            }
        }
        assert_eq!(c.words(), &[1, 2, 3]);
        assert_eq!(c.ends(), &[2]);

        let p = Producer::new(vec![]);
        assert!(p.is_done());
    }

    #[test]
    fn test_monitor() {
        let a = Beat::new(1, false);
        let b = Beat::new(2, false);
        let mut m = Monitor::new();
        assert_eq!(m.observe(Some(a), false), None);
        assert_eq!(m.observe(Some(a), true), Some(a));
        assert_eq!(m.observe(None, true), None);
        assert_eq!(m.violations(), 0);

        m.observe(Some(a), false);
        m.observe(Some(b), false);
        assert_eq!(m.violations(), 1);
        m.observe(None, false);
        assert_eq!(m.violations(), 2);
    }
}
