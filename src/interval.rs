/*
Interval counter for cycle accounting.

A bank or rank spends stretches of time in a boolean state (active, powered
down, self-refreshing).  The interval counter tracks the total number of
cycles spent in that state without storing per-cycle history: opening an
interval records the start timestamp, closing it folds the elapsed cycles
into a running sum.  Every operation is O(1).

`count_at` lets a query at time T read the total as if the currently open
interval were closed at T, without actually mutating the counter.
*/

/// Simulation timestamps are clock-cycle counts.
pub type Cycle = u64;

#[derive(Debug, Default, Clone)]
pub struct IntervalCounter {
    count: Cycle,
    start: Option<Cycle>,
    end: Option<Cycle>,
}

impl IntervalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    // Start of the most recent interval.  Zero if none was ever opened.
    pub fn start_time(&self) -> Cycle {
        self.start.unwrap_or(0)
    }

    pub fn end_time(&self) -> Cycle {
        self.end.unwrap_or(0)
    }

    // Cycles accumulated by closed intervals only.
    pub fn count(&self) -> Cycle {
        self.count
    }

    // Accumulated cycles as observed at `timestamp`, counting a still-open
    // interval up to that point.
    pub fn count_at(&self, timestamp: Cycle) -> Cycle {
        if self.is_open() && timestamp > self.start_time() {
            return self.count + timestamp - self.start_time();
        }
        self.count
    }

    pub fn start_interval(&mut self, start: Cycle) {
        debug_assert!(!self.is_open(), "interval restarted while open");
        self.start = Some(start);
        self.end = None;
    }

    pub fn start_interval_if_not_running(&mut self, start: Cycle) {
        if !self.is_open() {
            self.start_interval(start);
        }
    }

    // Closes the open interval and returns its length.  Closing a counter
    // with no open interval is a no-op returning zero; refresh follow-ups
    // and power-down transitions rely on that.
    pub fn close_interval(&mut self, timestamp: Cycle) -> Cycle {
        if !self.is_open() {
            return 0;
        }
        let start = self.start_time();
        debug_assert!(timestamp >= start, "interval closed before its start");
        self.end = Some(timestamp);
        let diff = timestamp - start;
        self.count += diff;
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_intervals_accumulate() {
        let mut counter = IntervalCounter::new();
        counter.start_interval(10);
        assert_eq!(5, counter.close_interval(15));
        counter.start_interval(20);
        assert_eq!(10, counter.close_interval(30));
        assert_eq!(15, counter.count());
    }

    #[test]
    fn count_at_extends_open_interval() {
        let mut counter = IntervalCounter::new();
        counter.start_interval(10);
        assert_eq!(30, counter.count_at(40));
        // reading must not mutate
        assert_eq!(0, counter.count());
        counter.close_interval(25);
        assert_eq!(15, counter.count_at(40));
    }

    #[test]
    fn count_at_before_start_returns_closed_total() {
        let mut counter = IntervalCounter::new();
        counter.start_interval(4);
        counter.close_interval(9);
        counter.start_interval(100);
        assert_eq!(5, counter.count_at(50));
    }

    #[test]
    fn closing_when_not_open_is_a_noop() {
        let mut counter = IntervalCounter::new();
        assert_eq!(0, counter.close_interval(8));
        assert_eq!(0, counter.count());
    }

    #[test]
    fn start_if_not_running_keeps_open_interval() {
        let mut counter = IntervalCounter::new();
        counter.start_interval(5);
        counter.start_interval_if_not_running(12);
        assert_eq!(5, counter.start_time());
    }
}
