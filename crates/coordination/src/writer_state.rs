use cadence_core::Time;
use std::collections::BTreeMap;

/// Outstanding work of one local writer
///
/// Initiated times are kept as a counting multiset so duplicate scheduled
/// start times are tracked independently. The writer's completion time is
/// the predecessor of the smallest outstanding initiated time, or the last
/// initiated time when nothing is outstanding.
///
/// An initiated time equal to the last one is a tie, not a violation. When
/// the earlier copies already finished it re-opens that time, and the
/// completion time steps back to just before it until the new copy
/// completes.
#[derive(Debug, Default, Clone)]
pub struct WriterState {
    outstanding: BTreeMap<Time, u32>,
    last_initiated: Option<Time>,
}

impl WriterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `time` as initiated. Rejected when it precedes the last
    /// initiated time.
    pub fn initiated(&mut self, time: Time) -> Result<(), String> {
        if let Some(last) = self.last_initiated
            && time < last
        {
            return Err(format!(
                "initiated time {time} precedes last initiated time {last}"
            ));
        }
        *self.outstanding.entry(time).or_insert(0) += 1;
        self.last_initiated = Some(time);
        Ok(())
    }

    /// Remove one outstanding copy of `time`
    pub fn completed(&mut self, time: Time) -> Result<(), String> {
        match self.outstanding.get_mut(&time) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Ok(())
            }
            Some(_) => {
                self.outstanding.remove(&time);
                Ok(())
            }
            None => Err(format!(
                "completed time {time} has no outstanding initiated time"
            )),
        }
    }

    /// Everything up to and including this time has finished. `None` until
    /// the writer initiated something.
    pub fn completion_time(&self) -> Option<Time> {
        match self.outstanding.first_key_value() {
            Some((earliest, _)) => earliest.step_back(),
            None => self.last_initiated,
        }
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.values().map(|count| *count as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Time {
        Time::from_milli(millis)
    }

    #[test]
    fn test_unknown_until_first_initiated() {
        let state = WriterState::new();
        assert_eq!(state.completion_time(), None);
    }

    #[test]
    fn test_outstanding_holds_completion_time_back() {
        let mut state = WriterState::new();
        state.initiated(ms(10)).unwrap();
        assert_eq!(state.completion_time(), ms(10).step_back());

        state.completed(ms(10)).unwrap();
        assert_eq!(state.completion_time(), Some(ms(10)));

        state.initiated(ms(20)).unwrap();
        state.initiated(ms(30)).unwrap();
        // 30 completes first, 20 still holds the writer back
        state.completed(ms(30)).unwrap();
        assert_eq!(state.completion_time(), ms(20).step_back());

        state.completed(ms(20)).unwrap();
        assert_eq!(state.completion_time(), Some(ms(30)));
    }

    #[test]
    fn test_duplicates_are_counted() {
        let mut state = WriterState::new();
        state.initiated(ms(10)).unwrap();
        state.initiated(ms(10)).unwrap();
        assert_eq!(state.outstanding_count(), 2);

        state.completed(ms(10)).unwrap();
        assert_eq!(state.completion_time(), ms(10).step_back());

        state.completed(ms(10)).unwrap();
        assert_eq!(state.completion_time(), Some(ms(10)));
        assert_eq!(state.outstanding_count(), 0);
    }

    #[test]
    fn test_rejects_untracked_and_double_completion() {
        let mut state = WriterState::new();
        assert!(state.completed(ms(5)).is_err());

        state.initiated(ms(5)).unwrap();
        state.completed(ms(5)).unwrap();
        assert!(state.completed(ms(5)).is_err());
    }

    #[test]
    fn test_rejects_out_of_order_initiated() {
        let mut state = WriterState::new();
        state.initiated(ms(20)).unwrap();
        assert!(state.initiated(ms(10)).is_err());
    }

    #[test]
    fn test_tie_after_completion_reopens_time() {
        let mut state = WriterState::new();
        state.initiated(ms(20)).unwrap();
        state.completed(ms(20)).unwrap();
        assert_eq!(state.completion_time(), Some(ms(20)));

        state.initiated(ms(20)).unwrap();
        assert_eq!(state.completion_time(), ms(20).step_back());
        assert_eq!(state.outstanding_count(), 1);

        state.completed(ms(20)).unwrap();
        assert_eq!(state.completion_time(), Some(ms(20)));
        assert!(state.initiated(ms(19)).is_err());
    }
}
