//! Multi-line analysis state.
//!
//! The engine reports each principal variation separately and in no
//! particular order. The aggregator keeps the latest update per line slot so
//! the whole set can be rendered at any moment without tearing.

use tracing::debug;

use crate::domain::{DepthInfo, LineError, SearchId};

#[derive(Debug, Clone)]
pub struct LineAggregator {
    slots: Vec<Option<DepthInfo>>,
    /// Highest line id seen since the last reset.
    num_received_lines: usize,
    generation: SearchId,
    /// False while no search is running; every update is then stale.
    active: bool,
}

impl LineAggregator {
    pub fn new(num_lines: usize) -> Self {
        Self {
            slots: vec![None; num_lines],
            num_received_lines: 0,
            generation: 0,
            active: true,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn num_received_lines(&self) -> usize {
        self.num_received_lines
    }

    pub fn generation(&self) -> SearchId {
        self.generation
    }

    /// Replace every slot with `num_lines` empty ones.
    pub fn set_num_lines(&mut self, num_lines: usize) {
        self.slots = vec![None; num_lines];
        self.num_received_lines = 0;
    }

    /// Drop all line data, keeping the configured capacity.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.num_received_lines = 0;
    }

    /// Only updates tagged with `generation` are accepted from now on.
    pub fn begin_search(&mut self, generation: SearchId) {
        self.generation = generation;
        self.active = true;
    }

    /// Reject every update until the next `begin_search`.
    pub fn end_search(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn on_line_update(&mut self, info: DepthInfo) -> Result<(), LineError> {
        let line_id = info.line_id as usize;
        if line_id == 0 || line_id > self.slots.len() {
            return Err(LineError::OutOfRangeLine {
                line_id: info.line_id,
                capacity: self.slots.len(),
            });
        }
        if !self.active {
            return Err(LineError::NoSearch {
                generation: info.generation,
            });
        }
        if info.generation != self.generation {
            return Err(LineError::StaleSearch {
                generation: info.generation,
                current: self.generation,
            });
        }

        debug!(line_id, depth = ?info.depth, "line update");
        self.slots[line_id - 1] = Some(info);
        self.num_received_lines = self.num_received_lines.max(line_id);
        Ok(())
    }

    pub fn line(&self, line_id: u32) -> Option<&DepthInfo> {
        let index = (line_id as usize).checked_sub(1)?;
        self.slots.get(index)?.as_ref()
    }

    /// Lines `1..=num_received_lines` in order, skipping never-filled slots.
    pub fn lines(&self) -> impl Iterator<Item = &DepthInfo> {
        self.slots[..self.num_received_lines].iter().flatten()
    }

    /// The first line that would be rendered.
    pub fn best_line(&self) -> Option<&DepthInfo> {
        self.lines().next()
    }
}

impl Default for LineAggregator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Score;

    fn update(line_id: u32, cp: i32, pv: &[&str]) -> DepthInfo {
        DepthInfo {
            line_id,
            pv: pv.iter().map(|m| m.to_string()).collect(),
            score: Score::Centipawns(cp),
            depth: Some(10),
            generation: 0,
        }
    }

    fn ids(agg: &LineAggregator) -> Vec<u32> {
        agg.lines().map(|l| l.line_id).collect()
    }

    #[test]
    fn test_out_of_order_updates_render_in_line_order() {
        let mut agg = LineAggregator::new(3);
        agg.on_line_update(update(2, 10, &["d2d4"])).unwrap();
        agg.on_line_update(update(1, 30, &["e2e4"])).unwrap();
        agg.on_line_update(update(3, 5, &["c2c4"])).unwrap();
        assert_eq!(ids(&agg), vec![1, 2, 3]);
        assert_eq!(agg.best_line().unwrap().pv, vec!["e2e4"]);
    }

    #[test]
    fn test_out_of_range_update_mutates_nothing() {
        let mut agg = LineAggregator::new(2);
        agg.on_line_update(update(1, 30, &["e2e4"])).unwrap();
        let before = agg.clone();

        assert_eq!(
            agg.on_line_update(update(0, 99, &["a2a3"])),
            Err(LineError::OutOfRangeLine { line_id: 0, capacity: 2 })
        );
        assert_eq!(
            agg.on_line_update(update(3, 99, &["a2a3"])),
            Err(LineError::OutOfRangeLine { line_id: 3, capacity: 2 })
        );
        assert_eq!(agg.num_received_lines(), before.num_received_lines());
        assert_eq!(agg.line(1), before.line(1));
        assert_eq!(agg.line(2), None);
    }

    #[test]
    fn test_second_update_overwrites_first() {
        let mut agg = LineAggregator::new(1);
        agg.on_line_update(update(1, 30, &["e2e4"])).unwrap();
        agg.on_line_update(update(1, -15, &["d2d4", "d7d5"])).unwrap();
        let lines: Vec<_> = agg.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].pv, vec!["d2d4", "d7d5"]);
        assert_eq!(lines[0].score, Score::Centipawns(-15));
    }

    #[test]
    fn test_lower_line_does_not_shrink_range() {
        let mut agg = LineAggregator::new(3);
        agg.on_line_update(update(3, 5, &["c2c4"])).unwrap();
        assert_eq!(agg.num_received_lines(), 3);
        agg.on_line_update(update(1, 30, &["e2e4"])).unwrap();
        assert_eq!(agg.num_received_lines(), 3);
        // line 2 has never reported and is skipped
        assert_eq!(ids(&agg), vec![1, 3]);
    }

    #[test]
    fn test_stale_generation_dropped() {
        let mut agg = LineAggregator::new(2);
        agg.begin_search(4);
        let mut stale = update(1, 30, &["e2e4"]);
        stale.generation = 3;
        assert_eq!(
            agg.on_line_update(stale),
            Err(LineError::StaleSearch { generation: 3, current: 4 })
        );
        assert_eq!(agg.num_received_lines(), 0);

        let mut fresh = update(1, 30, &["e2e4"]);
        fresh.generation = 4;
        agg.on_line_update(fresh).unwrap();
        assert_eq!(agg.num_received_lines(), 1);
    }

    #[test]
    fn test_ended_search_accepts_nothing() {
        let mut agg = LineAggregator::new(1);
        agg.begin_search(2);
        agg.end_search();
        assert!(!agg.is_active());
        let mut late = update(1, 30, &["e2e4"]);
        late.generation = 2;
        assert_eq!(
            agg.on_line_update(late.clone()),
            Err(LineError::NoSearch { generation: 2 })
        );
        assert_eq!(agg.num_received_lines(), 0);

        agg.begin_search(3);
        late.generation = 3;
        agg.on_line_update(late).unwrap();
        assert_eq!(agg.num_received_lines(), 1);
    }

    #[test]
    fn test_previous_search_data_kept_until_overwritten() {
        let mut agg = LineAggregator::new(2);
        agg.on_line_update(update(1, 30, &["e2e4"])).unwrap();
        agg.on_line_update(update(2, 20, &["d2d4"])).unwrap();

        agg.begin_search(1);
        let mut line_two = update(2, 25, &["g1f3"]);
        line_two.generation = 1;
        agg.on_line_update(line_two).unwrap();

        let pvs: Vec<_> = agg.lines().map(|l| l.pv[0].as_str()).collect();
        assert_eq!(pvs, vec!["e2e4", "g1f3"]);
    }

    #[test]
    fn test_set_num_lines_resets() {
        let mut agg = LineAggregator::new(1);
        agg.on_line_update(update(1, 30, &["e2e4"])).unwrap();
        agg.set_num_lines(3);
        assert_eq!(agg.capacity(), 3);
        assert_eq!(agg.num_received_lines(), 0);
        assert!(agg.best_line().is_none());
        agg.on_line_update(update(3, 1, &["c2c4"])).unwrap();
        assert_eq!(ids(&agg), vec![3]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut agg = LineAggregator::new(2);
        agg.on_line_update(update(2, 30, &["e2e4"])).unwrap();
        agg.clear();
        assert_eq!(agg.capacity(), 2);
        assert_eq!(agg.lines().count(), 0);
    }
}
