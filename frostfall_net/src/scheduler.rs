// Tick-based task scheduling.
//
// The session runs on a fixed tick; a few things (the match start countdown,
// the restart delay) need to happen some number of ticks in the future.
// `TaskList` keeps those in due order and hands back whatever is ripe each
// tick.

/// Tasks ordered by due tick. Ties run in the order they were scheduled.
#[derive(Debug)]
pub struct TaskList<T> {
    tick: u64,
    seq: u64,
    tasks: Vec<(u64, u64, T)>,
}

impl<T> Default for TaskList<T> {
    fn default() -> Self {
        Self {
            tick: 0,
            seq: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T> TaskList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Schedule `task` to run `delay` ticks from now. Zero means the next
    /// `advance` call.
    pub fn schedule_in(&mut self, delay: u64, task: T) {
        let due = self.tick + delay;
        let seq = self.seq;
        self.seq += 1;
        let at = self
            .tasks
            .partition_point(|&(d, s, _)| (d, s) <= (due, seq));
        self.tasks.insert(at, (due, seq, task));
    }

    /// Advance one tick and return every task that has come due.
    pub fn advance(&mut self) -> Vec<T> {
        self.tick += 1;
        let ripe = self.tasks.partition_point(|&(due, _, _)| due <= self.tick);
        self.tasks.drain(..ripe).map(|(_, _, task)| task).collect()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_fires_after_its_delay() {
        let mut list = TaskList::new();
        list.schedule_in(3, "go");
        assert!(list.advance().is_empty());
        assert!(list.advance().is_empty());
        assert_eq!(list.advance(), vec!["go"]);
        assert!(list.is_empty());
    }

    #[test]
    fn zero_delay_fires_next_tick() {
        let mut list = TaskList::new();
        list.schedule_in(0, 7);
        assert_eq!(list.advance(), vec![7]);
    }

    #[test]
    fn due_order_then_schedule_order() {
        let mut list = TaskList::new();
        list.schedule_in(2, "b");
        list.schedule_in(1, "a");
        list.schedule_in(2, "c");
        assert_eq!(list.advance(), vec!["a"]);
        assert_eq!(list.advance(), vec!["b", "c"]);
    }

    #[test]
    fn clear_drops_pending_tasks() {
        let mut list = TaskList::new();
        list.schedule_in(1, ());
        list.clear();
        assert!(list.advance().is_empty());
    }
}
