/// Cancel handle for a repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

#[derive(Debug, Clone)]
struct Entry<K> {
    handle: ScheduleHandle,
    task: K,
    every: u64,
    next_due: u64,
}

/// Owns the repeating tasks driven by the fixed-rate tick.
///
/// Tasks are returned from [`TickScheduler::advance`] in the order they were
/// scheduled. Cancelling is idempotent; a task cancelled while the due list of
/// the current tick is being dispatched must be skipped by checking
/// [`TickScheduler::is_active`].
#[derive(Debug, Clone)]
pub struct TickScheduler<K> {
    tick: u64,
    next_id: u64,
    entries: Vec<Entry<K>>,
}

impl<K: Copy> TickScheduler<K> {
    pub fn new() -> Self {
        Self {
            tick: 0,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Runs `task` on the next tick and every `every` ticks after that.
    pub fn schedule_repeating(&mut self, task: K, every: u32) -> ScheduleHandle {
        let handle = ScheduleHandle(self.next_id);
        self.next_id += 1;
        let every = u64::from(every.max(1));
        self.entries.push(Entry {
            handle,
            task,
            every,
            next_due: self.tick + 1,
        });
        handle
    }

    /// Returns `true` only for the call that actually removed the task.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        before != self.entries.len()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_active(&self, handle: ScheduleHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Moves to the next tick and returns the tasks due on it.
    pub fn advance(&mut self) -> Vec<(ScheduleHandle, K)> {
        self.tick += 1;
        let tick = self.tick;
        let mut due = Vec::new();
        for entry in self.entries.iter_mut() {
            if entry.next_due <= tick {
                due.push((entry.handle, entry.task));
                entry.next_due = tick + entry.every;
            }
        }
        due
    }
}

impl<K: Copy> Default for TickScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Task {
        Step,
        Track,
    }

    #[test]
    fn tasks_fire_in_schedule_order_at_their_rate() {
        let mut s = TickScheduler::new();
        s.schedule_repeating(Task::Step, 1);
        s.schedule_repeating(Task::Track, 3);

        let fired: Vec<Vec<Task>> = (0..4)
            .map(|_| s.advance().into_iter().map(|(_, t)| t).collect())
            .collect();
        assert_eq!(fired[0], vec![Task::Step, Task::Track]);
        assert_eq!(fired[1], vec![Task::Step]);
        assert_eq!(fired[2], vec![Task::Step]);
        assert_eq!(fired[3], vec![Task::Step, Task::Track]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut s = TickScheduler::new();
        let step = s.schedule_repeating(Task::Step, 1);
        assert!(s.is_active(step));
        assert!(s.cancel(step));
        assert!(!s.cancel(step));
        assert!(!s.is_active(step));
        assert!(s.advance().is_empty());
    }

    #[test]
    fn handles_are_never_reused() {
        let mut s = TickScheduler::new();
        let a = s.schedule_repeating(Task::Step, 1);
        s.cancel(a);
        let b = s.schedule_repeating(Task::Step, 1);
        assert_ne!(a, b);
        assert!(!s.cancel(a));
        assert!(s.is_active(b));
    }
}
