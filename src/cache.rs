//! This module provides a local cache for the tasks of the selected date
//!
//! Only one list is live at a time. Every mutation is keyed on a task id (never on a position),
//! and carries the date it originated from, so that responses that arrive after the selected date
//! has changed are discarded instead of polluting the new list.
//!
//! A fetched list may have been built by the server before some mutations it acknowledged meanwhile.
//! These are recorded while the fetch is in flight, and applied again on top of the fetched list.

use chrono::NaiveDate;

use crate::task::{Task, TaskId};

/// Identifies a fetch of the task list, so that out-of-date responses can be recognized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    date: NaiveDate,
    seq: u64,
}

impl LoadTicket {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// A change the server has acknowledged while a fetch was in flight.
/// The fetched list may predate it, so it is applied again on top of that list.
#[derive(Clone, Debug)]
enum Acknowledged {
    Created(Task),
    Updated(Task),
    Removed(TaskId),
}

/// The in-memory task list of the selected date
#[derive(Debug)]
pub struct TaskCache {
    selected: NaiveDate,
    tasks: Vec<Task>,
    /// The sequence number of the latest load that has been started
    latest_load: u64,
    /// Whether the latest load has been applied
    loaded: bool,
    /// Whether the latest load is still awaited
    fetching: bool,
    journal: Vec<Acknowledged>,
}

impl TaskCache {
    /// An empty cache, with `date` selected but not fetched yet
    pub fn new(date: NaiveDate) -> Self {
        Self {
            selected: date,
            tasks: Vec::new(),
            latest_load: 0,
            loaded: false,
            fetching: false,
            journal: Vec::new(),
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    /// Whether the list of the selected date has been received already
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Select a date. This discards the current list, and returns the ticket the upcoming fetch must be completed with
    pub fn select(&mut self, date: NaiveDate) -> LoadTicket {
        if self.selected != date {
            log::debug!("Selecting {}", date);
        }
        self.selected = date;
        self.tasks.clear();
        self.loaded = false;
        self.start_load()
    }

    /// Start a new fetch for the selected date, without discarding the current list
    pub fn reload(&mut self) -> LoadTicket {
        self.start_load()
    }

    fn start_load(&mut self) -> LoadTicket {
        // Whatever was acknowledged so far is already known to the server when it builds the new list
        self.journal.clear();
        self.fetching = true;
        self.latest_load += 1;
        LoadTicket { date: self.selected, seq: self.latest_load }
    }

    /// Whether the response of this fetch is still wanted
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.selected == ticket.date && self.latest_load == ticket.seq
    }

    /// Replace the whole list with the server's list, then apply again what has been acknowledged while it was fetched.
    ///
    /// Returns `false` (and changes nothing) in case this fetch has been superseded in the meantime
    pub fn load_for(&mut self, ticket: LoadTicket, tasks: Vec<Task>) -> bool {
        if self.is_current(&ticket) == false {
            log::debug!("Discarding an outdated list for {}", ticket.date);
            return false;
        }
        self.tasks = tasks;
        self.loaded = true;
        self.fetching = false;
        for change in std::mem::take(&mut self.journal) {
            log::debug!("Replaying {:?} on top of the fetched list", change);
            match change {
                Acknowledged::Created(task) => { self.insert(task); },
                Acknowledged::Updated(task) => { self.replace(task); },
                Acknowledged::Removed(id) => { self.delete(&id); },
            }
        }
        true
    }

    /// Give up on a fetch that has failed
    pub fn abandon(&mut self, ticket: &LoadTicket) {
        if self.is_current(ticket) {
            self.fetching = false;
            self.journal.clear();
        }
    }

    fn accepts(&self, date: NaiveDate) -> bool {
        if self.selected != date {
            log::debug!("Discarding a response for {}, that is not selected anymore", date);
            return false;
        }
        true
    }

    fn record(&mut self, change: Acknowledged) {
        if self.fetching {
            self.journal.push(change);
        }
    }

    /// Append a task the server has just created
    pub fn apply_create(&mut self, date: NaiveDate, task: Task) -> bool {
        if self.accepts(date) == false {
            return false;
        }
        self.record(Acknowledged::Created(task.clone()));
        self.insert(task);
        true
    }

    /// Replace a task with the representation the server has returned
    pub fn apply_update(&mut self, date: NaiveDate, task: Task) -> bool {
        if self.accepts(date) == false {
            return false;
        }
        self.record(Acknowledged::Updated(task.clone()));
        self.replace(task)
    }

    /// Remove a task the server has just deleted
    pub fn apply_remove(&mut self, date: NaiveDate, id: &TaskId) -> bool {
        if self.accepts(date) == false {
            return false;
        }
        self.record(Acknowledged::Removed(id.clone()));
        self.delete(id)
    }

    fn insert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id() == task.id()) {
            // A reload may have fetched it already
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    fn replace(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id() == task.id()) {
            None => {
                log::debug!("Task {} is not in the list, ignoring its update", task.id());
                false
            },
            Some(existing) => {
                *existing = task;
                true
            }
        }
    }

    fn delete(&mut self, id: &TaskId) -> bool {
        let n_before = self.tasks.len();
        self.tasks.retain(|t| t.id() != id);
        self.tasks.len() != n_before
    }

    /// Forget the list (e.g. when the session ends). The selected date is kept
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.loaded = false;
        self.fetching = false;
        self.journal.clear();
        self.latest_load += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn task(id: &str, done: bool) -> Task {
        Task::new(TaskId::from(id), format!("Task {}", id), Priority::B, None, done)
    }

    #[test]
    fn stale_loads_are_discarded() {
        let mut cache = TaskCache::new(day(1));
        let first = cache.select(day(1));
        let second = cache.select(day(2));

        assert!(cache.load_for(second, vec![task("t2", false)]));
        assert!(cache.load_for(first, vec![task("t1", false)]) == false);
        assert_eq!(cache.selected_date(), day(2));
        assert_eq!(cache.tasks(), &[task("t2", false)]);
    }

    #[test]
    fn reselecting_the_same_date_supersedes_the_older_load() {
        let mut cache = TaskCache::new(day(1));
        let old = cache.select(day(1));
        let _other = cache.select(day(2));
        let new = cache.select(day(1));

        assert!(cache.load_for(old, vec![task("old", false)]) == false);
        assert!(cache.load_for(new, vec![task("new", false)]));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&TaskId::from("new")).is_some());
    }

    #[test]
    fn mutations_are_keyed_by_id() {
        let mut cache = TaskCache::new(day(1));
        let ticket = cache.select(day(1));
        cache.load_for(ticket, vec![task("a", false), task("b", false), task("c", false)]);

        assert!(cache.apply_update(day(1), task("b", true)));
        assert_eq!(cache.tasks()[1], task("b", true));

        assert!(cache.apply_remove(day(1), &TaskId::from("a")));
        assert!(cache.apply_remove(day(1), &TaskId::from("a")) == false);
        assert!(cache.apply_update(day(1), task("a", true)) == false);
        assert_eq!(cache.len(), 2);

        assert!(cache.apply_create(day(1), task("d", false)));
        assert!(cache.apply_create(day(1), task("d", false)));
        let ids: Vec<&str> = cache.tasks().iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
    }

    #[test]
    fn mutations_for_another_date_are_discarded() {
        let mut cache = TaskCache::new(day(1));
        let ticket = cache.select(day(2));
        cache.load_for(ticket, vec![task("x", false)]);

        assert!(cache.apply_create(day(1), task("t1", false)) == false);
        assert!(cache.apply_update(day(1), task("x", true)) == false);
        assert!(cache.apply_remove(day(1), &TaskId::from("x")) == false);
        assert_eq!(cache.tasks(), &[task("x", false)]);
    }

    #[test]
    fn reload_keeps_the_list_until_it_completes() {
        let mut cache = TaskCache::new(day(1));
        let ticket = cache.select(day(1));
        cache.load_for(ticket, vec![task("a", false)]);
        let reload = cache.reload();
        assert_eq!(cache.len(), 1);
        assert!(cache.load_for(reload, vec![task("a", false), task("b", false)]));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.selected_date(), day(1));
        assert!(cache.load_for(reload, vec![task("a", false)]) == false);
    }

    #[test]
    fn changes_acknowledged_during_a_fetch_are_replayed() {
        let mut cache = TaskCache::new(day(1));
        let ticket = cache.select(day(1));
        cache.load_for(ticket, vec![task("a", false), task("b", false)]);

        // The server builds the list, then handles the mutations, then the list arrives
        let reload = cache.reload();
        assert!(cache.apply_create(day(1), task("c", false)));
        assert!(cache.apply_update(day(1), task("a", true)));
        assert!(cache.apply_remove(day(1), &TaskId::from("b")));
        assert!(cache.load_for(reload, vec![task("a", false), task("b", false)]));
        assert_eq!(cache.tasks(), &[task("a", true), task("c", false)]);

        // Replayed once only
        let again = cache.reload();
        assert!(cache.load_for(again, vec![task("a", false)]));
        assert_eq!(cache.tasks(), &[task("a", false)]);
    }

    #[test]
    fn update_before_the_first_list_arrives() {
        let mut cache = TaskCache::new(day(1));
        let ticket = cache.select(day(1));
        assert!(cache.apply_update(day(1), task("a", true)) == false);
        assert!(cache.load_for(ticket, vec![task("a", false)]));
        assert_eq!(cache.tasks(), &[task("a", true)]);
    }

    #[test]
    fn abandoned_fetch_stops_recording() {
        let mut cache = TaskCache::new(day(1));
        let ticket = cache.select(day(1));
        cache.abandon(&ticket);
        cache.apply_create(day(1), task("a", false));
        assert!(cache.journal.is_empty());
        assert_eq!(cache.tasks(), &[task("a", false)]);
    }
}
