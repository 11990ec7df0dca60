//! # Task List
//!
//! Ordered record of the edits of one modification session.
//!
//! - Entries are kept in wire form so that a list loaded from a stored
//!   record replays exactly as written, including operations this build
//!   no longer knows (those fail when applied)
//! - Append-only, apart from dropping the last entry or clearing all
//! - Not synchronized; a session owns its list

use crate::raw::RawTask;
use serde::{Deserialize, Serialize};

/// Tasks in the order they were recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList {
    tasks: Vec<RawTask>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<RawTask>) -> Self {
        Self { tasks }
    }

    pub fn push(&mut self, task: RawTask) {
        self.tasks.push(task);
    }

    /// Drop the most recent task; no-op on an empty list
    pub fn undo_last(&mut self) -> Option<RawTask> {
        self.tasks.pop()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn list_tasks(&self) -> &[RawTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// `self` followed by `other`
    pub fn concat(&self, other: &TaskList) -> TaskList {
        let mut tasks = self.tasks.clone();
        tasks.extend(other.tasks.iter().cloned());
        TaskList { tasks }
    }
}

impl FromIterator<RawTask> for TaskList {
    fn from_iter<I: IntoIterator<Item = RawTask>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(name: &str) -> RawTask {
        RawTask::new(name, vec![json!("/a")])
    }

    #[test]
    fn test_undo_last() {
        let mut list = TaskList::new();
        list.push(task("delete_tag"));
        let before = list.clone();
        list.push(task("xml_set_text"));

        assert_eq!(list.undo_last(), Some(task("xml_set_text")));
        assert_eq!(list, before);

        list.undo_last();
        assert_eq!(list.undo_last(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut list: TaskList = (0..5).map(|_| task("delete_tag")).collect();
        assert_eq!(list.len(), 5);
        list.clear();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let list = TaskList::from_tasks(vec![task("delete_tag")]);
        assert_eq!(serde_json::to_value(&list).unwrap(), json!([["delete_tag", "/a"]]));
    }
}
