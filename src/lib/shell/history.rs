use std::collections::{vec_deque, VecDeque};

/// A bounded log of the commands entered into the shell. Once full, the oldest command is
/// evicted to make room for the newest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries:  VecDeque<String>,
    capacity: usize,
}

impl History {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        History { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Records a command. Trailing line terminators are dropped, and blank commands are
    /// not recorded.
    pub fn push(&mut self, command: &str) {
        let command = command.trim_end_matches(&['\n', '\r'][..]);
        if command.trim().is_empty() || self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(command.into());
    }

    /// The retained commands, oldest first.
    pub fn iter(&self) -> Iter<'_> { Iter(self.entries.iter()) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn capacity(&self) -> usize { self.capacity }
}

impl Default for History {
    fn default() -> Self { History::new(Self::DEFAULT_CAPACITY) }
}

pub struct Iter<'a>(vec_deque::Iter<'a, String>);

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> { self.0.next().map(String::as_str) }

    fn size_hint(&self) -> (usize, Option<usize>) { self.0.size_hint() }
}

impl<'a> ExactSizeIterator for Iter<'a> {}

impl<'a> IntoIterator for &'a History {
    type IntoIter = Iter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> Iter<'a> { self.iter() }
}
