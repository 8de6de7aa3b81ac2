use std::collections::HashSet;

/// Names of records already accepted during the current run
///
/// Owned by the coordinator and lent to the page processor for each page.
/// It only ever grows and is dropped with the run; nothing is persisted.
#[derive(Debug, Default, Clone)]
pub struct SeenNames {
    names: HashSet<String>,
}

impl SeenNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Records `name`, returning false if it had already been seen
    pub fn insert(&mut self, name: &str) -> bool {
        if self.names.contains(name) {
            return false;
        }
        self.names.insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
