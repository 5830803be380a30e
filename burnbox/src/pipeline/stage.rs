//! Stage definition for table-driven pipeline execution.

/// A named group of tasks.
///
/// Stages run in plan order and their tasks run sequentially, each depending
/// on the state left by the one before it.
///
/// Generic over task type T to allow different pipeline implementations.
#[derive(Debug, Clone)]
pub struct Stage<T> {
    pub name: &'static str,
    pub tasks: Vec<T>,
}

impl<T> Stage<T> {
    pub fn new(name: &'static str, tasks: Vec<T>) -> Self {
        Self { name, tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
