#[cfg(feature = "timing")]
use std::time::{Duration, Instant};

use log::Level;
#[cfg(feature = "timing")]
use log::log;

/// A hierarchy of named scopes and the time spent in each, printed through `log` once the
/// measured work is done. Without the `timing` feature every method is a no-op.
#[cfg(feature = "timing")]
#[derive(Debug)]
pub struct TimingTree {
    name: String,
    /// Never more important than the parent's level.
    level: Level,
    enter_time: Instant,
    /// `None` while the scope is open.
    exit_time: Option<Instant>,
    children: Vec<TimingTree>,
}

#[cfg(not(feature = "timing"))]
#[derive(Debug)]
pub struct TimingTree;

impl Default for TimingTree {
    fn default() -> Self {
        TimingTree::new("root", Level::Debug)
    }
}

#[cfg(feature = "timing")]
impl TimingTree {
    pub fn new(root_name: &str, level: Level) -> Self {
        Self {
            name: root_name.to_string(),
            level,
            enter_time: Instant::now(),
            exit_time: None,
            children: vec![],
        }
    }

    fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// The currently open scopes, outermost first, joined by `" > "`.
    pub fn open_stack(&self) -> String {
        let mut stack = Vec::new();
        let mut node = Some(self);
        while let Some(scope) = node.filter(|s| s.is_open()) {
            stack.push(scope.name.as_str());
            node = scope.children.last();
        }
        stack.join(" > ")
    }

    /// Opens a scope nested in the deepest open one.
    pub fn push(&mut self, ctx: &str, level: Level) {
        assert!(self.is_open(), "push on a closed timing scope");
        let level = level.max(self.level);
        if let Some(child) = self.children.last_mut() {
            if child.is_open() {
                child.push(ctx, level);
                return;
            }
        }
        self.children.push(TimingTree::new(ctx, level));
    }

    /// Closes the deepest open scope.
    pub fn pop(&mut self) {
        assert!(self.is_open(), "pop on a closed timing scope");
        if let Some(child) = self.children.last_mut() {
            if child.is_open() {
                child.pop();
                return;
            }
        }
        self.exit_time = Some(Instant::now());
    }

    pub fn duration(&self) -> Duration {
        self.exit_time
            .unwrap_or_else(Instant::now)
            .duration_since(self.enter_time)
    }

    /// Drops scopes shorter than `min_delta`.
    pub fn filter(&self, min_delta: Duration) -> Self {
        Self {
            name: self.name.clone(),
            level: self.level,
            enter_time: self.enter_time,
            exit_time: self.exit_time,
            children: self
                .children
                .iter()
                .filter(|c| c.duration() >= min_delta)
                .map(|c| c.filter(min_delta))
                .collect(),
        }
    }

    pub fn print(&self) {
        self.print_helper(0);
    }

    fn print_helper(&self, depth: usize) {
        log!(
            self.level,
            "{}{:.4}s to {}",
            "| ".repeat(depth),
            self.duration().as_secs_f64(),
            self.name
        );
        for child in &self.children {
            child.print_helper(depth + 1);
        }
    }
}

#[cfg(not(feature = "timing"))]
impl TimingTree {
    pub fn new(_root_name: &str, _level: Level) -> Self {
        Self
    }

    pub fn open_stack(&self) -> String {
        String::new()
    }

    pub fn push(&mut self, _ctx: &str, _level: Level) {}

    pub fn pop(&mut self) {}

    pub fn print(&self) {}
}

/// Runs an expression inside a named timing scope.
#[macro_export]
macro_rules! timed {
    ($timing_tree:expr, $level:expr, $ctx:expr, $exp:expr) => {{
        $timing_tree.push($ctx, $level);
        let res = $exp;
        $timing_tree.pop();
        res
    }};
    // If no level is specified, default to Debug.
    ($timing_tree:expr, $ctx:expr, $exp:expr) => {{
        $timing_tree.push($ctx, log::Level::Debug);
        let res = $exp;
        $timing_tree.pop();
        res
    }};
}

#[cfg(all(test, feature = "timing"))]
mod tests {
    use super::*;

    #[test]
    fn nested_scopes() {
        let mut timing = TimingTree::new("prove", Level::Debug);
        timing.push("commit", Level::Info);
        timing.push("merkle", Level::Debug);
        assert_eq!(timing.open_stack(), "prove > commit > merkle");
        timing.pop();
        assert_eq!(timing.open_stack(), "prove > commit");
        let x = timed!(timing, "inner", 1 + 1);
        assert_eq!(x, 2);
        timing.pop();
        timing.pop();
        assert_eq!(timing.open_stack(), "");
        assert_eq!(timing.children.len(), 1);
        assert_eq!(timing.children[0].children.len(), 2);
        // A child never logs at a more important level than its parent.
        assert_eq!(timing.children[0].level, Level::Debug);
        timing.filter(Duration::from_secs(3600)).print();
    }
}
