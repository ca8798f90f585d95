//! URL frontier: an ordered, deduplicating queue of pending URLs.
//!
//! Implements the dedup/visited-set invariants described in the system
//! design: at most one queue entry or visited mark per normalized URL,
//! BFS (FIFO) or DFS (LIFO) traversal order, and a front-of-queue retry
//! slot for requeues.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Traversal order used when popping items from the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// First-in, first-out: breadth-first crawl.
    Bfs,
    /// Last-in, first-out: depth-first crawl.
    Dfs,
}

/// A pending URL and the bookkeeping the scheduler needs to process it.
#[derive(Debug, Clone)]
pub struct FrontierItem {
    /// The normalized (deduplication-key) form of the URL.
    pub normalized: String,
    /// The raw form as discovered, before normalization.
    pub raw: String,
    /// Crawl depth from the nearest seed.
    pub depth: u32,
    /// Normalized URL of the page this one was discovered from, if any.
    pub discovered_from: Option<String>,
    /// Retry attempt count; zero for a fresh item.
    pub retries: u32,
}

impl FrontierItem {
    /// Builds a fresh (non-retry) frontier item.
    pub fn new(normalized: impl Into<String>, raw: impl Into<String>, depth: u32) -> Self {
        Self {
            normalized: normalized.into(),
            raw: raw.into(),
            depth,
            discovered_from: None,
            retries: 0,
        }
    }

    /// Sets the discovering page's normalized URL.
    pub fn with_discovered_from(mut self, from: impl Into<String>) -> Self {
        self.discovered_from = Some(from.into());
        self
    }
}

/// Snapshot of frontier counters, per §4.2 `stats()`.
#[derive(Debug, Clone, Default)]
pub struct FrontierStats {
    pub queued: usize,
    pub visited: usize,
    pub total_added: u64,
    pub duplicates: u64,
    pub rejected_depth: u64,
    pub rejected_max_urls: u64,
    pub per_depth: HashMap<u32, u64>,
}

/// Configuration for frontier admission limits.
#[derive(Debug, Clone)]
pub struct FrontierConfig {
    pub mode: TraversalMode,
    /// Reject items whose depth exceeds this value. `None` = unbounded.
    pub max_depth: Option<u32>,
    /// Reject pushes once `total_added` reaches this value. `None` = unbounded.
    pub max_urls: Option<u64>,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            mode: TraversalMode::Bfs,
            max_depth: None,
            max_urls: None,
        }
    }
}

/// The deduplicating queue itself. Not internally synchronised; wrap in
/// [`SharedFrontier`] for use across worker tasks.
pub struct Frontier {
    config: FrontierConfig,
    queue: VecDeque<FrontierItem>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    total_added: u64,
    duplicates: u64,
    rejected_depth: u64,
    rejected_max_urls: u64,
    per_depth: HashMap<u32, u64>,
}

impl Frontier {
    pub fn new(config: FrontierConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            total_added: 0,
            duplicates: 0,
            rejected_depth: 0,
            rejected_max_urls: 0,
            per_depth: HashMap::new(),
        }
    }

    /// Attempts to admit an item. Returns `true` if accepted.
    ///
    /// Rejects (in order): depth beyond the configured maximum, the
    /// configured total-added cap already reached, or a normalized form
    /// already queued or visited (counted as a duplicate).
    pub fn push(&mut self, item: FrontierItem) -> bool {
        if let Some(max_depth) = self.config.max_depth {
            if item.depth > max_depth {
                self.rejected_depth += 1;
                return false;
            }
        }
        if let Some(max_urls) = self.config.max_urls {
            if self.total_added >= max_urls {
                self.rejected_max_urls += 1;
                return false;
            }
        }
        if self.queued.contains(&item.normalized) || self.visited.contains(&item.normalized) {
            self.duplicates += 1;
            return false;
        }

        self.queued.insert(item.normalized.clone());
        self.total_added += 1;
        *self.per_depth.entry(item.depth).or_insert(0) += 1;
        self.queue.push_back(item);
        true
    }

    /// Removes and returns the next item per the traversal mode.
    pub fn pop(&mut self) -> Option<FrontierItem> {
        let item = match self.config.mode {
            TraversalMode::Bfs => self.queue.pop_front(),
            TraversalMode::Dfs => self.queue.pop_back(),
        }?;
        self.queued.remove(&item.normalized);
        Some(item)
    }

    /// Returns the next item that would be popped, without removing it.
    pub fn peek(&self) -> Option<&FrontierItem> {
        match self.config.mode {
            TraversalMode::Bfs => self.queue.front(),
            TraversalMode::Dfs => self.queue.back(),
        }
    }

    pub fn size(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// True if the normalized URL is currently queued or already visited.
    pub fn contains(&self, normalized: &str) -> bool {
        self.queued.contains(normalized) || self.visited.contains(normalized)
    }

    /// Marks a normalized URL visited. Callers invoke this after popping
    /// and successfully processing (vs. requeuing) an item.
    pub fn mark_visited(&mut self, normalized: &str) {
        self.visited.insert(normalized.to_string());
    }

    /// Re-admits a popped item for retry, at the immediate-retry slot:
    /// the front of the BFS queue, or the top of the DFS stack.
    pub fn requeue(&mut self, mut item: FrontierItem) {
        self.queued.insert(item.normalized.clone());
        item.retries += 1;
        match self.config.mode {
            TraversalMode::Bfs => self.queue.push_front(item),
            TraversalMode::Dfs => self.queue.push_back(item),
        }
    }

    pub fn stats(&self) -> FrontierStats {
        FrontierStats {
            queued: self.queued.len(),
            visited: self.visited.len(),
            total_added: self.total_added,
            duplicates: self.duplicates,
            rejected_depth: self.rejected_depth,
            rejected_max_urls: self.rejected_max_urls,
            per_depth: self.per_depth.clone(),
        }
    }
}

/// Thread-safe handle to a [`Frontier`], serialising all mutations on a
/// single lock as required by the concurrency model (§5).
#[derive(Clone)]
pub struct SharedFrontier {
    inner: Arc<Mutex<Frontier>>,
}

impl SharedFrontier {
    pub fn new(config: FrontierConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Frontier::new(config))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, item: FrontierItem) -> bool {
        self.lock().push(item)
    }

    pub fn pop(&self) -> Option<FrontierItem> {
        self.lock().pop()
    }

    pub fn size(&self) -> usize {
        self.lock().size()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.lock().contains(normalized)
    }

    pub fn mark_visited(&self, normalized: &str) {
        self.lock().mark_visited(normalized)
    }

    pub fn requeue(&self, item: FrontierItem) {
        self.lock().requeue(item)
    }

    pub fn stats(&self) -> FrontierStats {
        self.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, depth: u32) -> FrontierItem {
        FrontierItem::new(url, url, depth)
    }

    #[test]
    fn test_bfs_order_is_fifo() {
        let mut f = Frontier::new(FrontierConfig::default());
        assert!(f.push(item("a", 0)));
        assert!(f.push(item("b", 0)));
        assert!(f.push(item("c", 0)));
        assert_eq!(f.pop().unwrap().normalized, "a");
        assert_eq!(f.pop().unwrap().normalized, "b");
        assert_eq!(f.pop().unwrap().normalized, "c");
    }

    #[test]
    fn test_dfs_order_is_lifo() {
        let config = FrontierConfig {
            mode: TraversalMode::Dfs,
            ..Default::default()
        };
        let mut f = Frontier::new(config);
        assert!(f.push(item("a", 0)));
        assert!(f.push(item("b", 0)));
        assert!(f.push(item("c", 0)));
        assert_eq!(f.pop().unwrap().normalized, "c");
        assert_eq!(f.pop().unwrap().normalized, "b");
        assert_eq!(f.pop().unwrap().normalized, "a");
    }

    #[test]
    fn test_duplicate_rejected_while_queued() {
        let mut f = Frontier::new(FrontierConfig::default());
        assert!(f.push(item("a", 0)));
        assert!(!f.push(item("a", 0)));
        assert_eq!(f.stats().duplicates, 1);
    }

    #[test]
    fn test_duplicate_rejected_after_visited() {
        let mut f = Frontier::new(FrontierConfig::default());
        assert!(f.push(item("a", 0)));
        let popped = f.pop().unwrap();
        f.mark_visited(&popped.normalized);
        assert!(!f.push(item("a", 0)));
    }

    #[test]
    fn test_max_depth_rejects() {
        let config = FrontierConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        let mut f = Frontier::new(config);
        assert!(f.push(item("a", 1)));
        assert!(!f.push(item("b", 2)));
        assert_eq!(f.stats().rejected_depth, 1);
    }

    #[test]
    fn test_max_urls_rejects_after_total_added_reached() {
        let config = FrontierConfig {
            max_urls: Some(2),
            ..Default::default()
        };
        let mut f = Frontier::new(config);
        assert!(f.push(item("a", 0)));
        assert!(f.push(item("b", 0)));
        assert!(!f.push(item("c", 0)));
        assert_eq!(f.stats().rejected_max_urls, 1);
    }

    #[test]
    fn test_requeue_goes_to_front_for_bfs() {
        let mut f = Frontier::new(FrontierConfig::default());
        f.push(item("a", 0));
        f.push(item("b", 0));
        let a = f.pop().unwrap();
        f.requeue(a);
        // requeued item should be popped before "b"
        assert_eq!(f.pop().unwrap().normalized, "a");
        assert_eq!(f.pop().unwrap().normalized, "b");
    }

    #[test]
    fn test_requeue_increments_retries() {
        let mut f = Frontier::new(FrontierConfig::default());
        f.push(item("a", 0));
        let a = f.pop().unwrap();
        assert_eq!(a.retries, 0);
        f.requeue(a);
        let a_again = f.pop().unwrap();
        assert_eq!(a_again.retries, 1);
    }

    #[test]
    fn test_contains_checks_both_queued_and_visited() {
        let mut f = Frontier::new(FrontierConfig::default());
        f.push(item("a", 0));
        assert!(f.contains("a"));
        let a = f.pop().unwrap();
        assert!(!f.contains("a"));
        f.mark_visited(&a.normalized);
        assert!(f.contains("a"));
    }

    /// S1 — basic BFS crawl with a depth limit: seed depth 0, three
    /// depth-1 children admitted, two depth-2 grandchildren rejected.
    #[test]
    fn test_s1_bfs_depth_limit_scenario() {
        let config = FrontierConfig {
            mode: TraversalMode::Bfs,
            max_depth: Some(1),
            ..Default::default()
        };
        let mut f = Frontier::new(config);

        assert!(f.push(item("https://example.com/", 0)));
        let seed = f.pop().unwrap();
        f.mark_visited(&seed.normalized);

        for child in ["/about", "/products", "/blog"] {
            assert!(f.push(item(child, 1)));
        }
        // grandchildren discovered from /products, rejected by depth limit
        assert!(!f.push(item("/products/1", 2)));
        assert!(!f.push(item("/products/2", 2)));

        let stats = f.stats();
        assert_eq!(stats.total_added, 4);
        assert_eq!(*stats.per_depth.get(&0).unwrap(), 1);
        assert_eq!(*stats.per_depth.get(&1).unwrap(), 3);
        assert_eq!(stats.rejected_depth, 2);
    }

    #[test]
    fn test_shared_frontier_across_threads() {
        let shared = SharedFrontier::new(FrontierConfig::default());
        let mut handles = Vec::new();
        for i in 0..8 {
            let shared = shared.clone();
            handles.push(std::thread::spawn(move || {
                shared.push(item(&format!("url-{i}"), 0));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.size(), 8);
        assert_eq!(shared.stats().total_added, 8);
    }
}
