//! URL Frontier with per-host politeness
//!
//! Holds every discovered-but-unfinished URL in a FIFO queue per host
//! (scheme + authority) and hands them to workers so that two dispatches to
//! the same host are always at least the politeness delay apart.
//!
//! All state sits behind one mutex paired with a condition variable:
//! - `next_url` scans for the first host whose cooldown has elapsed, and
//!   otherwise waits for the shortest remaining cooldown, or for a bounded
//!   idle period while other workers may still discover links.
//! - `add_url` and `mark_complete` never block beyond the lock; they mutate,
//!   flush the record store, and wake every waiter.
//!
//! The crawl is finished when every queue is empty and no dispatched URL is
//! still outstanding.

use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::url_filter::UrlFilter;
use super::{host_key, normalize_url, url_hash};
use crate::storage::{RecordStore, StoreError, UrlRecord};

/// Default wait before an idle worker re-checks for work
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_secs(1);

/// Errors from the frontier
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one scan over the host queues
enum Poll {
    /// A URL was dispatched
    Ready(String),
    /// Work exists but every host is cooling down for at least this long
    Cooldown(Duration),
    /// Nothing queued, but dispatched URLs may still yield new links
    Idle,
    /// Nothing queued and nothing outstanding
    Finished,
}

struct FrontierState {
    store: Box<dyn RecordStore>,
    /// Pending URLs per host, in discovery order
    host_queues: HashMap<String, VecDeque<String>>,
    /// Survives queue removal so a re-created queue still honors the delay
    last_dispatch: HashMap<String, Instant>,
    /// URLs handed out by `next_url` and not yet completed
    active_workers: usize,
    shut_down: bool,
}

impl FrontierState {
    fn enqueue(&mut self, url: String) {
        self.host_queues
            .entry(host_key(&url))
            .or_insert_with(VecDeque::new)
            .push_back(url);
    }

    fn pending_count(&self) -> usize {
        self.host_queues.values().map(VecDeque::len).sum()
    }

    fn poll(&mut self, now: Instant, delay: Duration) -> Poll {
        let mut ready_host: Option<String> = None;
        let mut shortest_wait: Option<Duration> = None;

        for (host, queue) in &self.host_queues {
            if queue.is_empty() {
                continue;
            }
            let elapsed = self
                .last_dispatch
                .get(host)
                .map(|last| now.saturating_duration_since(*last));

            match elapsed {
                Some(elapsed) if elapsed < delay => {
                    let remaining = delay - elapsed;
                    shortest_wait = Some(shortest_wait.map_or(remaining, |w| w.min(remaining)));
                }
                _ => {
                    ready_host = Some(host.clone());
                    break;
                }
            }
        }

        if let Some(host) = ready_host {
            let (url, now_empty) = match self.host_queues.get_mut(&host) {
                Some(queue) => (queue.pop_front(), queue.is_empty()),
                None => (None, true),
            };
            if now_empty {
                self.host_queues.remove(&host);
            }
            if let Some(url) = url {
                self.last_dispatch.insert(host, now);
                self.active_workers += 1;
                return Poll::Ready(url);
            }
        }

        match shortest_wait {
            Some(wait) => Poll::Cooldown(wait),
            None if self.active_workers > 0 => Poll::Idle,
            None => Poll::Finished,
        }
    }
}

/// Concurrent, durable crawl frontier
pub struct Frontier {
    state: Mutex<FrontierState>,
    url_available: Condvar,
    delay: Duration,
    idle_poll: Duration,
}

impl Frontier {
    /// Create a frontier.
    ///
    /// With `resume` set and a non-empty store, queues are rebuilt from every
    /// uncompleted record that the current `filter` still accepts; records it
    /// rejects stay in the store but are not queued. Otherwise the store is
    /// cleared and `seeds` are queued.
    pub fn new(
        seeds: &[String],
        delay: Duration,
        store: Box<dyn RecordStore>,
        resume: bool,
        filter: &UrlFilter,
    ) -> Result<Self, FrontierError> {
        let frontier = Self {
            state: Mutex::new(FrontierState {
                store,
                host_queues: HashMap::new(),
                last_dispatch: HashMap::new(),
                active_workers: 0,
                shut_down: false,
            }),
            url_available: Condvar::new(),
            delay,
            idle_poll: DEFAULT_IDLE_POLL,
        };

        let restored = if resume {
            frontier.restore(filter)?
        } else {
            let mut state = frontier.state.lock();
            if !state.store.is_empty() {
                info!("Discarding {} saved URL records, starting from seeds", state.store.len());
                state.store.clear()?;
            }
            false
        };

        if !restored {
            if resume {
                info!("No saved crawl state found, starting from seeds");
            }
            for seed in seeds {
                frontier.add_url(seed)?;
            }
        }

        Ok(frontier)
    }

    /// Override how long an idle worker waits before re-checking
    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    /// Rebuild queues from the store. Returns false if the store was empty.
    fn restore(&self, filter: &UrlFilter) -> Result<bool, FrontierError> {
        let mut state = self.state.lock();
        if state.store.is_empty() {
            return Ok(false);
        }

        let records = state.store.records()?;
        let total = records.len();
        let mut queued = 0usize;
        let mut rejected = 0usize;

        for (_, record) in records {
            if record.completed {
                continue;
            }
            if filter.is_valid(&record.url) {
                state.enqueue(record.url);
                queued += 1;
            } else {
                rejected += 1;
            }
        }

        info!(
            "Found {} urls to be downloaded from {} total urls discovered ({} no longer pass the filter)",
            queued, total, rejected
        );
        Ok(true)
    }

    /// Block until a URL may be fetched, or return `None` once the crawl is
    /// finished (no queued URLs and no outstanding dispatches) or the
    /// frontier has been shut down.
    pub fn next_url(&self) -> Option<String> {
        let mut state = self.state.lock();
        loop {
            if state.shut_down {
                return None;
            }

            match state.poll(Instant::now(), self.delay) {
                Poll::Ready(url) => {
                    debug!("Dispatching {}", url);
                    return Some(url);
                }
                Poll::Cooldown(wait) => {
                    self.url_available.wait_for(&mut state, wait);
                }
                Poll::Idle => {
                    self.url_available.wait_for(&mut state, self.idle_poll);
                }
                Poll::Finished => return None,
            }
        }
    }

    /// Record and queue a URL if it has never been seen.
    ///
    /// Returns `Ok(true)` when the URL was new. Known URLs, completed or not,
    /// are ignored.
    pub fn add_url(&self, url: &str) -> Result<bool, FrontierError> {
        let url = normalize_url(url);
        let hash = url_hash(&url);

        let mut state = self.state.lock();
        if state.store.contains(&hash)? {
            return Ok(false);
        }

        state.store.set(&hash, &UrlRecord::pending(url.as_str()))?;
        state.store.flush()?;
        state.enqueue(url);
        drop(state);

        self.url_available.notify_all();
        Ok(true)
    }

    /// Mark a dispatched URL as fetched.
    ///
    /// Completing a URL the frontier never saw is logged and otherwise
    /// treated like a normal completion.
    pub fn mark_complete(&self, url: &str) -> Result<(), FrontierError> {
        let url = normalize_url(url);
        let hash = url_hash(&url);

        let mut state = self.state.lock();
        if state.active_workers == 0 {
            warn!("Completion for {} with no outstanding dispatches", url);
        }
        state.active_workers = state.active_workers.saturating_sub(1);

        let persisted = Self::persist_completion(&mut state, &hash, &url);
        drop(state);

        self.url_available.notify_all();
        persisted
    }

    fn persist_completion(
        state: &mut FrontierState,
        hash: &str,
        url: &str,
    ) -> Result<(), FrontierError> {
        if !state.store.contains(hash)? {
            error!("Completed url {}, but have not seen it before.", url);
        }
        state.store.set(hash, &UrlRecord::completed(url))?;
        state.store.flush()?;
        Ok(())
    }

    /// Make every blocked and future `next_url` call return `None`
    pub fn shutdown(&self) {
        self.state.lock().shut_down = true;
        self.url_available.notify_all();
    }

    /// URLs queued and not yet dispatched
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending_count()
    }

    /// URLs dispatched and not yet completed
    pub fn active_workers(&self) -> usize {
        self.state.lock().active_workers
    }

    /// Hosts with a non-empty queue
    pub fn host_count(&self) -> usize {
        self.state.lock().host_queues.len()
    }

    /// URLs ever recorded, completed or not
    pub fn seen_count(&self) -> usize {
        self.state.lock().store.len()
    }

    /// True once no work is queued or outstanding
    pub fn is_finished(&self) -> bool {
        let state = self.state.lock();
        state.active_workers == 0 && state.pending_count() == 0
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
