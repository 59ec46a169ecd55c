//! In-process collaborators.

use super::{
    Clock, JobHandle, Ledger, Notification, Notifier, PostingId, PostingRequest, PostingStatus,
    ScheduledTask, Scheduler, SequenceService, TaskKind,
};
use crate::error::{ChequeError, Result};
use crate::model::Direction;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    pub id: PostingId,
    pub request: PostingRequest,
    pub status: PostingStatus,
}

/// Ledger that keeps every entry in memory.
///
/// `set_failing(true)` makes every subsequent `post` fail, and
/// `set_failing_updates(true)` does the same for cancel and reset. A
/// single posting can be made to fail with `reject_updates_for`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    failing: AtomicBool,
    failing_updates: AtomicBool,
    rejected: Mutex<Option<PostingId>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_updates(&self, failing: bool) {
        self.failing_updates.store(failing, Ordering::SeqCst);
    }

    /// Status changes touching `posting` fail until cleared with `None`.
    pub fn reject_updates_for(&self, posting: Option<PostingId>) {
        *lock(&self.rejected) = posting;
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        lock(&self.entries).clone()
    }

    pub fn entry(&self, id: PostingId) -> Option<LedgerEntry> {
        lock(&self.entries).iter().find(|e| e.id == id).cloned()
    }

    pub fn status(&self, id: PostingId) -> Option<PostingStatus> {
        self.entry(id).map(|e| e.status)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_status(&self, ids: &[PostingId], status: PostingStatus) -> Result<()> {
        if self.failing_updates.load(Ordering::SeqCst) {
            return Err(ChequeError::processing("ledger rejected status change"));
        }
        let rejected = *lock(&self.rejected);
        let mut entries = lock(&self.entries);

        let mut positions = Vec::with_capacity(ids.len());
        for id in ids {
            if rejected == Some(*id) {
                return Err(ChequeError::processing(format!(
                    "ledger rejected status change for posting {id}"
                )));
            }
            let position = entries
                .iter()
                .position(|e| e.id == *id)
                .ok_or_else(|| ChequeError::not_found("posting", id))?;
            positions.push(position);
        }
        for position in positions {
            entries[position].status = status;
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn post(&self, request: PostingRequest) -> Result<PostingId> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChequeError::processing(format!(
                "ledger rejected posting '{}'",
                request.reference
            )));
        }
        request.ensure_balanced()?;

        let id = PostingId::new();
        lock(&self.entries).push(LedgerEntry {
            id,
            request,
            status: PostingStatus::Posted,
        });
        Ok(id)
    }

    fn cancel(&self, postings: &[PostingId]) -> Result<()> {
        self.set_status(postings, PostingStatus::Cancelled)
    }

    fn reset_to_draft(&self, postings: &[PostingId]) -> Result<()> {
        self.set_status(postings, PostingStatus::Draft)
    }
}

/// Independent counters for incoming and outgoing cheques, starting at 1.
#[derive(Debug, Default)]
pub struct MemorySequences {
    incoming: AtomicU64,
    outgoing: AtomicU64,
}

impl MemorySequences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceService for MemorySequences {
    fn next(&self, direction: Direction) -> Result<u64> {
        let counter = match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        };
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<Notification> {
        lock(&self.sent)
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        lock(&self.sent).push(notification);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryScheduler {
    tasks: Mutex<HashMap<TaskKind, (JobHandle, ScheduledTask)>>,
    next_handle: AtomicU64,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self, kind: TaskKind) -> Option<ScheduledTask> {
        lock(&self.tasks).get(&kind).map(|(_, task)| task.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for MemoryScheduler {
    fn upsert(&self, task: ScheduledTask) -> Result<JobHandle> {
        let mut tasks = lock(&self.tasks);
        let handle = match tasks.get(&task.kind) {
            Some((handle, _)) => *handle,
            None => JobHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1),
        };
        tasks.insert(task.kind, (handle, task));
        Ok(handle)
    }

    fn cancel(&self, kind: TaskKind) -> Result<bool> {
        Ok(lock(&self.tasks).remove(&kind).is_some())
    }
}

/// Clock pinned to one instant; `set` moves it.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
