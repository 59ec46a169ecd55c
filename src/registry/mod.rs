//! The live set of cheques and everything that happens to them.
//!
//! [`ChequeRegistry`] owns the cheques, their categories and branches, the
//! snapshot archive of deleted cheques, and handles to the outside world
//! (ledger, sequences, notifier, scheduler, clock). Lifecycle events go
//! through the shared [`StateMachine`]; numbers come from the
//! [`ChequeBookAllocator`] or the sequence service.

mod report;

pub use report::{DueBuckets, StatusReport};

use crate::allocator::ChequeBookAllocator;
use crate::checkpoint::{ChequeSnapshot, SnapshotStore};
use crate::config::{ChequeConfig, SequenceConfig};
use crate::core::{State, StateTransition};
use crate::effects::{ChequeEvent, StateMachine, TransitionEnv};
use crate::error::{ChequeError, Result};
use crate::model::{
    BounceReason, Branch, BranchDirectory, Category, CategoryId, CategoryTree, Cheque,
    ChequeDraft, ChequeId, ChequeState,
};
use crate::ports::{
    Clock, Ledger, Notification, Notifier, Scheduler, SequenceService, TaskKind,
};
use crate::reminder::{DuePeriods, ReminderPolicy};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// External collaborators a registry talks to.
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<dyn Ledger>,
    pub sequences: Arc<dyn SequenceService>,
    pub notifier: Arc<dyn Notifier>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChequeRegistry {
    machine: StateMachine,
    services: Services,
    allocator: Arc<ChequeBookAllocator>,
    cheques: BTreeMap<ChequeId, Cheque>,
    next_id: u64,
    categories: CategoryTree,
    branches: BranchDirectory,
    snapshots: SnapshotStore,
    reminders: ReminderPolicy,
    retention: Duration,
    sequences: SequenceConfig,
    reminder_recipient: String,
}

impl ChequeRegistry {
    pub fn new(services: Services, config: &ChequeConfig) -> Result<Self> {
        config.validate()?;
        let machine = StateMachine::standard().map_err(|e| ChequeError::Config {
            message: format!("lifecycle table is invalid: {e}"),
        })?;
        let allocator = ChequeBookAllocator::new(services.notifier.clone())
            .with_low_water_mark(config.allocator.low_water_mark);

        Ok(Self {
            machine,
            allocator: Arc::new(allocator),
            services,
            cheques: BTreeMap::new(),
            next_id: 1,
            categories: CategoryTree::new(),
            branches: BranchDirectory::new(),
            snapshots: SnapshotStore::new(),
            reminders: config.reminder_policy()?,
            retention: config.retention(),
            sequences: config.sequences.clone(),
            reminder_recipient: "treasury".to_string(),
        })
    }

    /// Who receives due-date reminders.
    pub fn with_reminder_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.reminder_recipient = recipient.into();
        self
    }

    /// Shared handle to the book allocator, usable from other threads.
    pub fn allocator(&self) -> &Arc<ChequeBookAllocator> {
        &self.allocator
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn reminder_policy(&self) -> &ReminderPolicy {
        &self.reminders
    }

    pub fn add_category(&mut self, category: Category) -> Result<()> {
        self.categories.insert(category)
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    pub fn add_branch(&mut self, branch: Branch) -> Result<()> {
        self.branches.insert(branch)
    }

    pub fn branches(&self) -> &BranchDirectory {
        &self.branches
    }

    pub fn get(&self, id: ChequeId) -> Result<&Cheque> {
        self.cheques
            .get(&id)
            .ok_or_else(|| ChequeError::not_found("cheque", id))
    }

    pub fn cheques(&self) -> impl Iterator<Item = &Cheque> {
        self.cheques.values()
    }

    pub fn len(&self) -> usize {
        self.cheques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cheques.is_empty()
    }

    pub fn find_by_serial(&self, serial: &str) -> Option<&Cheque> {
        self.cheques.values().find(|c| c.serial() == serial)
    }

    fn get_mut(&mut self, id: ChequeId) -> Result<&mut Cheque> {
        self.cheques
            .get_mut(&id)
            .ok_or_else(|| ChequeError::not_found("cheque", id))
    }

    fn allocate_id(&mut self) -> ChequeId {
        let id = ChequeId(self.next_id);
        self.next_id += 1;
        id
    }

    // Serial and tracking numbers must be unique among live cheques.
    fn ensure_unique(
        &self,
        serial: &str,
        tracking: Option<&str>,
        except: Option<ChequeId>,
    ) -> Result<()> {
        let others = self
            .cheques
            .values()
            .filter(|c| except.is_none_or(|id| c.id() != id));
        for other in others {
            if other.serial() == serial {
                return Err(ChequeError::validation(format!(
                    "serial number {serial} is already used by cheque {}",
                    other.id()
                )));
            }
            if let (Some(a), Some(b)) = (tracking, other.tracking_number()) {
                if a == b {
                    return Err(ChequeError::validation(format!(
                        "tracking number {a} is already used by cheque {}",
                        other.id()
                    )));
                }
            }
        }
        Ok(())
    }

    fn schedule_reminder(&self, cheque: &Cheque) -> Result<()> {
        let task = self.reminders.task_for(cheque);
        let next_run = task.next_run;
        self.services.scheduler.upsert(task)?;
        debug!(cheque_id = cheque.id().0, %next_run, "reminder scheduled");
        Ok(())
    }

    fn cancel_reminder(&self, id: ChequeId) -> Result<bool> {
        self.services
            .scheduler
            .cancel(TaskKind::DueDateReminder(id))
    }

    /// Create a cheque in `draft`.
    ///
    /// The serial comes from the draft's book when it names one, otherwise
    /// from the incoming or outgoing sequence. A leaf drawn from a book is
    /// consumed even if a later check rejects the cheque.
    pub fn create(&mut self, draft: ChequeDraft) -> Result<ChequeId> {
        draft.ensure_valid()?;
        if let Some(category) = draft.category {
            self.categories.get(category)?;
        }
        if let Some(branch) = draft.branch.as_deref() {
            self.branches.get(branch)?;
        }

        let (serial, tracking) = match draft.book.as_deref() {
            Some(book) => {
                let leaf = self.allocator.next_leaf(book)?;
                (leaf.serial, leaf.tracking_number)
            }
            None => {
                let value = self.services.sequences.next(draft.direction)?;
                (self.sequences.format(draft.direction, value), None)
            }
        };
        self.ensure_unique(&serial, tracking.as_deref(), None)?;

        let id = self.allocate_id();
        let cheque = Cheque::from_draft(id, serial, tracking, draft, self.services.clock.now());
        self.schedule_reminder(&cheque)?;

        info!(
            cheque_id = id.0,
            serial = %cheque.serial(),
            direction = cheque.direction().as_str(),
            amount = %cheque.amount(),
            "cheque created"
        );
        self.cheques.insert(id, cheque);
        Ok(id)
    }

    /// Fire a lifecycle event. On error the cheque is left untouched.
    pub fn fire(
        &mut self,
        id: ChequeId,
        event: ChequeEvent,
    ) -> Result<StateTransition<ChequeState>> {
        let now = self.services.clock.now();
        let cheque = self
            .cheques
            .get_mut(&id)
            .ok_or_else(|| ChequeError::not_found("cheque", id))?;
        let category = cheque
            .category()
            .map(|c| self.categories.get(c))
            .transpose()?;

        let env = TransitionEnv {
            ledger: self.services.ledger.as_ref(),
            notifier: self.services.notifier.as_ref(),
            category,
            branches: &self.branches,
            now,
        };
        let step = self.machine.fire(cheque, &event, &env)?;

        if step.to.is_final() {
            match self.cancel_reminder(id) {
                Ok(_) => debug!(cheque_id = id.0, "reminder cancelled"),
                Err(err) => warn!(cheque_id = id.0, error = %err, "could not cancel reminder"),
            }
        }
        Ok(step)
    }

    pub fn register(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Register)
    }

    pub fn return_to_cashbox(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::ReturnToCashbox)
    }

    pub fn return_to_owner(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::ReturnToOwner)
    }

    pub fn bounce(
        &mut self,
        id: ChequeId,
        reason: BounceReason,
    ) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Bounce { reason })
    }

    /// Deposit into `bank_account`, or the account already on the cheque.
    pub fn deposit(
        &mut self,
        id: ChequeId,
        bank_account: Option<String>,
    ) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Deposit { bank_account })
    }

    pub fn cancel(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Cancel)
    }

    pub fn re_cash(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::ReCash)
    }

    pub fn return_cheque(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Return)
    }

    pub fn clear(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Clear)
    }

    pub fn transfer(
        &mut self,
        id: ChequeId,
        destination: impl Into<String>,
    ) -> Result<StateTransition<ChequeState>> {
        self.fire(
            id,
            ChequeEvent::Transfer {
                destination: destination.into(),
            },
        )
    }

    pub fn receive(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::Receive)
    }

    pub fn revert_to_previous(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::RevertToPrevious)
    }

    pub fn revert_to_draft(&mut self, id: ChequeId) -> Result<StateTransition<ChequeState>> {
        self.fire(id, ChequeEvent::RevertToDraft)
    }

    /// Set the category. Not allowed once registration has locked it.
    pub fn assign_category(&mut self, id: ChequeId, category: CategoryId) -> Result<()> {
        self.categories.get(category)?;
        let cheque = self.get_mut(id)?;
        if cheque.is_category_locked() {
            return Err(ChequeError::guard(
                "assign category",
                cheque.state().name(),
                "category is locked after registration",
            ));
        }
        cheque.category = Some(category);
        Ok(())
    }

    pub fn assign_branch(&mut self, id: ChequeId, code: &str) -> Result<()> {
        self.branches.get(code)?;
        let cheque = self.get_mut(id)?;
        ensure_draft(cheque, "assign branch")?;
        cheque.branch = Some(code.to_string());
        Ok(())
    }

    pub fn set_bank_account(&mut self, id: ChequeId, account: impl Into<String>) -> Result<()> {
        let account = account.into();
        if account.trim().is_empty() {
            return Err(ChequeError::validation("bank account must not be blank"));
        }
        let cheque = self.get_mut(id)?;
        ensure_draft(cheque, "set bank account")?;
        cheque.bank_account = Some(account);
        Ok(())
    }

    /// Move the due date of a draft cheque and reschedule its reminder.
    pub fn set_due_date(&mut self, id: ChequeId, due: NaiveDate) -> Result<()> {
        let cheque = self.get_mut(id)?;
        ensure_draft(cheque, "set due date")?;
        let mut updated = cheque.clone();
        updated.due_date = due;

        self.schedule_reminder(&updated)?;
        self.cheques.insert(id, updated);
        Ok(())
    }

    /// Delete a cheque, keeping a restorable snapshot.
    ///
    /// Refused while the cheque has ledger postings. The serial and
    /// tracking numbers become free for reuse.
    pub fn delete(&mut self, id: ChequeId) -> Result<Uuid> {
        let cheque = self.get(id)?;
        if !cheque.postings().is_empty() {
            return Err(ChequeError::HasPostings {
                serial: cheque.serial().to_string(),
                count: cheque.postings().len(),
            });
        }

        self.cancel_reminder(id)?;
        let cheque = self
            .cheques
            .remove(&id)
            .ok_or_else(|| ChequeError::not_found("cheque", id))?;
        let serial = cheque.serial().to_string();
        let snapshot = self
            .snapshots
            .insert(ChequeSnapshot::new(cheque, self.services.clock.now()));

        info!(cheque_id = id.0, %serial, snapshot = %snapshot, "cheque deleted");
        Ok(snapshot)
    }

    /// Bring a deleted cheque back as a fresh draft with a new id.
    pub fn restore(&mut self, snapshot: Uuid) -> Result<ChequeId> {
        let stored = self.snapshots.get(snapshot)?;
        self.ensure_unique(
            stored.cheque.serial(),
            stored.cheque.tracking_number(),
            None,
        )?;

        let mut cheque = stored.cheque.clone();
        let original = stored.original_id;
        let id = self.allocate_id();
        cheque.id = id;
        cheque.state = ChequeState::Draft;
        cheque.previous_state = None;
        cheque.bounced = false;
        cheque.bounce_reason = None;
        cheque.unlock_category();

        self.schedule_reminder(&cheque)?;
        self.snapshots.remove(snapshot)?;
        info!(
            cheque_id = id.0,
            original_id = original.0,
            serial = %cheque.serial(),
            "cheque restored"
        );
        self.cheques.insert(id, cheque);
        Ok(id)
    }

    /// Add a snapshot taken elsewhere, e.g. loaded from disk.
    pub fn import_snapshot(&mut self, snapshot: ChequeSnapshot) -> Uuid {
        self.snapshots.insert(snapshot)
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Drop snapshots older than the retention period.
    pub fn purge_snapshots(&mut self) -> usize {
        self.snapshots
            .purge_expired(self.services.clock.now(), self.retention)
    }

    fn send_reminder(&self, cheque: &Cheque) -> Result<()> {
        self.services.notifier.notify(Notification::new(
            &self.reminder_recipient,
            "Cheque due date reminder",
            format!(
                "Reminder: Cheque {} with due date {} is nearing. Please take action.",
                cheque.serial(),
                cheque.due_date()
            ),
        ))
    }

    /// One run of a cheque's scheduled reminder job.
    ///
    /// Sends a notification whenever today is on or after the trigger
    /// date, so repeated runs may notify more than once.
    pub fn run_reminder(&self, id: ChequeId) -> Result<bool> {
        let cheque = self.get(id)?;
        if !self
            .reminders
            .is_due(cheque, self.services.clock.today())
        {
            return Ok(false);
        }
        self.send_reminder(cheque)?;
        info!(cheque_id = id.0, serial = %cheque.serial(), "due date reminder sent");
        Ok(true)
    }

    /// Sweep every registered cheque and remind about the ones coming due.
    /// Returns how many reminders went out.
    pub fn run_due_reminders(&self) -> Result<usize> {
        let today = self.services.clock.today();
        let mut sent = 0;
        for cheque in self
            .cheques
            .values()
            .filter(|c| c.state() == ChequeState::Registered)
            .filter(|c| self.reminders.is_due(c, today))
        {
            self.send_reminder(cheque)?;
            sent += 1;
        }
        if sent > 0 {
            info!(sent, "due date reminders sent");
        }
        Ok(sent)
    }

    pub fn status_report(&self, id: ChequeId) -> Result<StatusReport> {
        let cheque = self.get(id)?;
        Ok(StatusReport::for_cheque(
            cheque,
            self.services.clock.today(),
        ))
    }

    /// Open cheques grouped by when they fall due.
    pub fn due_buckets(&self) -> DueBuckets {
        let periods = DuePeriods::around(self.services.clock.today());
        DueBuckets::collect(
            self.cheques.values().filter(|c| !c.is_terminal()),
            &periods,
        )
    }
}

fn ensure_draft(cheque: &Cheque, operation: &str) -> Result<()> {
    if cheque.state() == ChequeState::Draft {
        Ok(())
    } else {
        Err(ChequeError::guard(
            operation,
            cheque.state().name(),
            "only allowed while in draft",
        ))
    }
}
