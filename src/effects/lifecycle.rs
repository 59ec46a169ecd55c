//! The standard cheque lifecycle table.

use crate::builder::{simple_transition, BuildError, StateMachineBuilder, TransitionBuilder};
use crate::core::State;
use crate::effects::machine::StateMachine;
use crate::effects::transition::{ChequeEvent, EventKind, Step};
use crate::error::{ChequeError, Result};
use crate::model::{Cheque, ChequeState, Direction, TransferState};
use crate::ports::{Notification, PostingRequest};
use tracing::warn;

use ChequeState::*;

/// States a non-bounced cheque can be returned from.
const RETURNABLE: &[ChequeState] = &[Registered, Deposited, Transferred, ReturnCashbox, ReturnOwner];

impl StateMachine {
    /// The full cheque lifecycle.
    ///
    /// | event | from | to |
    /// |---|---|---|
    /// | register | draft | registered |
    /// | return_to_cashbox | bounced, registered, done | return_cashbox |
    /// | return_to_owner | return_cashbox | return_owner |
    /// | bounce | registered, deposited | bounced |
    /// | deposit | registered, deposited | deposited |
    /// | cancel | any non-terminal | cancelled |
    /// | re_cash | returned | deposited |
    /// | return | bounced, registered, deposited, transferred, return_cashbox, return_owner | returned |
    /// | clear | deposited | done |
    /// | transfer | registered | transferred |
    /// | receive | transferred | registered |
    /// | revert_to_previous | any | previous state, or draft |
    /// | revert_to_draft | any but draft | draft |
    pub fn standard() -> std::result::Result<Self, BuildError> {
        let open: Vec<ChequeState> = ChequeState::ALL
            .iter()
            .copied()
            .filter(|s| !s.is_final())
            .collect();
        let not_draft: Vec<ChequeState> = ChequeState::ALL
            .iter()
            .copied()
            .filter(|s| *s != Draft)
            .collect();

        StateMachineBuilder::new()
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Register)
                    .from(Draft)
                    .to(Registered)
                    .when("category assigned", |c: &Cheque| c.category.is_some())
                    .effect(register),
            )?
            .add_transition(simple_transition(
                EventKind::ReturnToCashbox,
                &[Bounced, Registered, Done],
                ReturnCashbox,
            ))
            .add_transition(simple_transition(
                EventKind::ReturnToOwner,
                &[ReturnCashbox],
                ReturnOwner,
            ))
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Bounce)
                    .from_any(&[Registered, Deposited])
                    .to(Bounced)
                    .effect(bounce),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Deposit)
                    .from_any(&[Registered, Deposited])
                    .to(Deposited)
                    .when("posted move exists", |c: &Cheque| !c.postings.is_empty())
                    .effect(deposit),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Cancel)
                    .from_any(&open)
                    .to(Cancelled)
                    .when("at least one posting", |c: &Cheque| !c.postings.is_empty())
                    .effect(cancel_postings),
            )?
            .add_transition(simple_transition(EventKind::ReCash, &[Returned], Deposited))
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Return)
                    .from(Bounced)
                    .to(Returned)
                    .when("bounced flag set", |c: &Cheque| c.bounced)
                    .effect(return_bounced),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Return)
                    .from_any(RETURNABLE)
                    .to(Returned)
                    .when("not bounced", |c: &Cheque| !c.bounced)
                    .effect(return_unbounced),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Clear)
                    .from(Deposited)
                    .to(Done)
                    .effect(|c, step| {
                        c.cashed_date = Some(step.env.today());
                        Ok(())
                    }),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Transfer)
                    .from(Registered)
                    .to(Transferred)
                    .when("branch assigned", |c: &Cheque| c.branch.is_some())
                    .effect(send_transfer),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::Receive)
                    .from(Transferred)
                    .to(Registered)
                    .when("transfer outgoing", |c: &Cheque| {
                        c.transfer_state == TransferState::Outgoing
                    })
                    .effect(receive_transfer),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::RevertToPrevious)
                    .from_any(ChequeState::ALL)
                    .to_resolved(|c: &Cheque| c.previous_state.unwrap_or(Draft))
                    .effect(revert),
            )?
            .transition(
                TransitionBuilder::new()
                    .on(EventKind::RevertToDraft)
                    .from_any(&not_draft)
                    .to(Draft)
                    .effect(revert),
            )?
            .build()
    }
}

fn reference(cheque: &Cheque, what: &str) -> String {
    format!("Cheque {} {}", cheque.serial, what)
}

fn require<'c>(value: &'c Option<String>, what: &str, cheque: &Cheque) -> Result<&'c str> {
    value.as_deref().ok_or_else(|| {
        ChequeError::validation(format!("cheque {} has no {what}", cheque.serial))
    })
}

fn post(cheque: &mut Cheque, step: &Step<'_, '_>, request: PostingRequest) -> Result<()> {
    let id = step.env.ledger.post(request)?;
    cheque.postings.push(id);
    Ok(())
}

fn notify(step: &Step<'_, '_>, recipient: Option<&str>, subject: &str, message: String) {
    let Some(recipient) = recipient else {
        return;
    };
    if let Err(err) = step
        .env
        .notifier
        .notify(Notification::new(recipient, subject, message))
    {
        warn!(recipient, error = %err, "notification failed");
    }
}

fn register(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    let category = step
        .env
        .category
        .filter(|c| Some(c.id) == cheque.category)
        .ok_or_else(|| {
            ChequeError::validation(format!(
                "category for cheque {} was not supplied",
                cheque.serial
            ))
        })?;
    if !category.active {
        return Err(ChequeError::validation(format!(
            "category '{}' is archived",
            category.name
        )));
    }

    let request = PostingRequest::transfer(
        category.journal.clone(),
        step.env.today(),
        reference(cheque, "registration"),
        &category.debit_account,
        &category.credit_account,
        cheque.amount,
    );
    post(cheque, step, request)?;

    cheque.debit_account = Some(category.debit_account.clone());
    cheque.credit_account = Some(category.credit_account.clone());
    cheque.journal = Some(category.journal.clone());
    cheque.category_locked = true;
    Ok(())
}

// Reverses the registration entry.
fn reversal(cheque: &Cheque, step: &Step<'_, '_>, what: &str) -> Result<PostingRequest> {
    let debit = require(&cheque.debit_account, "debit account", cheque)?;
    let credit = require(&cheque.credit_account, "credit account", cheque)?;
    let journal = require(&cheque.journal, "journal", cheque)?;
    Ok(PostingRequest::transfer(
        journal,
        step.env.today(),
        reference(cheque, what),
        credit,
        debit,
        cheque.amount,
    ))
}

fn bounce(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    let ChequeEvent::Bounce { reason } = step.event else {
        return Err(ChequeError::validation("bounce needs a reason"));
    };
    let request = reversal(cheque, step, "bounce")?;
    post(cheque, step, request)?;
    cheque.bounced = true;
    cheque.bounce_reason = Some(*reason);
    Ok(())
}

fn deposit(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    if let ChequeEvent::Deposit {
        bank_account: Some(account),
    } = step.event
    {
        cheque.bank_account = Some(account.clone());
    }
    let bank = require(&cheque.bank_account, "bank account", cheque)?.to_string();
    let journal = require(&cheque.journal, "journal", cheque)?.to_string();

    let (debit, credit) = match cheque.direction {
        Direction::Incoming => (
            bank.clone(),
            require(&cheque.debit_account, "debit account", cheque)?.to_string(),
        ),
        Direction::Outgoing => (
            require(&cheque.credit_account, "credit account", cheque)?.to_string(),
            bank.clone(),
        ),
    };

    let request = PostingRequest::transfer(
        journal,
        step.env.today(),
        reference(cheque, "deposit"),
        &debit,
        &credit,
        cheque.amount,
    );
    post(cheque, step, request)
}

fn cancel_postings(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    step.env.ledger.cancel(&cheque.postings)?;
    cheque.postings.clear();
    Ok(())
}

fn return_bounced(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    cancel_postings(cheque, step)?;
    cheque.return_date = Some(step.env.today());
    Ok(())
}

fn return_unbounced(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    let request = reversal(cheque, step, "return")?;
    post(cheque, step, request)?;
    cheque.return_date = Some(step.env.today());
    Ok(())
}

fn send_transfer(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    let ChequeEvent::Transfer { destination } = step.event else {
        return Err(ChequeError::validation("transfer needs a destination"));
    };
    let branches = step.env.branches;
    let source_code = require(&cheque.branch, "branch", cheque)?.to_string();
    let source = branches.get(&source_code)?;
    let target = branches.get(destination)?;
    if !branches.can_transfer(&source.code, &target.code) {
        return Err(ChequeError::validation(format!(
            "branch {} may not transfer cheques to {}",
            source.code, target.code
        )));
    }

    let credit = require(&cheque.credit_account, "credit account", cheque)?.to_string();
    let request = PostingRequest::transfer(
        source.default_journal.clone(),
        step.env.today(),
        reference(cheque, "transfer out"),
        &source.transit_account,
        &credit,
        cheque.amount,
    );
    post(cheque, step, request)?;

    cheque.transfer_state = TransferState::Outgoing;
    cheque.transfer_source = Some(source.code.clone());
    cheque.transfer_destination = Some(target.code.clone());

    notify(
        step,
        target.manager.as_deref(),
        "Incoming cheque transfer",
        format!(
            "Cheque {} for {} is on its way from {}",
            cheque.serial,
            cheque.amount,
            source.display_name()
        ),
    );
    Ok(())
}

fn receive_transfer(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    let branches = step.env.branches;
    let source = branches.get(require(&cheque.transfer_source, "transfer source", cheque)?)?;
    let target = branches.get(require(
        &cheque.transfer_destination,
        "transfer destination",
        cheque,
    )?)?;

    let debit = require(&cheque.debit_account, "debit account", cheque)?.to_string();
    let request = PostingRequest::transfer(
        target.default_journal.clone(),
        step.env.today(),
        reference(cheque, "transfer in"),
        &debit,
        &target.transit_account,
        cheque.amount,
    );
    post(cheque, step, request)?;

    cheque.branch = Some(target.code.clone());
    cheque.transfer_state = TransferState::Completed;

    notify(
        step,
        source.manager.as_deref(),
        "Cheque transfer received",
        format!(
            "Cheque {} was received by {}",
            cheque.serial,
            target.display_name()
        ),
    );
    Ok(())
}

/// Landing in draft undoes registration: postings go back to draft and are
/// unlinked, and the category can be changed again. Leaving `bounced`
/// clears the bounce marker.
fn revert(cheque: &mut Cheque, step: &Step<'_, '_>) -> Result<()> {
    if step.from == Bounced {
        cheque.bounced = false;
        cheque.bounce_reason = None;
    }
    if step.to == Draft {
        step.env.ledger.reset_to_draft(&cheque.postings)?;
        cheque.postings.clear();
        cheque.unlock_category();
    }
    Ok(())
}
