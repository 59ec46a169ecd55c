//! Chequeflow: cheque books, cheque lifecycles and payment processors.
//!
//! The crate keeps a pure core and pushes I/O to the edges. Books, cheques and
//! fee policies are plain values validated on construction. The lifecycle
//! is a declarative transition table whose effects talk to the outside world
//! only through the traits in [`ports`].
//!
//! # Core Concepts
//!
//! - **Allocator**: hands out each serial of a [`ChequeBook`](model::ChequeBook)
//!   exactly once, also under concurrent use
//! - **Lifecycle**: guarded transitions between [`ChequeState`](model::ChequeState)s,
//!   with a one-level revert and an append-only history
//! - **Archive**: deleted cheques are kept as [`ChequeSnapshot`](checkpoint::ChequeSnapshot)s
//!   until restored or purged
//! - **Processors**: fee schedules plus limit and pattern enforcement
//!
//! # Example
//!
//! ```rust
//! use chequeflow::config::ChequeConfig;
//! use chequeflow::model::{Category, CategoryId, ChequeDraft, ChequeState, Direction};
//! use chequeflow::ports::{MemoryLedger, MemoryNotifier, MemoryScheduler, MemorySequences, SystemClock};
//! use chequeflow::registry::{ChequeRegistry, Services};
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let services = Services {
//!     ledger: Arc::new(MemoryLedger::new()),
//!     sequences: Arc::new(MemorySequences::new()),
//!     notifier: Arc::new(MemoryNotifier::new()),
//!     scheduler: Arc::new(MemoryScheduler::new()),
//!     clock: Arc::new(SystemClock),
//! };
//! let mut registry = ChequeRegistry::new(services, &ChequeConfig::default())?;
//! registry.add_category(Category::new(CategoryId(1), "Receivables", "1100", "4000", "CHQ"))?;
//!
//! let due = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
//! let id = registry.create(
//!     ChequeDraft::new(Direction::Incoming, Decimal::from(1_000), "Acme", due)
//!         .with_category(CategoryId(1)),
//! )?;
//! registry.register(id)?;
//! assert_eq!(registry.get(id)?.state(), ChequeState::Registered);
//! # Ok::<(), chequeflow::ChequeError>(())
//! ```

pub mod allocator;
pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod effects;
pub mod enforcement;
pub mod error;
pub mod logging;
pub mod model;
pub mod ports;
pub mod processor;
pub mod registry;
pub mod reminder;

// Re-export commonly used types
pub use allocator::ChequeBookAllocator;
pub use config::ChequeConfig;
pub use core::{Guard, State, StateHistory, StateTransition};
pub use effects::{ChequeEvent, StateMachine};
pub use error::{ChequeError, Result};
pub use processor::PaymentProcessor;
pub use registry::{ChequeRegistry, Services};
