//! Domain records: books, cheques, categories and branches.

mod book;
mod branch;
mod category;
mod cheque;

pub use book::{
    BookStatus, ChequeBook, IssuedLeaf, Leaf, SerialRange, DEFAULT_LOW_WATER_MARK,
    MAX_GENERATED_LEAVES,
};
pub use branch::{Branch, BranchDirectory, TransferState};
pub use category::{Category, CategoryId, CategoryTree};
pub use cheque::{BounceReason, Cheque, ChequeDraft, ChequeId, ChequeState, Direction};
