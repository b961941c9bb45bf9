//! Data models for titles, loans, fines and borrowers

pub mod borrower;
pub mod enums;
pub mod fine;
pub mod loan;
pub mod notification;
pub mod stats;
pub mod title;

pub use borrower::Borrower;
pub use enums::{BorrowerRole, FineStatus, LoanStatus};
pub use fine::Fine;
pub use loan::Loan;
pub use title::Title;
