//! Application services for the credit ledger.

mod transfer;

pub use transfer::{
    CreditTransferError, CreditTransferResult, CreditTransferService, TransferRequest,
};
