//! Unit tests for the ledger bounded context.
