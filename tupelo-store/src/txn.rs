//! Transaction bracket: begin / commit / abort / end
//!
//! The storage engine is bracketed by an external transaction layer
//! that serializes writers and makes multi-index updates atomic and
//! durable (journaling is not this crate's concern). `TxnCoordinator`
//! enforces the part the engine itself must see: single writer, many
//! readers — a second concurrent write begin is *rejected* with a
//! retryable error, never queued.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tupelo_core::{Error, Result};

/// Transaction mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxnMode {
    Read,
    Write,
}

#[derive(Debug, PartialEq, Eq)]
enum TxnOutcome {
    Active,
    Committed,
    Aborted,
}

/// Single-writer / multi-reader admission control.
#[derive(Debug, Default)]
pub struct TxnCoordinator {
    writer_active: AtomicBool,
    readers: AtomicUsize,
}

impl TxnCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a transaction.
    ///
    /// A write begin while another writer is active fails with
    /// [`Error::WriteContention`]; the caller may retry after the
    /// active writer ends. Read begins always succeed.
    pub fn begin(&self, mode: TxnMode) -> Result<Txn<'_>> {
        match mode {
            TxnMode::Write => {
                if self
                    .writer_active
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return Err(Error::WriteContention);
                }
            }
            TxnMode::Read => {
                self.readers.fetch_add(1, Ordering::AcqRel);
            }
        }
        Ok(Txn {
            coordinator: self,
            mode,
            outcome: TxnOutcome::Active,
        })
    }

    /// Returns `true` while a write transaction is active.
    pub fn writer_active(&self) -> bool {
        self.writer_active.load(Ordering::Acquire)
    }

    /// Number of read transactions currently active.
    pub fn active_readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }
}

/// One open transaction. Dropping it is `end()`: the slot is released
/// whatever the outcome, and an active transaction that was never
/// committed counts as aborted.
pub struct Txn<'a> {
    coordinator: &'a TxnCoordinator,
    mode: TxnMode,
    outcome: TxnOutcome,
}

impl Txn<'_> {
    pub fn mode(&self) -> TxnMode {
        self.mode
    }

    /// Mark the transaction committed. Fails if already finished.
    pub fn commit(&mut self) -> Result<()> {
        if self.outcome != TxnOutcome::Active {
            return Err(Error::storage("transaction already finished"));
        }
        self.outcome = TxnOutcome::Committed;
        Ok(())
    }

    /// Mark the transaction aborted. Idempotent on a finished txn.
    pub fn abort(&mut self) {
        if self.outcome == TxnOutcome::Active {
            self.outcome = TxnOutcome::Aborted;
        }
    }

    /// Returns `true` once `commit` has succeeded.
    pub fn committed(&self) -> bool {
        self.outcome == TxnOutcome::Committed
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        match self.mode {
            TxnMode::Write => self
                .coordinator
                .writer_active
                .store(false, Ordering::Release),
            TxnMode::Read => {
                self.coordinator.readers.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }
}

impl fmt::Debug for Txn<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Txn")
            .field("mode", &self.mode)
            .field("outcome", &self.outcome)
            .finish()
    }
}
