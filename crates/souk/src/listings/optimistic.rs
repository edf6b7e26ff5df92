//! The reusable flip-then-confirm protocol for toggle-style mutations.
//!
//! A toggle records the prior value, applies the speculative one locally, and
//! then either commits the server's confirmed value or rolls back to the
//! prior one. Every optimistic mutation in the session goes through this type
//! instead of hand-rolled list surgery.

/// An applied-but-unconfirmed value change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimistic<T> {
    prior: T,
    speculative: T,
}

impl<T> Optimistic<T> {
    /// Record a flip that has just been applied locally.
    pub fn applied(prior: T, speculative: T) -> Self {
        Self { prior, speculative }
    }

    pub fn prior(&self) -> &T {
        &self.prior
    }

    pub fn speculative(&self) -> &T {
        &self.speculative
    }

    /// The server confirmed; its value wins over the speculative one. The
    /// speculative value was only provisional truth until now.
    pub fn commit(self, confirmed: T) -> T {
        confirmed
    }

    /// The call failed; restore the prior value.
    pub fn rollback(self) -> T {
        self.prior
    }
}
