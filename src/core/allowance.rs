//! Per-user ticket limit
//!
//! A user may hold at most `max_per_user` purchases across all matches.
//! The counter never resets.

use crate::types::TicketingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketAllowance {
    max_per_user: u32,
}

impl TicketAllowance {
    pub fn new(max_per_user: u32) -> Self {
        Self { max_per_user }
    }

    pub fn max_per_user(&self) -> u32 {
        self.max_per_user
    }

    /// `max - purchased`, floored at zero
    pub fn remaining(&self, purchased: usize) -> u32 {
        let purchased = u32::try_from(purchased).unwrap_or(u32::MAX);
        self.max_per_user.saturating_sub(purchased)
    }

    /// Admit `requested` more tickets, returning the allowance left afterwards
    ///
    /// # Errors
    ///
    /// `TicketLimitExceeded` when `requested` is larger than the remaining
    /// allowance (which includes every request once the allowance is zero).
    pub fn check(&self, purchased: usize, requested: u32) -> Result<u32, TicketingError> {
        let remaining = self.remaining(purchased);
        if remaining == 0 || requested > remaining {
            return Err(TicketingError::ticket_limit_exceeded(requested, remaining));
        }
        Ok(remaining - requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::fresh_user(0, 4)]
    #[case::three_bought(3, 1)]
    #[case::at_limit(4, 0)]
    #[case::above_limit(9, 0)]
    fn test_remaining(#[case] purchased: usize, #[case] expected: u32) {
        assert_eq!(TicketAllowance::new(4).remaining(purchased), expected);
    }

    #[test]
    fn test_exactly_remaining_is_admitted() {
        let allowance = TicketAllowance::new(4);
        assert_eq!(allowance.check(3, 1), Ok(0));
        assert_eq!(allowance.check(0, 4), Ok(0));
    }

    #[test]
    fn test_one_over_remaining_is_rejected() {
        let allowance = TicketAllowance::new(4);
        assert_eq!(
            allowance.check(3, 2),
            Err(TicketingError::ticket_limit_exceeded(2, 1))
        );
    }

    #[test]
    fn test_exhausted_allowance_rejects_everything() {
        let allowance = TicketAllowance::new(4);
        assert_eq!(
            allowance.check(4, 0),
            Err(TicketingError::ticket_limit_exceeded(0, 0))
        );
    }
}
