//! Payment settlement procedure
//!
//! Debits a user's virtual card as one atomic unit. The whole procedure
//! runs while holding the card's ledger entry, so the balance check, the
//! balance update and the transaction append can never interleave with
//! another settlement on the same card.
//!
//! Preconditions are checked in a fixed order, each with its own failure:
//!
//! 1. card exists and matches number, expiry and CVV (`AuthenticationFailed`)
//! 2. card is active (`CardInactive`)
//! 3. reference has not been charged before (`DuplicateReference`)
//! 4. balance covers the amount (`InsufficientBalance`)
//!
//! A failed settlement leaves the card and its log untouched.

use super::ledger::{card_number_digest, cvv_digest, VirtualLedger};
use crate::types::{
    CardDetails, CardStatus, MinorUnits, SettlementReceipt, TicketingError, TransactionStatus,
    VirtualTransaction,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

impl VirtualLedger {
    /// Settle a charge against a user's card
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the card
    /// * `details` - Card credentials as presented; whitespace in the number is ignored
    /// * `amount` - Positive amount in minor units
    /// * `reference` - Caller-supplied correlation key, unique per charge
    /// * `description` - Free text stored on the transaction
    ///
    /// # Errors
    ///
    /// `ValidationError` for a non-positive amount or an empty reference,
    /// otherwise the precondition failures listed in the module docs.
    pub fn settle(
        &self,
        user_id: &str,
        details: &CardDetails,
        amount: MinorUnits,
        reference: &str,
        description: Option<&str>,
    ) -> Result<SettlementReceipt, TicketingError> {
        if amount <= 0 {
            return Err(TicketingError::validation(format!(
                "settlement amount must be positive, got {}",
                amount
            )));
        }
        if reference.trim().is_empty() {
            return Err(TicketingError::validation(
                "settlement reference must not be empty",
            ));
        }

        // Unknown users fail exactly like wrong credentials.
        let mut account = self
            .accounts
            .get_mut(user_id)
            .ok_or(TicketingError::AuthenticationFailed)?;

        let number = details.cleaned_number();
        let card = &account.card;
        if card.card_number_hash != card_number_digest(&number)
            || card.expiry_date != details.expiry.trim()
            || card.cvv_hash != cvv_digest(&number, details.cvv.trim())
        {
            return Err(TicketingError::AuthenticationFailed);
        }

        if card.status != CardStatus::Active {
            return Err(TicketingError::card_inactive(card.status));
        }

        if self.references.contains_key(reference) {
            return Err(TicketingError::duplicate_reference(reference));
        }

        let balance_before = card.balance;
        if balance_before < amount {
            return Err(TicketingError::insufficient_balance(balance_before, amount));
        }

        let balance_after = balance_before
            .checked_sub(amount)
            .ok_or_else(|| TicketingError::arithmetic_overflow("settlement"))?;

        let transaction_id = Uuid::new_v4().to_string();
        match self.references.entry(reference.to_string()) {
            Entry::Occupied(_) => return Err(TicketingError::duplicate_reference(reference)),
            Entry::Vacant(slot) => {
                slot.insert(transaction_id.clone());
            }
        }

        let now = Utc::now();
        let card_id = account.card.id.clone();
        let currency = account.card.currency.clone();

        account.transactions.push(VirtualTransaction {
            id: transaction_id.clone(),
            card_id,
            user_id: user_id.to_string(),
            amount,
            balance_before,
            balance_after,
            reference: reference.to_string(),
            description: description.map(str::to_string),
            status: TransactionStatus::Completed,
            created_at: now,
        });
        account.card.balance = balance_after;
        account.card.updated_at = now;

        Ok(SettlementReceipt {
            transaction_id,
            amount_charged: amount,
            balance_before,
            balance_after,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::{funded_ledger, test_card};
    use rstest::rstest;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_settle_debits_balance() {
        let ledger = funded_ledger("u1", 100_000);

        let receipt = ledger
            .settle("u1", &test_card(), 30_000, "WC2030-ABC", Some("2 tickets"))
            .unwrap();

        assert_eq!(receipt.amount_charged, 30_000);
        assert_eq!(receipt.balance_before, 100_000);
        assert_eq!(receipt.balance_after, 70_000);
        assert_eq!(receipt.currency, "MAD");
        assert_eq!(ledger.get_card("u1").unwrap().balance, 70_000);

        let transactions = ledger.transactions("u1");
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].id, receipt.transaction_id);
        assert_eq!(transactions[0].balance_before, 100_000);
        assert_eq!(transactions[0].balance_after, 70_000);
        assert_eq!(transactions[0].status, TransactionStatus::Completed);
        assert_eq!(transactions[0].description.as_deref(), Some("2 tickets"));
        assert_eq!(
            ledger.transaction_for_reference("WC2030-ABC"),
            Some(receipt.transaction_id)
        );
    }

    #[test]
    fn test_insufficient_balance_leaves_card_untouched() {
        let ledger = funded_ledger("u1", 10_000);

        let result = ledger.settle("u1", &test_card(), 30_000, "WC2030-ABC", None);

        assert_eq!(result, Err(TicketingError::insufficient_balance(10_000, 30_000)));
        assert_eq!(ledger.get_card("u1").unwrap().balance, 10_000);
        assert!(ledger.transactions("u1").is_empty());
        assert!(ledger.transaction_for_reference("WC2030-ABC").is_none());
    }

    #[test]
    fn test_exact_balance_can_be_spent() {
        let ledger = funded_ledger("u1", 30_000);
        let receipt = ledger.settle("u1", &test_card(), 30_000, "R1", None).unwrap();
        assert_eq!(receipt.balance_after, 0);
    }

    #[rstest]
    #[case::wrong_number("4242 4242 4242 4241", "12/30", "123")]
    #[case::wrong_expiry("4242 4242 4242 4242", "11/30", "123")]
    #[case::wrong_cvv("4242 4242 4242 4242", "12/30", "321")]
    fn test_mismatched_credentials_fail_authentication(
        #[case] number: &str,
        #[case] expiry: &str,
        #[case] cvv: &str,
    ) {
        let ledger = funded_ledger("u1", 100_000);
        let details = CardDetails::new(number, expiry, cvv);

        let result = ledger.settle("u1", &details, 100, "R1", None);

        assert_eq!(result, Err(TicketingError::AuthenticationFailed));
        assert_eq!(ledger.get_card("u1").unwrap().balance, 100_000);
    }

    #[test]
    fn test_unformatted_number_authenticates() {
        let ledger = funded_ledger("u1", 1_000);
        let details = CardDetails::new("4242424242424242", "12/30", "123");
        assert!(ledger.settle("u1", &details, 100, "R1", None).is_ok());
    }

    #[test]
    fn test_unknown_user_fails_authentication() {
        let ledger = funded_ledger("u1", 1_000);
        assert_eq!(
            ledger.settle("u2", &test_card(), 100, "R1", None),
            Err(TicketingError::AuthenticationFailed)
        );
    }

    #[rstest]
    #[case(CardStatus::Suspended)]
    #[case(CardStatus::Expired)]
    fn test_inactive_card_is_refused(#[case] status: CardStatus) {
        let ledger = funded_ledger("u1", 1_000);
        ledger.set_card_status("u1", status).unwrap();

        let result = ledger.settle("u1", &test_card(), 100, "R1", None);

        assert_eq!(result, Err(TicketingError::card_inactive(status)));
    }

    #[test]
    fn test_authentication_is_checked_before_status_and_balance() {
        let ledger = funded_ledger("u1", 10);
        ledger.set_card_status("u1", CardStatus::Suspended).unwrap();
        let wrong = CardDetails::new("4000 0000 0000 0002", "12/30", "123");

        assert_eq!(
            ledger.settle("u1", &wrong, 1_000, "R1", None),
            Err(TicketingError::AuthenticationFailed)
        );
    }

    #[rstest]
    #[case::zero(0, "R1")]
    #[case::negative(-5, "R1")]
    #[case::blank_reference(100, "  ")]
    fn test_invalid_input_rejected(#[case] amount: MinorUnits, #[case] reference: &str) {
        let ledger = funded_ledger("u1", 1_000);
        let result = ledger.settle("u1", &test_card(), amount, reference, None);
        assert!(matches!(result, Err(TicketingError::ValidationError { .. })));
        assert!(ledger.transactions("u1").is_empty());
    }

    #[test]
    fn test_reference_cannot_be_charged_twice() {
        let ledger = funded_ledger("u1", 100_000);
        ledger.settle("u1", &test_card(), 100, "R1", None).unwrap();

        let result = ledger.settle("u1", &test_card(), 100, "R1", None);

        assert_eq!(result, Err(TicketingError::duplicate_reference("R1")));
        assert_eq!(ledger.get_card("u1").unwrap().balance, 99_900);
        assert_eq!(ledger.transactions("u1").len(), 1);
    }

    #[test]
    fn test_transaction_chain_is_consistent() {
        let ledger = funded_ledger("u1", 10_000);
        for (n, amount) in [2_500, 4_000, 9_999, 1_000, 2_500].into_iter().enumerate() {
            let _ = ledger.settle("u1", &test_card(), amount, &format!("R{}", n), None);
        }

        let transactions = ledger.transactions("u1");
        for pair in transactions.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
        }
        for transaction in &transactions {
            assert_eq!(
                transaction.balance_after,
                transaction.balance_before - transaction.amount
            );
        }
        assert_eq!(
            ledger.get_card("u1").unwrap().balance,
            transactions.last().unwrap().balance_after
        );
        assert_eq!(ledger.get_card("u1").unwrap().balance, 0);
    }

    #[test]
    fn test_concurrent_settlements_never_overdraw() {
        let ledger = Arc::new(funded_ledger("u1", 10_000));

        let handles: Vec<_> = (0..32)
            .map(|n| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    ledger
                        .settle("u1", &test_card(), 1_000, &format!("R{}", n), None)
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 10);
        assert_eq!(ledger.get_card("u1").unwrap().balance, 0);
        assert_eq!(ledger.transactions("u1").len(), 10);
    }
}
