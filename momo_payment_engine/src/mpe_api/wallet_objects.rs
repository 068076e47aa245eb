use momo_common::Fcfa;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    db_types::{WalletAccount, WalletTransaction, WalletTransactionStatus},
    traits::WalletError,
};

pub const MIN_DEPOSIT_NUMBER_LENGTH: usize = 4;
pub const MIN_CLAIM_TID_LENGTH: usize = 3;

/// A customer's statement that they have sent money to the merchant's number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupClaim {
    pub deposit_number: String,
    pub amount: Fcfa,
    pub tid: String,
}

impl TopupClaim {
    pub fn new<S: Into<String>, T: Into<String>>(deposit_number: S, amount: Fcfa, tid: T) -> Self {
        Self { deposit_number: deposit_number.into(), amount, tid: tid.into() }
    }

    /// Trims the fields and checks their lengths and the amount.
    pub fn validated(self) -> Result<Self, WalletError> {
        let deposit_number = self.deposit_number.trim().to_string();
        let tid = self.tid.trim().to_string();
        if deposit_number.chars().count() < MIN_DEPOSIT_NUMBER_LENGTH {
            return Err(WalletError::Validation(format!(
                "the deposit number must be at least {MIN_DEPOSIT_NUMBER_LENGTH} characters long"
            )));
        }
        if tid.chars().count() < MIN_CLAIM_TID_LENGTH {
            return Err(WalletError::Validation(format!(
                "the transaction id must be at least {MIN_CLAIM_TID_LENGTH} characters long"
            )));
        }
        if !self.amount.is_positive() {
            return Err(WalletError::Validation("the amount must be positive".into()));
        }
        Ok(Self { deposit_number, amount: self.amount, tid })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupConfirmation {
    pub transaction: WalletTransaction,
    /// The account balance after the confirmation.
    pub balance: Fcfa,
    /// False when the top-up had already been confirmed and nothing changed.
    pub credited: bool,
}

impl TopupConfirmation {
    pub fn status(&self) -> WalletTransactionStatus {
        self.transaction.status
    }
}

/// An entry in the top-up review queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupSummary {
    pub user_id: String,
    pub transaction: WalletTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub account: WalletAccount,
    /// Newest first
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub user_id: String,
    /// The balance stored on the account
    pub recorded: Fcfa,
    /// The signed sum of the account's completed transactions
    pub computed: Fcfa,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded == self.computed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn claims_are_trimmed_and_checked() {
        let claim = TopupClaim::new(" 677123456 ", Fcfa::from(2_000), " PP1234 ").validated().unwrap();
        assert_eq!(claim.deposit_number, "677123456");
        assert_eq!(claim.tid, "PP1234");

        assert!(matches!(TopupClaim::new("677", Fcfa::from(2_000), "PP1234").validated(), Err(WalletError::Validation(_))));
        assert!(TopupClaim::new("677123456", Fcfa::from(2_000), "P1").validated().is_err());
        assert!(TopupClaim::new("677123456", Fcfa::from(0), "PP1234").validated().is_err());
    }
}
