//! Transaction Status
//!
//! Validation outcome of a draft. Expected domain conditions land here per
//! field; they are never raised as errors.

use std::collections::BTreeMap;
use std::fmt;

/// Draft field a status entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusField {
    Recipient,
    Amount,
    Fees,
    Validators,
    Era,
    /// Account-level staking preconditions
    Staking,
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusField::Recipient => "recipient",
            StatusField::Amount => "amount",
            StatusField::Fees => "fees",
            StatusField::Validators => "validators",
            StatusField::Era => "era",
            StatusField::Staking => "staking",
        };
        f.write_str(name)
    }
}

/// Blocking validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("Recipient is required")]
    RecipientRequired,

    #[error("Invalid recipient address {0}")]
    InvalidAddress(String),

    #[error("Recipient is the sending account")]
    InvalidAddressBecauseDestinationIsAlsoSource,

    #[error("Amount is required")]
    AmountRequired,

    #[error("Not enough balance")]
    NotEnoughBalance,

    #[error("Recipient does not exist yet; send at least {minimum}")]
    NotEnoughBalanceBecauseDestinationNotCreated { minimum: u128 },

    #[error("Remaining balance would be below the existential deposit; send max instead")]
    DoMaxSendInstead,

    #[error("Fees are not loaded")]
    FeeNotLoaded,

    #[error("Staking is locked while the validator election is open")]
    ElectionOpen,

    #[error("Account is not allowed to perform this operation")]
    UnauthorizedOperation,

    #[error("Not enough bonded funds")]
    NotEnoughBonded,

    #[error("Too many unlocking chunks, at most {max}")]
    MaxUnbonding { max: usize },

    #[error("Not enough unlocking funds")]
    NotEnoughUnlocking,

    #[error("No unlocked funds to withdraw")]
    NoUnlockedBalance,

    #[error("At least one validator is required")]
    ValidatorsRequired,

    #[error("Too many validators, at most {max}")]
    TooManyValidators { max: usize },

    #[error("{0} is not a validator")]
    NotValidator(String),

    #[error("Account has no nominations")]
    NoNominations,

    #[error("First bond must be at least {minimum}")]
    BondMinimumAmount { minimum: u128 },

    #[error("Era is required")]
    EraRequired,
}

/// Non-blocking remarks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionWarning {
    #[error("Fees are high compared to the amount")]
    FeeTooHigh,
}

/// Computed view of a draft; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionStatus {
    pub errors: BTreeMap<StatusField, TransactionError>,
    pub warnings: BTreeMap<StatusField, TransactionWarning>,
    pub estimated_fees: u128,
    /// Amount after resolving `use_all_amount`
    pub amount: u128,
    pub total_spent: u128,
}

impl TransactionStatus {
    /// Record an error unless the field already has one
    pub fn error(&mut self, field: StatusField, error: TransactionError) {
        self.errors.entry(field).or_insert(error);
    }

    pub fn warn(&mut self, field: StatusField, warning: TransactionWarning) {
        self.warnings.entry(field).or_insert(warning);
    }

    pub fn has_error(&self, field: StatusField) -> bool {
        self.errors.contains_key(&field)
    }

    /// Whether the host may proceed to signing
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
