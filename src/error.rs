use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardbookError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Insufficient funds on card {card_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        card_id: i64,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Cannot remove {amount} from card {card_id}: balance {balance} would go negative")]
    NegativeBalance {
        card_id: i64,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("{entity} not found: id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl CardbookError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CardbookError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CardbookError>;

/// Map `QueryReturnedNoRows` to a `NotFound` for the given entity.
pub(crate) fn not_found(entity: &'static str, id: i64) -> impl FnOnce(rusqlite::Error) -> CardbookError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => CardbookError::NotFound { entity, id },
        other => CardbookError::Db(other),
    }
}
