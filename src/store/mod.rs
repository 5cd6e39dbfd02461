//! Storage layer
//!
//! One repository per relation, each holding a `PgPool`. Methods that must
//! participate in a larger atomic unit take an open `Transaction` instead of
//! touching the pool, so the engines own commit and rollback.

pub mod accounts;
pub mod credits;
pub mod payments;
pub mod transfers;
pub mod users;

pub use accounts::AccountStore;
pub use credits::CreditRepository;
pub use payments::PaymentRepository;
pub use transfers::TransferRepository;
pub use users::UserStore;
