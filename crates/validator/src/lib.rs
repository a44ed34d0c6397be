//! Pre-trade validation: for an incoming order, resolves which network and
//! token the submitter's funds are obligated on, and checks that escrow
//! covers the required amount before the order reaches the matching engine.

pub mod result;
pub mod validator;

pub use result::ValidationResult;
pub use validator::Validator;
