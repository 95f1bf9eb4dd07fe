//! Mobile confirmations.

mod builder;
mod confirmation;
mod helpers;
mod mobile_api;
mod operation;

pub use builder::MobileAPIBuilder;
pub use confirmation::Confirmation;
pub use mobile_api::{ConfirmationKeyFn, MobileAPI};
pub use operation::Operation;
