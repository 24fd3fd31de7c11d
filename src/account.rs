//! Local accounts: data model, session issuance, and identity linking.

pub mod linker;
pub mod model;
pub mod session;

pub use linker::*;
pub use model::*;
pub use session::*;
