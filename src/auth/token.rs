//! Secret-bearing token types: provider grants and broker session tokens.

pub mod grant;
pub mod secret;
pub mod session;
