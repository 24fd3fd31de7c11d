//! Auth-domain identifiers, scope sets, provider grants, and normalized claims.

pub mod claims;
pub mod id;
pub mod scope;
pub mod token;

pub use claims::*;
pub use id::*;
pub use scope::*;
pub use token::{grant::*, secret::*, session::*};
