//! Provider-facing descriptors (data) and adapters (behavior).
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering the provider kind,
//! client credentials, HTTPS-only endpoints, and provider quirks (client authentication mode,
//! scope delimiter). `discovery` resolves OIDC discovery documents into endpoints once at
//! startup. `adapter` performs the per-kind code exchange and normalizes the result.

pub mod adapter;
pub mod descriptor;
pub mod discovery;

pub use adapter::*;
pub use descriptor::*;
pub use discovery::*;
