//! Atrium Licensing - the credential-based entitlement engine.
//!
//! Structurally parallel to the authorization engine but flat: a license
//! policy maps credential *types* to entitlements, with no resource scoping
//! and no cascade. Entitlements are feature/quota grants, not access
//! privileges.

#![deny(unsafe_code)]

mod engine;
mod error;
mod policy;

pub use engine::LicensingEngine;
pub use error::LicensingError;
pub use policy::{LicensePolicy, LicensingCredentialRule};
