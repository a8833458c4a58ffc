//! # Licence
//!
//! Abstraction licences are owned by the licensing system; billing only refers
//! to them by identifier.

define_uuid_id! {
    /// Abstraction licence ID
    pub struct LicenceId;
}
