/// Declares a UUID newtype identifier
///
/// Generates:
/// - the newtype struct wrapping `Uuid`
/// - `derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)`
/// - `new()` (UUID v7), `from_uuid()`, `as_uuid()`
/// - `Default` (delegates to `new()`)
///
/// ```rust
/// use abstraction_billing_domain::bill_run::BillRunId;
///
/// let id = BillRunId::new();
/// let restored = BillRunId::from_uuid(*id.as_uuid());
/// assert_eq!(id, restored);
/// ```
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display,
        )]
        #[display("{_0}")]
        #[serde(transparent)]
        $vis struct $Name(uuid::Uuid);

        impl $Name {
            /// Generates a new identifier (UUID v7)
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::str::FromStr for $Name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self).map_err(|_| {
                    $crate::DomainError::Validation(format!(
                        "{} is not a valid {}",
                        s,
                        stringify!($Name)
                    ))
                })
            }
        }
    };
}
