use thiserror::Error;

/// Failure kinds raised by [`crate::db::LocalStore`].
///
/// Store methods return `anyhow::Result`; these values travel inside the
/// `anyhow::Error` and can be recovered with `downcast_ref::<StoreError>()`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database could not be opened or migrated.
    #[error("local store unavailable ({location}): {reason}")]
    Unavailable { location: String, reason: String },

    /// Another caller is in the middle of opening the connection.
    #[error("local store is already being opened")]
    OpenInProgress,

    /// The database on disk was written by a newer schema.
    #[error("local store schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: i64, supported: i64 },

    /// A previous operation panicked while holding the connection.
    #[error("local store connection lock poisoned")]
    Poisoned,
}
