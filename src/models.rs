use serde::Serialize;

/// One CI build as reported by a vendor server.
///
/// `timestamp` and `duration_ms` are best-effort: a build whose dates could
/// not be parsed carries zeros instead of failing the fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Build {
    pub id: String,
    /// Start time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub duration_ms: i64,
    pub result: String,
    pub successful: bool,
}

impl Build {
    /// A listing entry: only the identifier is known until details are fetched.
    pub fn summary(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}
