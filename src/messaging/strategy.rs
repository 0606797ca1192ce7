//! How the backend should treat recipient devices the sender has no session
//! with.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Missing-client strategy for one send attempt.
///
/// It is derived again for every attempt from the latest delivery failure
/// and only changes the request path, never the encrypted body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingClientStrategy {
    /// Reject the message if any recipient device is missing
    #[default]
    DoNotIgnore,
    /// Deliver to known devices and ignore missing ones
    IgnoreAll,
    /// Ignore missing devices except those of this user
    IgnoreAllExcept(Uuid),
}

impl MissingClientStrategy {
    /// Query suffix appended to the message path
    pub fn query_suffix(&self) -> String {
        match self {
            Self::DoNotIgnore => String::new(),
            Self::IgnoreAll => "?ignore_missing".to_string(),
            Self::IgnoreAllExcept(user_id) => format!("?report_missing={user_id}"),
        }
    }

    /// `path` with the strategy's query suffix
    pub fn apply_to_path(&self, path: &str) -> String {
        format!("{path}{}", self.query_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_suffixes() {
        let path = "/conversations/c/otr/messages";
        let user = Uuid::parse_str("6f1f2d2a-97c1-4a5c-b1b0-9f7d3f8a5e21").unwrap();

        assert_eq!(MissingClientStrategy::DoNotIgnore.apply_to_path(path), path);
        assert_eq!(
            MissingClientStrategy::IgnoreAll.apply_to_path(path),
            "/conversations/c/otr/messages?ignore_missing"
        );
        assert_eq!(
            MissingClientStrategy::IgnoreAllExcept(user).apply_to_path(path),
            "/conversations/c/otr/messages?report_missing=6f1f2d2a-97c1-4a5c-b1b0-9f7d3f8a5e21"
        );
    }
}
