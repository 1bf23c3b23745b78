//! File server response types

use serde::Deserialize;

/// Reply of the secret exchange endpoint: the secret itself, or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretReply {
    Secret(String),
    Rejected(bool),
}

impl SecretReply {
    pub fn into_secret(self) -> Option<String> {
        match self {
            SecretReply::Secret(secret) if !secret.is_empty() => Some(secret),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_reply_variants() {
        let ok: SecretReply = serde_json::from_str(r#""s3cr3t""#).unwrap();
        assert_eq!(ok.into_secret(), Some("s3cr3t".to_string()));

        let rejected: SecretReply = serde_json::from_str("false").unwrap();
        assert_eq!(rejected, SecretReply::Rejected(false));
        assert_eq!(rejected.into_secret(), None);

        let empty: SecretReply = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(empty.into_secret(), None);
    }
}
