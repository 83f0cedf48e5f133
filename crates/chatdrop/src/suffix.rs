use std::sync::Arc;

use serde_json::Value;

use crate::document_store::DocumentStore;
use crate::error::ChatError;
use crate::model::{SuffixCode, SUFFIX_FIELD};
use crate::types::{DocumentRef, UserId};

/// Looks up the decoration suffix for a user.
pub struct UserSuffixResolver {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl UserSuffixResolver {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Resolve the suffix for `user_id`.
    ///
    /// A missing profile is [`ChatError::UserNotFound`]; an absent or
    /// unrecognised preference resolves to the empty string.
    pub async fn resolve(&self, user_id: &UserId) -> Result<&'static str, ChatError> {
        let target = DocumentRef::new(self.collection.as_str(), user_id.0.as_str());
        let profile = self
            .store
            .get(&target)
            .await
            .map_err(|e| ChatError::internal("failed to fetch user document", e))?;

        let Some(profile) = profile else {
            tracing::info!(%user_id, "user not found");
            return Err(ChatError::UserNotFound {
                user_id: user_id.clone(),
            });
        };

        let code = profile
            .field(SUFFIX_FIELD)
            .and_then(Value::as_str)
            .and_then(SuffixCode::parse);
        match code {
            Some(code) => Ok(code.suffix()),
            None => {
                tracing::warn!(
                    %user_id,
                    value = ?profile.field(SUFFIX_FIELD),
                    "invalid suffix preference, defaulting to empty"
                );
                Ok("")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_document::MemoryDocumentStore;
    use serde_json::json;

    fn setup() -> (Arc<MemoryDocumentStore>, UserSuffixResolver) {
        let store = Arc::new(
            MemoryDocumentStore::from_json(json!({
                "users": {
                    "cat-user": { "suffixType": "cat" },
                    "dog-user": { "suffixType": "dog" },
                    "char-user": { "suffixType": "character" },
                    "odd-user": { "suffixType": "parrot" },
                    "num-user": { "suffixType": 7 },
                    "bare-user": {}
                }
            }))
            .unwrap(),
        );
        let resolver = UserSuffixResolver::new(store.clone(), "users");
        (store, resolver)
    }

    #[tokio::test]
    async fn recognised_codes_map_to_fixed_suffixes() {
        let (_store, resolver) = setup();
        let cases = [
            ("cat-user", "nyan"),
            ("dog-user", "woof"),
            ("char-user", "yo"),
        ];
        for (user, expected) in cases {
            let suffix = resolver.resolve(&UserId::new(user)).await.unwrap();
            assert_eq!(suffix, expected, "user {user}");
        }
    }

    #[tokio::test]
    async fn unknown_missing_or_malformed_codes_resolve_empty() {
        let (_store, resolver) = setup();
        for user in ["odd-user", "num-user", "bare-user"] {
            let suffix = resolver.resolve(&UserId::new(user)).await.unwrap();
            assert_eq!(suffix, "", "user {user}");
        }
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let (_store, resolver) = setup();
        let err = resolver.resolve(&UserId::new("ghost")).await.unwrap_err();
        match err {
            ChatError::UserNotFound { user_id } => assert_eq!(user_id, UserId::new("ghost")),
            other => panic!("expected UserNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lookup_failure_is_internal() {
        let (store, resolver) = setup();
        store.fail_gets_in("users");
        let err = resolver.resolve(&UserId::new("cat-user")).await.unwrap_err();
        assert!(matches!(err, ChatError::Internal { .. }));
        assert!(err.to_string().starts_with("failed to fetch user document"));
    }

    #[tokio::test]
    async fn unavailable_store_is_internal() {
        let (store, resolver) = setup();
        store.set_unavailable(true);
        let err = resolver.resolve(&UserId::new("ghost")).await.unwrap_err();
        assert!(matches!(err, ChatError::Internal { .. }));
    }
}
