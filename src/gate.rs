//! Guard enforcing authentication and expiry preconditions on protected operations.

use crate::error::SessionError;
use crate::session::record::TokenRecord;
use crate::session::store::SessionStore;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;

/// Wraps protected operations with a "must be authenticated and not expired"
/// check against a [`SessionStore`] key.
///
/// The gate only reads the store. It never blocks on renewal: while the
/// scheduler is renewing, guarded calls keep running against the still-valid
/// old record. Errors propagate to the immediate caller of the guarded
/// operation; the wrapped operation is never invoked on failure.
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<SessionStore>,
    key: String,
}

impl AuthGate {
    pub fn new(store: Arc<SessionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Look up and classify the current record.
    ///
    /// Absent or unauthenticated entries are [`SessionError::RequiredLogin`];
    /// a lapsed expiry is [`SessionError::ExpiredToken`].
    pub fn check(&self) -> Result<Arc<TokenRecord>, SessionError> {
        let record = self
            .store
            .get(&self.key)
            .ok_or_else(SessionError::required_login)?;

        if !record.authenticated() {
            return Err(SessionError::required_login());
        }

        if record.is_expired_at(Utc::now()) {
            return Err(SessionError::expired_token());
        }

        Ok(record)
    }

    /// Run `op` if the session is valid, passing its result through unchanged.
    pub fn guard<T>(&self, op: impl FnOnce(&TokenRecord) -> T) -> Result<T, SessionError> {
        let record = self.check()?;
        Ok(op(record.as_ref()))
    }

    /// Async variant of [`AuthGate::guard`].
    pub async fn guard_async<T, Fut>(
        &self,
        op: impl FnOnce(Arc<TokenRecord>) -> Fut,
    ) -> Result<T, SessionError>
    where
        Fut: Future<Output = T>,
    {
        let record = self.check()?;
        Ok(op(record).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::record::LoginPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gate_with(record: Option<TokenRecord>) -> AuthGate {
        let store = Arc::new(SessionStore::new());
        if let Some(record) = record {
            store.set("account", record);
        }
        AuthGate::new(store, "account")
    }

    fn valid_record() -> TokenRecord {
        TokenRecord::from_payload(LoginPayload {
            authenticated: true,
            token: Some("tok".into()),
            user: None,
            token_expire_date: Some("2030-01-01T00:00:00Z".into()),
        })
        .unwrap()
    }

    fn expired_record() -> TokenRecord {
        TokenRecord::from_payload(LoginPayload {
            authenticated: true,
            token: Some("tok".into()),
            user: None,
            token_expire_date: Some("2020-01-01T00:00:00Z".into()),
        })
        .unwrap()
    }

    #[test]
    fn test_no_session_is_required_login_and_op_never_runs() {
        let gate = gate_with(None);
        let calls = AtomicUsize::new(0);

        let result = gate.guard(|_| calls.fetch_add(1, Ordering::SeqCst));

        assert!(matches!(result, Err(SessionError::RequiredLogin(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unauthenticated_record_is_required_login() {
        let gate = gate_with(Some(TokenRecord::unauthenticated()));
        let calls = AtomicUsize::new(0);

        let result = gate.guard(|_| calls.fetch_add(1, Ordering::SeqCst));

        assert!(matches!(result, Err(SessionError::RequiredLogin(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lapsed_record_is_expired_token_and_op_never_runs() {
        let gate = gate_with(Some(expired_record()));
        let calls = AtomicUsize::new(0);

        let result = gate.guard(|_| calls.fetch_add(1, Ordering::SeqCst));

        assert!(matches!(result, Err(SessionError::ExpiredToken(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_valid_record_runs_op_exactly_once_with_result_unchanged() {
        let gate = gate_with(Some(valid_record()));
        let calls = AtomicUsize::new(0);

        let result = gate.guard(|record| {
            calls.fetch_add(1, Ordering::SeqCst);
            format!("bearer {}", record.access_token().unwrap())
        });

        assert_eq!(result.unwrap(), "bearer tok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_record_without_expiry_passes() {
        let record = TokenRecord::from_payload(LoginPayload {
            authenticated: true,
            token: Some("tok".into()),
            user: None,
            token_expire_date: None,
        })
        .unwrap();
        let gate = gate_with(Some(record));

        assert!(gate.check().is_ok());
    }

    #[tokio::test]
    async fn test_guard_async_passes_result_through() {
        let gate = gate_with(Some(valid_record()));

        let result = gate
            .guard_async(|record| async move { record.access_token().unwrap().len() })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_guard_async_rejects_without_running_op() {
        let gate = gate_with(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_op = Arc::clone(&calls);

        let result = gate
            .guard_async(|_| async move { calls_in_op.fetch_add(1, Ordering::SeqCst) })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
