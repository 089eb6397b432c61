use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::models::{Alert, AuthResponse, LoginRequest, RegisterRequest, UserProfile};
use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::session::{Session, SessionStore};

/// The remote service of record for identity and alert data.
///
/// A trait so the auth and dashboard flows can be exercised against an
/// in-process fake; production uses [`HttpAuthGateway`].
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> Result<()>;
    async fn me(&self) -> Result<UserProfile>;
    async fn alerts(&self, user_id: Uuid) -> Result<Vec<Alert>>;
}

/// REST implementation over [`ApiClient`].
pub struct HttpAuthGateway {
    client: ApiClient,
}

impl HttpAuthGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        self.client.post("/auth/login", &body).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<()> {
        self.client.post_discard("/auth/register", request).await
    }

    async fn me(&self) -> Result<UserProfile> {
        self.client.get("/auth/me").await
    }

    async fn alerts(&self, user_id: Uuid) -> Result<Vec<Alert>> {
        self.client
            .get(&format!("/api/alerts?user_id={user_id}"))
            .await
    }
}

/// Login/register/identity flows on top of the gateway and session store.
pub struct AuthService {
    gateway: Arc<dyn AuthGateway>,
    store: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn AuthGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self { gateway, store }
    }

    /// Authenticate and persist the returned session.
    ///
    /// On failure the gateway's message is surfaced verbatim and the stored
    /// session is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let resp = self.gateway.login(email, password).await?;
        let profile = resp.user.clone();
        self.store
            .save(Session {
                token: resp.token,
                user_id: profile.id,
                username: profile.username.clone(),
                email: profile.email.clone(),
            })
            .await;
        info!(username = %profile.username, "logged in");
        Ok(profile)
    }

    /// Create an account. Does NOT authenticate; the caller logs in
    /// separately afterwards.
    ///
    /// The password confirmation is checked locally and fails before any
    /// network call is made.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if password != confirm_password {
            return Err(Error::validation("passwords do not match"));
        }
        let request = RegisterRequest {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        };
        self.gateway.register(&request).await?;
        info!(username = %username, "account registered");
        Ok(())
    }

    /// Resolve the current identity.
    ///
    /// Without a stored token this returns `None` and never touches the
    /// network. With one, the gateway is probed; any failure (expired or
    /// revoked token included) clears the session and returns `None` rather
    /// than propagating an error.
    pub async fn current_user(&self) -> Option<UserProfile> {
        self.store.current().await?;

        match self.gateway.me().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "identity probe failed; clearing session");
                self.store.clear().await;
                None
            }
        }
    }

    pub async fn logout(&self) {
        self.store.clear().await;
        info!("logged out");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scriptable in-memory gateway that counts every network call.
    #[derive(Default)]
    pub struct FakeGateway {
        pub login_response: Mutex<Option<Result<AuthResponse>>>,
        pub me_response: Mutex<Option<Result<UserProfile>>>,
        pub alerts_response: Mutex<Vec<Alert>>,
        pub fail_alerts: AtomicBool,
        pub calls: AtomicUsize,
        pub alert_calls: AtomicUsize,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn total_calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn alert_fetches(&self) -> usize {
            self.alert_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthGateway for FakeGateway {
        async fn login(&self, _email: &str, _password: &str) -> Result<AuthResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.login_response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| {
                    Err(Error::Http {
                        status: 500,
                        message: "unscripted login".to_owned(),
                    })
                })
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn me(&self) -> Result<UserProfile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.me_response.lock().unwrap().take().unwrap_or_else(|| {
                Err(Error::Http {
                    status: 401,
                    message: "token expired".to_owned(),
                })
            })
        }

        async fn alerts(&self, _user_id: Uuid) -> Result<Vec<Alert>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.alert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_alerts.load(Ordering::SeqCst) {
                return Err(Error::Http {
                    status: 503,
                    message: "alerts unavailable".to_owned(),
                });
            }
            Ok(self.alerts_response.lock().unwrap().clone())
        }
    }
}
