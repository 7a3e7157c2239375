//! Account registration management
//!
//! Drives account creation and registration against the engine and maps raw
//! registration states to login outcomes. All actual SIP registration
//! traffic happens inside the engine; this module owns the account
//! construction policy (identity/server addresses, secure transport,
//! registration flag) and the lifecycle of the single pending login
//! operation.
//!
//! # Login flow
//!
//! 1. `login` builds [`Credentials`] and an [`AccountConfig`] with identity
//!    `sip:{username}@{domain}` and server `sip:{domain}` on the configured
//!    (secure) transport, registration enabled.
//! 2. The config is installed as the engine's default account, replacing any
//!    prior default.
//! 3. The result arrives asynchronously through the raw registration
//!    callback: `Ok` resolves as [`RegistrationOutcome::Registered`],
//!    `Cleared` as [`RegistrationOutcome::LoggedOut`] (a deliberate
//!    unregistration, not a failure), `Failed` rejects with the engine's
//!    message. Every other raw state leaves the operation pending.
//!
//! Only one login may be pending at a time; a second one is rejected with
//! [`BridgeError::RegistrationPending`]. There is no timeout: a registration
//! that never reaches a terminal raw state leaves the operation unresolved.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::engine::{SipEngine, SipUri, Transport};
use crate::error::{BridgeError, BridgeResult};

/// Engine-native registration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawRegistrationState {
    /// No registration activity
    None,
    /// A REGISTER is in flight
    Progress,
    /// Registration succeeded
    Ok,
    /// Registration was cleared (deliberate unregistration)
    Cleared,
    /// Registration failed
    Failed,
    /// The registration is being refreshed
    Refreshing,
}

/// Outcome of a resolved login operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The account is registered with the server
    Registered,
    /// The registration was cleared; the account is logged out
    LoggedOut,
}

impl std::fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationOutcome::Registered => write!(f, "registered"),
            RegistrationOutcome::LoggedOut => write!(f, "logged out"),
        }
    }
}

/// Authentication credentials for an account
///
/// The realm is the account's domain; the engine computes the digest hash on
/// first register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Authentication username
    pub username: String,
    /// Clear-text password
    pub password: String,
    /// Authentication realm
    pub realm: String,
}

/// Everything the engine needs to install a default account
///
/// Parameters are immutable snapshots on the engine side; changing the
/// registration flag later goes through
/// [`SipEngine::apply_registration`], which clones and reapplies them.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountConfig {
    /// Identity address, `sip:{username}@{domain}`
    pub identity: SipUri,
    /// Registrar server address, `sip:{domain}`
    pub server: SipUri,
    /// Transport the server address is bound to
    pub transport: Transport,
    /// Account credentials
    pub credentials: Credentials,
    /// Whether the account starts the registration process
    pub register: bool,
}

impl AccountConfig {
    /// Build the account configuration `login` installs
    pub fn for_login(
        username: &str,
        password: &str,
        domain: &str,
        transport: Transport,
    ) -> BridgeResult<Self> {
        let identity: SipUri = format!("sip:{username}@{domain}")
            .parse()
            .map_err(|_| BridgeError::invalid_address(format!("sip:{username}@{domain}")))?;
        let server: SipUri = format!("sip:{domain}")
            .parse()
            .map_err(|_| BridgeError::invalid_address(format!("sip:{domain}")))?;
        Ok(Self {
            identity,
            server,
            transport,
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
                realm: domain.to_string(),
            },
            register: true,
        })
    }
}

type PendingLogin = oneshot::Sender<BridgeResult<RegistrationOutcome>>;

#[derive(Debug, Clone)]
struct AccountState {
    config: AccountConfig,
    registered_at: Option<DateTime<Utc>>,
}

/// Drives account registration and resolves pending login operations
///
/// One per session. The facade calls [`RegistrationManager::begin_login`] and
/// [`RegistrationManager::unregister`]; the event bridge calls
/// [`RegistrationManager::resolve`] from the serialized callback path.
pub struct RegistrationManager {
    engine: Arc<dyn SipEngine>,
    transport: Transport,
    pending: Mutex<Option<PendingLogin>>,
    account: Mutex<Option<AccountState>>,
}

impl RegistrationManager {
    /// Create a manager operating against `engine`
    pub fn new(engine: Arc<dyn SipEngine>, transport: Transport) -> Self {
        Self {
            engine,
            transport,
            pending: Mutex::new(None),
            account: Mutex::new(None),
        }
    }

    /// Install the account for `username@domain` and park the pending login
    ///
    /// Returns the receiver the facade awaits. Fails fast with
    /// [`BridgeError::RegistrationPending`] if a login is already in flight.
    pub(crate) async fn begin_login(
        &self,
        username: &str,
        password: &str,
        domain: &str,
    ) -> BridgeResult<oneshot::Receiver<BridgeResult<RegistrationOutcome>>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.is_some() {
                return Err(BridgeError::RegistrationPending);
            }
            *pending = Some(tx);
        }

        let config = match AccountConfig::for_login(username, password, domain, self.transport) {
            Ok(config) => config,
            Err(error) => {
                self.pending.lock().take();
                return Err(error);
            }
        };

        tracing::info!(identity = %config.identity, server = %config.server, "logging in");
        if let Err(error) = self.engine.create_account(config.clone()).await {
            self.pending.lock().take();
            return Err(error.into());
        }

        *self.account.lock() = Some(AccountState {
            config,
            registered_at: None,
        });
        Ok(rx)
    }

    /// Resolve the pending login from a raw registration callback
    ///
    /// Raw states outside `Ok`/`Cleared`/`Failed` are ignored and leave the
    /// operation pending. Callbacks with nothing pending are ignored too.
    pub(crate) fn resolve(&self, state: RawRegistrationState, message: &str) {
        let outcome = match state {
            RawRegistrationState::Ok => {
                if let Some(account) = self.account.lock().as_mut() {
                    account.registered_at = Some(Utc::now());
                }
                Ok(RegistrationOutcome::Registered)
            }
            RawRegistrationState::Cleared => Ok(RegistrationOutcome::LoggedOut),
            RawRegistrationState::Failed => Err(BridgeError::authentication(message)),
            _ => {
                tracing::debug!(?state, "ignoring registration state");
                return;
            }
        };

        let Some(sender) = self.pending.lock().take() else {
            tracing::debug!(?state, "registration state with no pending login");
            return;
        };

        match &outcome {
            Ok(result) => tracing::info!(%result, "login resolved"),
            Err(error) => tracing::warn!(%error, "login rejected"),
        }
        // The caller may have dropped the receiver; the outcome is theirs to
        // lose.
        let _ = sender.send(outcome);
    }

    /// Disable registration and tear the default account down
    ///
    /// Clones the account parameters with the registration flag off, applies
    /// them, removes the account, and clears stored credentials. Returns
    /// `false` when no account exists. This is irreversible, not a pause.
    pub(crate) async fn unregister(&self) -> BridgeResult<bool> {
        if self.account.lock().is_none() {
            return Ok(false);
        }

        self.engine.apply_registration(false).await?;
        self.engine.remove_account().await?;
        *self.account.lock() = None;
        tracing::info!("account unregistered and removed");
        Ok(true)
    }

    /// The currently installed account configuration, if any
    pub fn account(&self) -> Option<AccountConfig> {
        self.account
            .lock()
            .as_ref()
            .map(|state| state.config.clone())
    }

    /// When the current account last registered successfully, if it has
    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.account.lock().as_ref().and_then(|state| state.registered_at)
    }
}
