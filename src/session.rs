//! Page session lifecycle: activation, history lockout and logout
//!
//! The controller owns its state explicitly. Navigation side effects go
//! through a [`Navigator`], remote logout through a [`SessionTerminator`],
//! so the state machine runs the same against a browser shell, the CLI or
//! a test double.

use crate::credentials::{CredentialStore, SessionToken};
use crate::error::Result;
use std::future::Future;
use tracing::{debug, info, warn};

/// Navigation surface the controller drives
pub trait Navigator {
    /// Leave the profile view for the sign-in surface
    fn redirect_to_sign_in(&mut self);

    /// Push the current view onto history again
    fn reassert_current_page(&mut self);

    /// Start routing back/forward navigation to
    /// [`SessionController::on_history_navigation`]
    fn install_history_guard(&mut self);
}

/// Remote side of logout
pub trait SessionTerminator {
    /// Tell the auth service the session is over
    fn terminate(&self, token: &SessionToken) -> impl Future<Output = Result<()>> + Send;
}

/// How the page became active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Fresh page load; history handlers start from scratch
    FullLoad,
    /// Restored from the back/forward cache; handlers already exist
    CacheRestore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticated(SessionToken),
}

/// Controller state, owned by the controller instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionControllerState {
    pub phase: SessionPhase,
    /// History guard installed during the current full page activation
    pub initialized: bool,
}

impl Default for SessionControllerState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            initialized: false,
        }
    }
}

/// Result of [`SessionController::activate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No token; the navigator was sent to sign-in
    Redirected,
    /// Token present; the caller should load the profile with it
    Authenticated(SessionToken),
}

pub struct SessionController<S, N> {
    store: S,
    navigator: N,
    state: SessionControllerState,
}

impl<S: CredentialStore, N: Navigator> SessionController<S, N> {
    pub fn new(store: S, navigator: N) -> Self {
        Self {
            store,
            navigator,
            state: SessionControllerState::default(),
        }
    }

    pub fn state(&self) -> &SessionControllerState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Check the stored token and set the page up accordingly
    pub fn activate(&mut self, activation: Activation) -> Result<ActivationOutcome> {
        if activation == Activation::FullLoad {
            self.state.initialized = false;
        }

        let Some(token) = self.store.read()? else {
            info!("No session token; redirecting to sign-in");
            self.state.phase = SessionPhase::Unauthenticated;
            self.navigator.redirect_to_sign_in();
            return Ok(ActivationOutcome::Redirected);
        };

        debug!("Session token found ({:?})", activation);
        self.state.phase = SessionPhase::Authenticated(token.clone());

        if !self.state.initialized {
            self.navigator.reassert_current_page();
            self.navigator.install_history_guard();
            self.state.initialized = true;
        }

        Ok(ActivationOutcome::Authenticated(token))
    }

    /// Back/forward navigation while the profile is showing
    pub fn on_history_navigation(&mut self) -> Result<()> {
        if self.store.read()?.is_some() {
            debug!("History navigation while signed in; staying on profile");
            self.navigator.reassert_current_page();
        } else {
            info!("History navigation without a session; redirecting to sign-in");
            self.state.phase = SessionPhase::Unauthenticated;
            self.navigator.redirect_to_sign_in();
        }
        Ok(())
    }

    /// End the session.
    ///
    /// Remote termination is best effort; the local token is cleared and
    /// the navigator redirected whatever the remote outcome.
    pub async fn logout<T: SessionTerminator>(&mut self, terminator: &T) -> Result<()> {
        let token = match &self.state.phase {
            SessionPhase::Authenticated(token) => Some(token.clone()),
            SessionPhase::Unauthenticated => self.store.read().ok().flatten(),
        };

        if let Some(token) = token {
            if let Err(e) = terminator.terminate(&token).await {
                warn!("Remote logout failed (continuing): {}", e);
            }
        }

        self.store.clear()?;
        self.state.phase = SessionPhase::Unauthenticated;
        info!("Logged out");

        self.navigator.redirect_to_sign_in();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{FileCredentialStore, MemoryCredentialStore};
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct RecordingNavigator {
        events: Vec<&'static str>,
    }

    impl Navigator for RecordingNavigator {
        fn redirect_to_sign_in(&mut self) {
            self.events.push("redirect");
        }

        fn reassert_current_page(&mut self) {
            self.events.push("reassert");
        }

        fn install_history_guard(&mut self) {
            self.events.push("install");
        }
    }

    #[derive(Default)]
    struct CountingTerminator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl SessionTerminator for CountingTerminator {
        async fn terminate(&self, _token: &SessionToken) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::ConfigError("auth service unreachable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn token() -> SessionToken {
        SessionToken::new("jwt").unwrap()
    }

    fn signed_in() -> SessionController<MemoryCredentialStore, RecordingNavigator> {
        SessionController::new(
            MemoryCredentialStore::with_token(token()),
            RecordingNavigator::default(),
        )
    }

    #[test]
    fn test_activate_without_token_redirects() {
        let mut controller =
            SessionController::new(MemoryCredentialStore::new(), RecordingNavigator::default());

        let outcome = controller.activate(Activation::FullLoad).unwrap();

        assert_eq!(outcome, ActivationOutcome::Redirected);
        assert_eq!(controller.navigator().events, vec!["redirect"]);
        assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
        assert!(!controller.state().initialized);
    }

    #[test]
    fn test_activate_with_corrupt_session_file_redirects() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"token\": ").unwrap();

        let store = FileCredentialStore::new(&path, chrono::Duration::days(7));
        let mut controller = SessionController::new(store, RecordingNavigator::default());

        let outcome = controller.activate(Activation::FullLoad).unwrap();

        assert_eq!(outcome, ActivationOutcome::Redirected);
        assert_eq!(controller.navigator().events, vec!["redirect"]);
        assert!(!path.exists());
    }

    #[test]
    fn test_activate_with_token_installs_guard_once() {
        let mut controller = signed_in();

        let outcome = controller.activate(Activation::FullLoad).unwrap();
        assert_eq!(outcome, ActivationOutcome::Authenticated(token()));
        assert!(controller.state().initialized);

        controller.activate(Activation::CacheRestore).unwrap();
        controller.activate(Activation::CacheRestore).unwrap();

        assert_eq!(controller.navigator().events, vec!["reassert", "install"]);
    }

    #[test]
    fn test_full_load_reinstalls_guard() {
        let mut controller = signed_in();

        controller.activate(Activation::FullLoad).unwrap();
        controller.activate(Activation::FullLoad).unwrap();

        assert_eq!(
            controller.navigator().events,
            vec!["reassert", "install", "reassert", "install"]
        );
    }

    #[test]
    fn test_history_navigation_keeps_signed_in_user_on_page() {
        let mut controller = signed_in();
        controller.activate(Activation::FullLoad).unwrap();

        controller.on_history_navigation().unwrap();

        assert_eq!(
            controller.navigator().events,
            vec!["reassert", "install", "reassert"]
        );
    }

    #[test]
    fn test_history_navigation_after_token_loss_redirects() {
        let mut controller = signed_in();
        controller.activate(Activation::FullLoad).unwrap();
        controller.store().clear().unwrap();

        controller.on_history_navigation().unwrap();

        assert_eq!(controller.navigator().events.last(), Some(&"redirect"));
        assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_clears_token_and_redirects() {
        let mut controller = signed_in();
        controller.activate(Activation::FullLoad).unwrap();
        let terminator = CountingTerminator::default();

        controller.logout(&terminator).await.unwrap();

        assert_eq!(terminator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.store().read().unwrap(), None);
        assert_eq!(controller.navigator().events.last(), Some(&"redirect"));
    }

    #[tokio::test]
    async fn test_logout_survives_remote_failure() {
        let mut controller = signed_in();
        let terminator = CountingTerminator {
            fail: true,
            ..Default::default()
        };

        controller.logout(&terminator).await.unwrap();

        assert_eq!(terminator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.store().read().unwrap(), None);
        assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_without_token_skips_remote_call() {
        let mut controller =
            SessionController::new(MemoryCredentialStore::new(), RecordingNavigator::default());
        let terminator = CountingTerminator::default();

        controller.logout(&terminator).await.unwrap();

        assert_eq!(terminator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.navigator().events, vec!["redirect"]);
    }
}
