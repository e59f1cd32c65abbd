//! Hypervisor-gated session control.

use std::sync::Arc;

use tracing::warn;

use super::session::RemoteDesktopSession;
use crate::application::{HypervisorController, KeyReplayer};
use crate::domain::SessionError;

/// Connects the session only while the VM is running.
pub struct SessionController {
    hypervisor: Arc<dyn HypervisorController>,
    session: Arc<RemoteDesktopSession>,
}

impl SessionController {
    pub fn new(hypervisor: Arc<dyn HypervisorController>, session: Arc<RemoteDesktopSession>) -> Self {
        Self { hypervisor, session }
    }

    pub fn session(&self) -> &Arc<RemoteDesktopSession> {
        &self.session
    }

    /// Connects to the configured endpoint unless already connected.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotRunning`] when the hypervisor reports the VM down;
    /// otherwise whatever [`RemoteDesktopSession::connect`] returns.
    pub async fn ensure_connected(&self) -> Result<(), SessionError> {
        self.start(false).await
    }

    /// Drops any current connection and connects afresh.
    pub async fn reconnect(&self) -> Result<(), SessionError> {
        self.start(true).await
    }

    pub async fn release(&self) -> Result<(), SessionError> {
        self.session.disconnect().await
    }

    /// Replayer for the session, or `NotRunning` if it is not ready.
    pub fn replayer(&self) -> Result<KeyReplayer<RemoteDesktopSession>, SessionError> {
        if !self.session.is_ready() {
            return Err(SessionError::NotRunning);
        }
        Ok(self.session.replayer())
    }

    async fn start(&self, reconnect: bool) -> Result<(), SessionError> {
        if !self.hypervisor.is_running() {
            warn!("session {}: VM is not running; not connecting", self.session.id());
            return Err(SessionError::NotRunning);
        }
        let endpoint = self.session.config().endpoint.clone();
        self.session.connect(endpoint, reconnect).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::MockHypervisorController;
    use crate::domain::{SessionConfig, SessionState};
    use crate::infrastructure::ScriptedConnector;

    fn controller(running: bool, connector: &ScriptedConnector) -> SessionController {
        let mut hypervisor = MockHypervisorController::new();
        hypervisor.expect_is_running().return_const(running);
        let session = RemoteDesktopSession::spawn(SessionConfig::default(), Arc::new(connector.clone())).unwrap();
        SessionController::new(Arc::new(hypervisor), Arc::new(session))
    }

    #[tokio::test]
    async fn test_vm_down_refuses_to_connect() {
        // Arrange
        let connector = ScriptedConnector::new();
        let controller = controller(false, &connector);

        // Act
        let result = controller.ensure_connected().await;

        // Assert
        assert!(matches!(result, Err(SessionError::NotRunning)));
        assert_eq!(connector.connect_count(), 0);
        assert!(matches!(controller.replayer(), Err(SessionError::NotRunning)));
    }

    #[tokio::test]
    async fn test_vm_up_connects_once() {
        // Arrange
        let connector = ScriptedConnector::new();
        let controller = controller(true, &connector);

        // Act
        controller.ensure_connected().await.unwrap();
        controller.ensure_connected().await.unwrap();

        // Assert
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(controller.session().state(), SessionState::Ready);
        assert!(controller.replayer().is_ok());

        controller.release().await.unwrap();
        assert_eq!(controller.session().state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_connection() {
        let connector = ScriptedConnector::new();
        let controller = controller(true, &connector);

        controller.ensure_connected().await.unwrap();
        controller.reconnect().await.unwrap();

        assert_eq!(connector.connect_count(), 2);
        assert_eq!(connector.open_transports(), 1);
        assert_eq!(connector.max_open_transports(), 1);
    }
}
