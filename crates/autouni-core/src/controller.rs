// ── Controller abstraction ──
//
// Full lifecycle management for a backend connection: session restore,
// initial fetch, push bridge, periodic refresh and command routing.

use std::sync::Arc;
use std::time::Duration;

use autouni_api::rest::models::{DeviceQuery, User};
use autouni_api::{
    ApiClient, ConnectionState, PushHandle, SessionEvent, SessionStore, TokenProvider,
};
use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ClientConfig;
use crate::dispatch::CommandDispatcher;
use crate::error::CoreError;
use crate::model::Device;
use crate::reducer::{self, DeviceEvent};
use crate::store::{DeviceRegistry, NotificationFeed};

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the registry and the
/// notification feed; the push bridge and the command processor are the
/// only tasks that write to them.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ClientConfig,
    api: Arc<ApiClient>,
    registry: Arc<DeviceRegistry>,
    notifications: Arc<NotificationFeed>,
    dispatcher: CommandDispatcher,
    connection_state: watch::Sender<ConnectionState>,
    /// Mirror of the push channel state; stays `Disconnected` when push is off.
    push_state: watch::Sender<ConnectionState>,
    command_tx: Mutex<mpsc::Sender<CommandEnvelope>>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child token for the current connection, replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    push: Mutex<Option<PushHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Build a controller. Does NOT connect -- call
    /// [`connect()`](Self::connect) to fetch and start background tasks.
    pub fn new(config: ClientConfig, session_store: Arc<dyn SessionStore>) -> Result<Self, CoreError> {
        Self::with_clock(config, session_store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: ClientConfig,
        session_store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        let api = Arc::new(ApiClient::new(
            config.api_url.as_str(),
            &config.transport(),
            session_store,
        )?);
        let registry = Arc::new(DeviceRegistry::with_clock(
            config.offline_threshold_chrono(),
            clock,
        ));
        let notifications = Arc::new(NotificationFeed::new());
        let dispatcher = CommandDispatcher::new(Arc::clone(&api), Arc::clone(&registry));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (push_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                registry,
                notifications,
                dispatcher,
                connection_state,
                push_state,
                command_tx: Mutex::new(command_tx),
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                push: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The REST client, for reads that do not touch the registry
    /// (topology, energy, reports, ...).
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.inner.api
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    pub fn notifications(&self) -> &Arc<NotificationFeed> {
        &self.inner.notifications
    }

    // ── Session ──────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, CoreError> {
        let login = self.inner.api.login(email, password).await?;
        Ok(login.user)
    }

    /// Stop background work and end the session. Local session state is
    /// cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<(), CoreError> {
        self.disconnect().await;
        self.inner.api.logout().await?;
        Ok(())
    }

    /// Session lifecycle signal. `Expired` means the user must log in again.
    pub fn session_events(&self) -> watch::Receiver<SessionEvent> {
        self.inner.api.session_events()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the backend.
    ///
    /// Restores the persisted session if needed, loads the registry, and
    /// spawns background tasks (command processor, periodic refresh, push
    /// bridge). Connecting again first tears down the running tasks.
    pub async fn connect(&self) -> Result<(), CoreError> {
        if !self.inner.task_handles.lock().await.is_empty() {
            debug!("already connected, tearing down before reconnect");
            self.disconnect().await;
        }

        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        if let Err(e) = self.establish().await {
            let _ = self
                .inner
                .connection_state
                .send(ConnectionState::Disconnected);
            return Err(e);
        }

        let config = &self.inner.config;
        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx, child.clone())));
        }

        if !config.refresh_interval.is_zero() {
            let ctrl = self.clone();
            let cancel = child.clone();
            handles.push(tokio::spawn(refresh_task(ctrl, config.refresh_interval, cancel)));
        }

        if config.push_enabled {
            self.spawn_push(&child, &mut handles).await;
        }

        let _ = self.inner.connection_state.send(ConnectionState::Connected);
        info!(devices = self.inner.registry.len(), "connected to backend");
        Ok(())
    }

    async fn establish(&self) -> Result<(), CoreError> {
        let api = &self.inner.api;
        if !api.is_authenticated() && api.restore_session().is_none() {
            return Err(CoreError::AuthenticationFailed {
                message: "not logged in".into(),
            });
        }
        self.full_refresh().await
    }

    /// Open the push channel and the bridge task that feeds it through the
    /// reducer. Events are applied one at a time, in arrival order.
    async fn spawn_push(&self, cancel: &CancellationToken, handles: &mut Vec<JoinHandle<()>>) {
        if self.inner.config.push_ignores_tls_mode() {
            warn!(
                url = %self.inner.config.ws_url,
                "push channel verifies certificates normally; the configured TLS mode applies to REST only"
            );
        }

        let api = Arc::clone(&self.inner.api);
        let token: TokenProvider = Arc::new(move || api.access_token());
        let push_cancel = cancel.child_token();

        let handle = PushHandle::connect(
            self.inner.config.ws_url.clone(),
            self.inner.config.reconnect.clone(),
            token,
            push_cancel.clone(),
        );

        let mut events = handle.subscribe();
        let mut state = handle.state();
        let registry = Arc::clone(&self.inner.registry);
        let notifications = Arc::clone(&self.inner.notifications);
        let push_state = self.inner.push_state.clone();

        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = push_cancel.cancelled() => break,
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now = *state.borrow_and_update();
                        debug!(state = ?now, "push channel state");
                        let _ = push_state.send(now);
                    }
                    result = events.recv() => match result {
                        Ok(push_event) => {
                            let Some(event) = DeviceEvent::from_push(&push_event) else {
                                continue;
                            };
                            let reduction = reducer::apply(&registry, &event);
                            for notice in reduction.notices {
                                notifications.push(notice);
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "push bridge: receiver lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            let _ = push_state.send(ConnectionState::Disconnected);
        }));

        *self.inner.push.lock().await = Some(handle);
        info!(url = %self.inner.config.ws_url, "push channel spawned");
    }

    /// Disconnect: cancel background tasks and close the push channel.
    /// The persisted session is kept.
    pub async fn disconnect(&self) {
        self.inner.cancel_child.lock().await.cancel();

        if let Some(handle) = self.inner.push.lock().await.take() {
            handle.shutdown();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        // Recreate the command channel; the old receiver went to the
        // processor task that just exited.
        {
            let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
            *self.inner.command_tx.lock().await = tx;
            *self.inner.command_rx.lock().await = Some(rx);
        }

        let _ = self.inner.push_state.send(ConnectionState::Disconnected);
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Re-fetch every device and hard-reset the registry.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        let records = self.inner.api.list_devices(&DeviceQuery::default()).await?;
        let count = records.len();
        self.inner
            .registry
            .replace_all(records.into_iter().map(Device::from));
        debug!(count, "full refresh complete");
        Ok(())
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command through the command processor and await its result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::ControllerDisconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        let command_tx = self.inner.command_tx.lock().await.clone();

        command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerDisconnected)?;

        rx.await.map_err(|_| CoreError::ControllerDisconnected)?
    }

    // ── Push channel ─────────────────────────────────────────────────

    /// Send a frame over the push channel.
    pub async fn emit(&self, event: &str, data: serde_json::Value) -> Result<(), CoreError> {
        match self.inner.push.lock().await.as_ref() {
            Some(handle) => handle.emit(event, data).map_err(CoreError::from),
            None => Err(CoreError::PushUnavailable),
        }
    }

    /// Revive a push channel that exhausted its reconnect budget.
    pub async fn restart_push(&self) {
        if let Some(handle) = self.inner.push.lock().await.as_ref() {
            handle.restart();
        }
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// Connect, run the closure, disconnect.
    ///
    /// For single CLI invocations: no push channel, no periodic refresh.
    pub async fn oneshot<F, Fut, T>(
        config: ClientConfig,
        session_store: Arc<dyn SessionStore>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.push_enabled = false;
        cfg.refresh_interval = Duration::ZERO;

        let controller = Controller::new(cfg, session_store)?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn push_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.push_state.subscribe()
    }

    /// Whether real-time updates are flowing. When `false`, registry
    /// contents may be stale.
    pub fn channel_connected(&self) -> bool {
        *self.inner.push_state.borrow() == ConnectionState::Connected
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically re-fetch the device list. Failures keep the stale data.
async fn refresh_task(controller: Controller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.full_refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(
    controller: Controller,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let inner = &controller.inner;
    match cmd {
        Command::ControlDevice { id, command } => inner
            .dispatcher
            .send_command(&id, &command)
            .await
            .map(CommandResult::Control),
        Command::BulkControl { ids, command } => inner
            .dispatcher
            .bulk_command(&ids, &command)
            .await
            .map(CommandResult::Bulk),
        Command::RefreshDevice { id } => {
            let record = inner.api.get_device(id.as_str()).await.map_err(|e| match e {
                autouni_api::Error::Api { status: 404, .. } => CoreError::DeviceNotFound { id: id.clone() },
                other => other.into(),
            })?;
            let device = Device::from(record);
            inner.registry.add(device.clone());
            Ok(CommandResult::Device(Box::new(device)))
        }
        Command::ForgetDevice { id } => {
            inner.registry.remove(&id);
            Ok(CommandResult::Ok)
        }
    }
}
