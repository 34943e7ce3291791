mod command;
mod request;

use std::collections::HashMap;
use std::sync::Arc;

pub use command::*;
use ftpgate_common::FtpgateError;
pub use request::FtpRequest;
use tokio::sync::RwLock;
use tracing::*;
use uuid::Uuid;

/// What the protocol layer should do with the command being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandResult {
    #[default]
    Continue,
    /// A listener vetoed the command.
    Skip,
}

/// Conversion of listener return values. Only an explicit `false` (or
/// [`CommandResult::Skip`]) vetoes; errors abort the dispatch.
pub trait IntoCommandResult {
    fn into_command_result(self) -> anyhow::Result<CommandResult>;
}

impl IntoCommandResult for CommandResult {
    fn into_command_result(self) -> anyhow::Result<CommandResult> {
        Ok(self)
    }
}

impl IntoCommandResult for () {
    fn into_command_result(self) -> anyhow::Result<CommandResult> {
        Ok(CommandResult::Continue)
    }
}

impl IntoCommandResult for bool {
    fn into_command_result(self) -> anyhow::Result<CommandResult> {
        Ok(if self {
            CommandResult::Continue
        } else {
            CommandResult::Skip
        })
    }
}

impl<T: IntoCommandResult, E: Into<anyhow::Error>> IntoCommandResult for Result<T, E> {
    fn into_command_result(self) -> anyhow::Result<CommandResult> {
        self.map_err(Into::into)?.into_command_result()
    }
}

/// Handle returned by [`EventDispatcher::add_listener`], used to remove
/// that one listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

type ListenerFn<S> = dyn Fn(&S, &FtpRequest, &str) -> anyhow::Result<CommandResult> + Send + Sync;

struct Listener<S> {
    id: ListenerId,
    callback: Arc<ListenerFn<S>>,
}

impl<S> Clone for Listener<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
        }
    }
}

/// Turns FTP commands into named events and runs the listeners registered
/// for them. `S` is the protocol engine's session type; it is handed to
/// listeners untouched.
///
/// Listeners run inline on the caller's task, in registration order.
/// Listeners registered under [`ALL_EVENTS`] run first on every dispatch.
/// A listener error is returned to the caller as
/// [`FtpgateError::ListenerFailed`]; panics are not caught.
pub struct EventDispatcher<S> {
    // Each list is replaced on change, so a dispatch keeps iterating the
    // snapshot it started with.
    listeners: RwLock<HashMap<String, Arc<Vec<Listener<S>>>>>,
}

impl<S: 'static> Default for EventDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> EventDispatcher<S> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    pub fn init(&self) {
        info!("Initializing event dispatcher");
    }

    pub fn destroy(&self) {
        info!("Destroying event dispatcher");
    }

    pub fn on_connect(&self, _session: &S) -> CommandResult {
        CommandResult::Continue
    }

    pub fn on_disconnect(&self, _session: &S) -> CommandResult {
        CommandResult::Continue
    }

    /// Registers `callback` for the (case-insensitive) event name. The
    /// callback receives the session, the request and the event name.
    pub async fn add_listener<N, F, R>(&self, event: N, callback: F) -> ListenerId
    where
        N: AsRef<str>,
        F: Fn(&S, &FtpRequest, &str) -> R + Send + Sync + 'static,
        R: IntoCommandResult,
    {
        let name = event.as_ref().to_lowercase();
        let id = ListenerId(Uuid::new_v4());
        let listener = Listener {
            id,
            callback: Arc::new(move |session: &S, request: &FtpRequest, event: &str| {
                callback(session, request, event).into_command_result()
            }),
        };

        let mut listeners = self.listeners.write().await;
        let entry = listeners.entry(name.clone()).or_default();
        let mut updated = Vec::clone(entry);
        updated.push(listener);
        *entry = Arc::new(updated);

        info!(event = %name, "Registered listener");
        id
    }

    /// Removes every listener for the event, or only `listener` if given.
    /// Returns how many were removed.
    pub async fn remove_listener<N: AsRef<str>>(
        &self,
        event: N,
        listener: Option<ListenerId>,
    ) -> usize {
        let name = event.as_ref().to_lowercase();
        let mut listeners = self.listeners.write().await;

        let Some(current) = listeners.get(&name) else {
            return 0;
        };
        let before = current.len();
        let remaining = match listener {
            None => vec![],
            Some(id) => current.iter().filter(|l| l.id != id).cloned().collect(),
        };
        let removed = before - remaining.len();

        if remaining.is_empty() {
            listeners.remove(&name);
        } else {
            listeners.insert(name.clone(), Arc::new(remaining));
        }

        if removed > 0 {
            info!(event = %name, removed, "Removed listeners");
        }
        removed
    }

    pub async fn listener_count<N: AsRef<str>>(&self, event: N) -> usize {
        self.snapshot(&event.as_ref().to_lowercase())
            .await
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Called before the server executes `request`. A
    /// [`CommandResult::Skip`] means the command must be rejected.
    pub async fn before_command(
        &self,
        session: &S,
        request: &FtpRequest,
    ) -> Result<CommandResult, FtpgateError> {
        debug!(command = %request.command(), "Dispatching before command");
        self.dispatch(CommandPhase::Before, session, request).await
    }

    /// Called after the server has executed `request`. The result is
    /// informational.
    pub async fn after_command(
        &self,
        session: &S,
        request: &FtpRequest,
    ) -> Result<CommandResult, FtpgateError> {
        debug!(command = %request.command(), "Dispatching after command");
        self.dispatch(CommandPhase::After, session, request).await
    }

    async fn dispatch(
        &self,
        phase: CommandPhase,
        session: &S,
        request: &FtpRequest,
    ) -> Result<CommandResult, FtpgateError> {
        if let Some(listeners) = self.snapshot(ALL_EVENTS).await {
            let result = Self::call_listeners(&listeners, ALL_EVENTS, session, request)?;
            if result != CommandResult::Continue {
                return Ok(result);
            }
        }

        let Some(event) = phase.event_for(request.command()) else {
            return Ok(CommandResult::Continue);
        };

        debug!(event = %event, "Dispatching event");
        match self.snapshot(event.as_str()).await {
            Some(listeners) => Self::call_listeners(&listeners, event.as_str(), session, request),
            None => Ok(CommandResult::Continue),
        }
    }

    async fn snapshot(&self, name: &str) -> Option<Arc<Vec<Listener<S>>>> {
        self.listeners.read().await.get(name).cloned()
    }

    fn call_listeners(
        listeners: &[Listener<S>],
        event: &str,
        session: &S,
        request: &FtpRequest,
    ) -> Result<CommandResult, FtpgateError> {
        for listener in listeners {
            let result = (listener.callback)(session, request, event).map_err(|source| {
                FtpgateError::ListenerFailed {
                    event: event.to_owned(),
                    source,
                }
            })?;
            if result == CommandResult::Skip {
                info!(event, command = %request.command(), "Command vetoed by listener");
                return Ok(CommandResult::Skip);
            }
        }
        Ok(CommandResult::Continue)
    }
}
