//! Runner service — the single-writer task that owns a [`Runner`].
//!
//! Ticks, observed events and operator commands all arrive as [`Command`]s
//! on one channel and are applied in order by a single tokio task, so
//! resolution never interleaves with itself. Callers only ever hold a
//! cloneable [`RunnerHandle`].

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use autorun_domain::context::Context;
use autorun_domain::error::ValidationError;
use autorun_domain::interaction::ObservedInteraction;

use crate::config::BreakConfig;
use crate::coordinator::{EventVerdict, Runner, RunnerStatus};
use crate::ports::{BreakGate, EventPublisher, RuleCatalog};

const COMMAND_CAPACITY: usize = 64;

type Mutation<S> = Box<dyn FnOnce(&mut Context<S>) + Send>;

/// Errors returned by a [`RunnerHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service task has exited.
    #[error("runner service has stopped")]
    Stopped,
    /// The service task dropped the request before answering.
    #[error("runner service dropped the reply")]
    NoReply,
    /// The catalog rejected its rules during a refresh.
    #[error("rule catalog is invalid")]
    Validation(#[from] ValidationError),
}

/// A request applied by the service task.
pub enum Command<S> {
    Tick,
    Observe {
        event: ObservedInteraction,
        reply: oneshot::Sender<EventVerdict>,
    },
    Refresh {
        reply: oneshot::Sender<Result<(), ValidationError>>,
    },
    SetEnabled(bool),
    ConfigureBreaks(BreakConfig),
    AddStatistic {
        name: String,
        delta: i64,
    },
    ClearStatistics,
    /// Run a closure against the context, e.g. to feed in world updates.
    Mutate(Mutation<S>),
    Status {
        reply: oneshot::Sender<RunnerStatus>,
    },
}

/// Cloneable sender side of a running service.
pub struct RunnerHandle<S> {
    sender: mpsc::Sender<Command<S>>,
}

impl<S> Clone for RunnerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: Send + 'static> RunnerHandle<S> {
    async fn send(&self, command: Command<S>) -> Result<(), ServiceError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command<S>,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response.await.map_err(|_| ServiceError::NoReply)
    }

    /// Advance the runner by one time step.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the service has exited.
    pub async fn tick(&self) -> Result<(), ServiceError> {
        self.send(Command::Tick).await
    }

    /// Report an observed external interaction and wait for the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] or [`ServiceError::NoReply`] when
    /// the service is gone.
    pub async fn observe(&self, event: ObservedInteraction) -> Result<EventVerdict, ServiceError> {
        self.request(|reply| Command::Observe { event, reply }).await
    }

    /// Rebuild the rule list from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if the catalog is invalid, or a
    /// transport error when the service is gone.
    pub async fn refresh(&self) -> Result<(), ServiceError> {
        self.request(|reply| Command::Refresh { reply }).await??;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the service has exited.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), ServiceError> {
        self.send(Command::SetEnabled(enabled)).await
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the service has exited.
    pub async fn configure_breaks(&self, breaks: BreakConfig) -> Result<(), ServiceError> {
        self.send(Command::ConfigureBreaks(breaks)).await
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the service has exited.
    pub async fn add_statistic(
        &self,
        name: impl Into<String>,
        delta: i64,
    ) -> Result<(), ServiceError> {
        self.send(Command::AddStatistic {
            name: name.into(),
            delta,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the service has exited.
    pub async fn clear_statistics(&self) -> Result<(), ServiceError> {
        self.send(Command::ClearStatistics).await
    }

    /// Apply `f` to the context inside the service task.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] once the service has exited.
    pub async fn mutate(
        &self,
        f: impl FnOnce(&mut Context<S>) + Send + 'static,
    ) -> Result<(), ServiceError> {
        self.send(Command::Mutate(Box::new(f))).await
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Stopped`] or [`ServiceError::NoReply`] when
    /// the service is gone.
    pub async fn status(&self) -> Result<RunnerStatus, ServiceError> {
        self.request(|reply| Command::Status { reply }).await
    }
}

/// Spawns the task that owns a [`Runner`].
pub struct RunnerService;

impl RunnerService {
    /// Move `runner` into a new task. The task exits once every handle is
    /// dropped.
    pub fn spawn<C, G, P>(runner: Runner<C, G, P>) -> (RunnerHandle<C::State>, JoinHandle<()>)
    where
        C: RuleCatalog + Send + 'static,
        C::State: Send + 'static,
        G: BreakGate + Send + 'static,
        P: EventPublisher + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(Self::run(runner, receiver));
        (RunnerHandle { sender }, task)
    }

    async fn run<C, G, P>(mut runner: Runner<C, G, P>, mut receiver: mpsc::Receiver<Command<C::State>>)
    where
        C: RuleCatalog,
        C::State: 'static,
        G: BreakGate,
        P: EventPublisher,
    {
        tracing::info!(session = %runner.session(), "runner service started");
        while let Some(command) = receiver.recv().await {
            Self::apply(&mut runner, command);
        }
        tracing::info!(session = %runner.session(), "runner service stopped");
    }

    fn apply<C, G, P>(runner: &mut Runner<C, G, P>, command: Command<C::State>)
    where
        C: RuleCatalog,
        C::State: 'static,
        G: BreakGate,
        P: EventPublisher,
    {
        match command {
            Command::Tick => runner.on_tick(),
            Command::Observe { event, reply } => {
                let _ = reply.send(runner.on_observed_interaction(&event));
            }
            Command::Refresh { reply } => {
                let result = runner.refresh();
                if let Err(err) = &result {
                    tracing::error!(error = %err, "failed to refresh rules");
                }
                let _ = reply.send(result);
            }
            Command::SetEnabled(enabled) => runner.set_enabled(enabled),
            Command::ConfigureBreaks(breaks) => runner.configure_breaks(breaks),
            Command::AddStatistic { name, delta } => runner.statistics_mut().add(&name, delta),
            Command::ClearStatistics => runner.statistics_mut().clear(),
            Command::Mutate(f) => f(runner.context_mut()),
            Command::Status { reply } => {
                let _ = reply.send(runner.status());
            }
        }
    }
}
