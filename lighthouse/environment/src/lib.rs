//! Constructs the tokio runtime, the tracing subscriber, and the shutdown-signal plumbing that
//! every other crate in the orchestration core is built against.
//!
//! This is the ambient "how does `main` actually start up" layer: it owns the single
//! multi-threaded tokio runtime, wires a [`task_executor::TaskExecutor`] to it, and turns SIGINT
//! into a [`task_executor::ShutdownReason`] that propagates out through [`Environment::block_until_shutdown_requested`].
//! The per-slot scheduling logic that reacts to shutdown lives in `client`/`network`; this crate
//! only has to deliver the signal.

pub mod tracing_common;

use futures::channel::mpsc::Receiver;
use futures::StreamExt;
use std::path::PathBuf;
use task_executor::{ShutdownReason, TaskExecutor};
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};

/// Configuration for the tracing subscriber, populated from the `--log-*` CLI flags.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub path: Option<PathBuf>,
    pub debug_level: String,
    pub logfile_debug_level: String,
    pub log_format: Option<String>,
    pub logfile_format: Option<String>,
    pub log_color: bool,
    pub logfile_color: bool,
    pub max_log_size: u64,
    pub max_log_number: usize,
    pub compression: bool,
    pub is_restricted: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            path: None,
            debug_level: "info".into(),
            logfile_debug_level: "debug".into(),
            log_format: None,
            logfile_format: None,
            log_color: false,
            logfile_color: false,
            max_log_size: 200,
            max_log_number: 5,
            compression: false,
            is_restricted: true,
        }
    }
}

/// Builds an [`Environment`]: the tokio runtime plus the `(exit_signal, executor, shutdown_rx)`
/// triple every background loop is spawned through.
pub struct EnvironmentBuilder {
    runtime: Option<Runtime>,
    logger_config: LoggerConfig,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        EnvironmentBuilder {
            runtime: None,
            logger_config: LoggerConfig::default(),
        }
    }

    /// Builds a multi-threaded tokio runtime sized to the host's CPU count, matching the single
    /// central event loop the orchestration core assumes (§5): many OS threads, but the
    /// scheduling guarantees described there are a property of how the node structures its
    /// futures, not of how many worker threads poll them.
    pub fn multi_threaded_tokio_runtime(mut self) -> Result<Self, String> {
        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("failed to build tokio runtime: {e}"))?;
        self.runtime = Some(runtime);
        Ok(self)
    }

    /// Installs the file + stdout tracing layers described by `logger_config`. Returns the
    /// layers themselves so the caller (`tracing_common::construct_logger`) can combine them
    /// with an `EnvFilter` and the libp2p/discv5 sink before calling `tracing::subscriber::set_global_default`.
    pub fn init_tracing(
        self,
        logger_config: LoggerConfig,
        logfile_prefix: &str,
    ) -> (
        Self,
        logging::tracing_logging_layer::LoggingLayer,
        logging::tracing_logging_layer::LoggingLayer,
    ) {
        use logging::tracing_logging_layer::LoggingLayer;
        use tracing_appender::non_blocking::NonBlocking;

        let (stdout_writer, stdout_guard) = NonBlocking::new(std::io::stdout());
        let stdout_layer = LoggingLayer::new(
            stdout_writer,
            stdout_guard,
            false,
            logger_config.log_color,
            false,
            logger_config.log_format.clone(),
            None,
            false,
            false,
        );

        let file_writer = logger_config
            .path
            .clone()
            .map(|dir| {
                let file_appender = tracing_appender::rolling::never(
                    dir,
                    format!("{logfile_prefix}.log"),
                );
                NonBlocking::new(file_appender)
            })
            .unwrap_or_else(|| NonBlocking::new(std::io::sink()));
        let (file_non_blocking, file_guard) = file_writer;
        let file_layer = LoggingLayer::new(
            file_non_blocking,
            file_guard,
            false,
            false,
            logger_config.logfile_color,
            None,
            logger_config.logfile_format.clone(),
            true,
            true,
        );

        (self, file_layer, stdout_layer)
    }

    pub fn build(self) -> Result<Environment, String> {
        let runtime = self
            .runtime
            .ok_or_else(|| "no tokio runtime configured".to_string())?;
        let handle = runtime.handle().clone();
        let (executor, exit_signal, shutdown_rx) = task_executor::build(handle);
        Ok(Environment {
            runtime,
            executor,
            exit_signal,
            shutdown_rx: Some(shutdown_rx),
        })
    }
}

/// The running node's runtime, executor, and shutdown channel. Exactly one of these exists per
/// process; `lighthouse::main` builds it, hands the executor to the client lifecycle, and then
/// blocks on [`Environment::block_until_shutdown_requested`].
pub struct Environment {
    runtime: Runtime,
    executor: TaskExecutor,
    /// Held only to keep the `async_channel` open; dropping it is what signals every spawned
    /// task's `exit` receiver.
    exit_signal: std::sync::Arc<async_channel::Sender<()>>,
    shutdown_rx: Option<Receiver<ShutdownReason>>,
}

impl Environment {
    pub fn executor(&self) -> TaskExecutor {
        self.executor.clone()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Installs a SIGINT handler that requests a graceful shutdown, then blocks until either
    /// the signal fires or some other component calls `executor.shutdown(..)` first (e.g. a
    /// fatal genesis-source error in the lifecycle). Returns the reason, so `main` can choose
    /// the process exit code per §6.
    pub fn block_until_shutdown_requested(&mut self) -> Result<ShutdownReason, String> {
        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| "shutdown already requested".to_string())?;

        self.runtime.block_on(async move {
            let mut sigint = Box::pin(tokio::signal::ctrl_c());
            tokio::select! {
                _ = &mut sigint => {
                    tracing::info!("shutting down, received SIGINT");
                    Ok(ShutdownReason::Success("Received SIGINT"))
                }
                reason = shutdown_rx.next() => {
                    Ok(reason.unwrap_or(ShutdownReason::Failure("shutdown channel dropped")))
                }
            }
        })
    }

    /// Drops the exit-signal sender, which closes every `TaskExecutor::exit()` receiver cloned
    /// from it -- the mechanism `spawn_cancellable` loops (the second ticker, in particular)
    /// use to notice shutdown.
    pub fn fire_signal(self) {
        drop(self.exit_signal);
    }
}
