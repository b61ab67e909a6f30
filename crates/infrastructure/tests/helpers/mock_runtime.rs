//! Scripted stand-ins for the server's moving parts: listeners, health
//! probes, the clock, and the command runner.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use fleet_dns_application::ports::{Clock, CommandError, CommandRunner, HealthCheck, HealthCheckError};
use fleet_dns_infrastructure::dns::{DnsListener, ServerError};

fn server_error(message: &str) -> ServerError {
    ServerError::Io(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

/// Listener whose serve and shutdown outcomes are scripted up front.
pub struct FakeListener {
    serve_delay: Duration,
    serve_error: Mutex<Option<ServerError>>,
    shutdown_error: Mutex<Option<ServerError>>,
    shutdown_calls: AtomicU32,
    stop: CancellationToken,
}

impl FakeListener {
    fn with_script(serve_delay: Duration, serve_error: Option<ServerError>) -> Arc<Self> {
        Arc::new(Self {
            serve_delay,
            serve_error: Mutex::new(serve_error),
            shutdown_error: Mutex::new(None),
            shutdown_calls: AtomicU32::new(0),
            stop: CancellationToken::new(),
        })
    }

    /// Serves forever until shut down.
    pub fn healthy() -> Arc<Self> {
        Self::with_script(Duration::ZERO, None)
    }

    /// Fails `listen_and_serve` immediately with `message`.
    pub fn failing_with(message: &str) -> Arc<Self> {
        Self::with_script(Duration::ZERO, Some(server_error(message)))
    }

    /// Fails `listen_and_serve` with `message` after `delay`.
    pub fn failing_after(message: &str, delay: Duration) -> Arc<Self> {
        Self::with_script(delay, Some(server_error(message)))
    }

    /// Makes the next `shutdown` call fail with `message`.
    pub fn fail_shutdown_with(&self, message: &str) {
        *self.shutdown_error.lock().unwrap() = Some(server_error(message));
    }

    pub fn shutdown_calls(&self) -> u32 {
        self.shutdown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsListener for FakeListener {
    async fn listen_and_serve(&self) -> Result<(), ServerError> {
        if self.serve_delay > Duration::ZERO {
            tokio::time::sleep(self.serve_delay).await;
        }
        if let Some(err) = self.serve_error.lock().unwrap().take() {
            return Err(err);
        }
        self.stop.cancelled().await;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ServerError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        self.stop.cancel();
        if let Some(err) = self.shutdown_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(())
    }
}

/// Health check that replays a script, then repeats a default outcome.
pub struct FakeHealthCheck {
    script: Mutex<VecDeque<Result<(), HealthCheckError>>>,
    default: Result<(), HealthCheckError>,
    calls: AtomicU32,
}

impl FakeHealthCheck {
    pub fn always_healthy() -> Arc<Self> {
        Self::scripted(Vec::new(), Ok(()))
    }

    pub fn never_healthy() -> Arc<Self> {
        Self::scripted(Vec::new(), Err(HealthCheckError("probe refused".into())))
    }

    /// Passes the bind probe once, then fails every poll.
    pub fn healthy_then_failing() -> Arc<Self> {
        Self::scripted(vec![Ok(())], Err(HealthCheckError("probe refused".into())))
    }

    /// Passes the bind probe, fails `failures` polls, then recovers.
    pub fn failing_then_recovering(failures: usize) -> Arc<Self> {
        let mut script = vec![Ok(())];
        script.extend((0..failures).map(|_| Err(HealthCheckError("probe refused".into()))));
        Self::scripted(script, Ok(()))
    }

    pub fn scripted(
        script: Vec<Result<(), HealthCheckError>>,
        default: Result<(), HealthCheckError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            default,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthCheck for FakeHealthCheck {
    async fn is_healthy(&self) -> Result<(), HealthCheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Clock whose sleeps return immediately but are counted.
pub struct FakeClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

type CommandEffect = Box<dyn Fn() + Send + Sync>;

/// Command runner that records invocations instead of spawning
/// processes. An optional effect simulates what the real command would
/// have done to the filesystem.
pub struct MockCommandRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    outcome: Mutex<Result<(), CommandError>>,
    effect: Mutex<Option<CommandEffect>>,
}

impl MockCommandRunner {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome: Mutex::new(Ok(())),
            effect: Mutex::new(None),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let runner = Self::succeeding();
        *runner.outcome.lock().unwrap() = Err(CommandError(message.to_string()));
        runner
    }

    pub fn set_effect(&self, effect: impl Fn() + Send + Sync + 'static) {
        *self.effect.lock().unwrap() = Some(Box::new(effect));
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<(), CommandError> {
        self.calls.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        if let Some(effect) = self.effect.lock().unwrap().as_ref() {
            effect();
        }
        self.outcome.lock().unwrap().clone()
    }
}
