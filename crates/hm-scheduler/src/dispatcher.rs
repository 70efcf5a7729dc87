//! Single-bottleneck request dispatcher.
//!
//! All outbound calls wait for a [`RequestPermit`]. A background worker owns two
//! FIFO queues (priority, normal) and the time of the last request start, and
//! hands out one permit whenever `request_delay` has elapsed since that start.
//! The worker's select loop holds at most one pending deadline.
//!
//! While a server-error retry sequence is outstanding the worker stops handing
//! out permits; the retrying caller gets its re-attempt slots through
//! [`RequestScheduler::retry_attempt`] instead.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ApiError;

/// Admission class of a waiting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Priority,
    Normal,
}

/// Proof that the dispatcher granted a request slot.
///
/// Only the dispatcher creates permits; the client consumes one per call.
#[derive(Debug)]
pub struct RequestPermit {
    admission: Admission,
    granted_at: Instant,
}

impl RequestPermit {
    pub fn admission(&self) -> Admission {
        self.admission
    }

    /// When the dispatcher started this request.
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

/// Resolves once it is this caller's turn to issue a request.
///
/// The wait is enqueued when the `Turn` is created, not when it is first polled,
/// so call order equals queue order. Dropping a `Turn` gives up the place.
#[derive(Debug)]
pub struct Turn {
    receiver: Option<oneshot::Receiver<RequestPermit>>,
}

impl Future for Turn {
    type Output = Result<RequestPermit, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.as_mut() {
            Some(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|result| result.map_err(|_| ApiError::SchedulerStopped)),
            None => Poll::Ready(Err(ApiError::SchedulerStopped)),
        }
    }
}

struct ScheduledRequest {
    admission: Admission,
    ready: oneshot::Sender<RequestPermit>,
}

enum DispatchCommand {
    Enqueue(ScheduledRequest),
    BeginRetry,
    RetryAttempt(oneshot::Sender<Result<(), ApiError>>),
    EndRetry,
}

/// Handle to the dispatcher worker. Cheap to clone; all clones share one queue.
#[derive(Clone, Debug)]
pub struct RequestScheduler {
    sender: mpsc::UnboundedSender<DispatchCommand>,
    request_delay: Duration,
}

impl std::fmt::Debug for DispatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enqueue(request) => write!(f, "Enqueue({:?})", request.admission),
            Self::BeginRetry => f.write_str("BeginRetry"),
            Self::RetryAttempt(_) => f.write_str("RetryAttempt"),
            Self::EndRetry => f.write_str("EndRetry"),
        }
    }
}

impl RequestScheduler {
    /// Spawn the dispatcher worker on the current tokio runtime.
    pub fn spawn(request_delay: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Dispatcher::new(request_delay);
        tokio::spawn(worker.run(receiver));
        Self {
            sender,
            request_delay,
        }
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Wait in the normal queue.
    pub fn wait_for_delay(&self) -> Turn {
        self.wait(Admission::Normal)
    }

    /// Wait in the priority queue, ahead of every queued normal request.
    pub fn wait_with_priority(&self) -> Turn {
        self.wait(Admission::Priority)
    }

    pub fn wait(&self, admission: Admission) -> Turn {
        let (ready, receiver) = oneshot::channel();
        let command = DispatchCommand::Enqueue(ScheduledRequest { admission, ready });
        match self.sender.send(command) {
            Ok(()) => Turn {
                receiver: Some(receiver),
            },
            Err(_) => Turn { receiver: None },
        }
    }

    /// Block permit dispatch until the returned guard is dropped.
    pub(crate) fn begin_retry(&self) -> RetryGuard {
        let _ = self.sender.send(DispatchCommand::BeginRetry);
        RetryGuard {
            sender: self.sender.clone(),
        }
    }

    /// Claim the request clock for a retry attempt.
    ///
    /// Fails with [`ApiError::RateLimited`] if the minimum spacing since the last
    /// request start has not elapsed yet.
    pub(crate) async fn retry_attempt(&self) -> Result<(), ApiError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(DispatchCommand::RetryAttempt(reply))
            .map_err(|_| ApiError::SchedulerStopped)?;
        receiver.await.map_err(|_| ApiError::SchedulerStopped)?
    }
}

/// Keeps dispatch paused while a retry sequence is outstanding.
pub(crate) struct RetryGuard {
    sender: mpsc::UnboundedSender<DispatchCommand>,
}

impl Drop for RetryGuard {
    fn drop(&mut self) {
        let _ = self.sender.send(DispatchCommand::EndRetry);
    }
}

struct Dispatcher {
    priority: VecDeque<ScheduledRequest>,
    normal: VecDeque<ScheduledRequest>,
    last_request: Option<Instant>,
    request_delay: Duration,
    retrying: usize,
}

impl Dispatcher {
    fn new(request_delay: Duration) -> Self {
        Self {
            priority: VecDeque::new(),
            normal: VecDeque::new(),
            last_request: None,
            request_delay,
            retrying: 0,
        }
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<DispatchCommand>) {
        loop {
            let deadline = self.next_deadline();
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                command = receiver.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                () = timer => {}
            }

            self.pump();
        }
        debug!(
            waiting = self.priority.len() + self.normal.len(),
            "request dispatcher stopped"
        );
    }

    fn handle(&mut self, command: DispatchCommand) {
        match command {
            DispatchCommand::Enqueue(request) => match request.admission {
                Admission::Priority => self.priority.push_back(request),
                Admission::Normal => self.normal.push_back(request),
            },
            DispatchCommand::BeginRetry => self.retrying += 1,
            DispatchCommand::EndRetry => self.retrying = self.retrying.saturating_sub(1),
            DispatchCommand::RetryAttempt(reply) => {
                let now = Instant::now();
                let result = match self.last_request {
                    Some(last) if now.duration_since(last) < self.request_delay => {
                        Err(ApiError::RateLimited {
                            retry_in: self.request_delay - now.duration_since(last),
                        })
                    }
                    _ => {
                        self.last_request = Some(now);
                        Ok(())
                    }
                };
                let _ = reply.send(result);
            }
        }
    }

    fn has_waiting(&self) -> bool {
        !self.priority.is_empty() || !self.normal.is_empty()
    }

    fn ready_at(&self, now: Instant) -> Instant {
        self.last_request
            .map_or(now, |last| last + self.request_delay)
    }

    fn next_deadline(&self) -> Option<Instant> {
        if self.retrying > 0 || !self.has_waiting() {
            return None;
        }
        Some(self.ready_at(Instant::now()))
    }

    /// Dispatch every request that is due right now.
    fn pump(&mut self) {
        while self.retrying == 0 && self.has_waiting() {
            let now = Instant::now();
            if self.ready_at(now) > now {
                return;
            }
            self.dispatch_one(now);
        }
    }

    fn dispatch_one(&mut self, now: Instant) {
        while let Some(request) = self
            .priority
            .pop_front()
            .or_else(|| self.normal.pop_front())
        {
            if request.ready.is_closed() {
                debug!(admission = ?request.admission, "skipping abandoned request");
                continue;
            }
            self.last_request = Some(now);
            let permit = RequestPermit {
                admission: request.admission,
                granted_at: now,
            };
            let _ = request.ready.send(permit);
            return;
        }
    }
}
