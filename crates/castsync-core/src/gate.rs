// ── Thread-affinity gate ──
//
// Presentation state is owned by a single dedicated thread. Other contexts
// reach it only by handing the gate a closure: fire-and-forget through
// `post`, or with a reply through `call` / `call_blocking`. When the caller
// already is the owner thread the closure runs inline, so owner-side code
// never waits on itself.
//
// Submissions travel one FIFO queue, so operations from one producer run in
// submission order. Every cross-context call is bounded by the call timeout;
// a call abandoned on timeout is skipped when the owner reaches it. Work
// queued before teardown is drained, after teardown every submission
// reports `CoreError::TeardownNoop` and nothing runs.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::state::PresentationState;

const OWNER_THREAD_NAME: &str = "castsync-owner";

type Operation = Box<dyn FnOnce(&mut PresentationState) + Send + 'static>;

thread_local! {
    static OWNED: RefCell<Option<PresentationState>> = const { RefCell::new(None) };
}

/// Outcome of trying to run a closure against the state on this thread.
enum Inline<F, R> {
    Ran(R),
    /// Another operation is mid-flight on this thread; the closure is handed back.
    Busy(F),
    /// No state here: either not the owner or already torn down.
    Gone,
}

fn try_inline<F, R>(op: F) -> Inline<F, R>
where
    F: FnOnce(&mut PresentationState) -> R,
{
    OWNED.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            return Inline::Busy(op);
        };
        match slot.as_mut() {
            Some(state) => Inline::Ran(op(state)),
            None => Inline::Gone,
        }
    })
}

/// Cloneable handle for submitting work to the owner context.
#[derive(Clone)]
pub(crate) struct AffinityGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    queue: mpsc::UnboundedSender<Operation>,
    owner: ThreadId,
    call_timeout: Duration,
}

impl AffinityGate {
    /// Move `state` onto a fresh owner thread and start its loop.
    ///
    /// The loop exits when `cancel` fires; the state is dropped on the owner
    /// thread right after.
    pub(crate) fn spawn(
        state: PresentationState,
        cancel: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), CoreError> {
        let call_timeout = state.config.call_timeout;
        let (queue, rx) = mpsc::unbounded_channel();

        let handle = thread::Builder::new()
            .name(OWNER_THREAD_NAME.into())
            .spawn(move || owner_thread(state, rx, cancel))
            .map_err(|e| CoreError::Internal(format!("failed to spawn owner thread: {e}")))?;

        let gate = Self {
            inner: Arc::new(GateInner {
                queue,
                owner: handle.thread().id(),
                call_timeout,
            }),
        };
        Ok((gate, handle))
    }

    pub(crate) fn is_owner(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    fn enqueue(&self, op: Operation) -> Result<(), CoreError> {
        self.inner.queue.send(op).map_err(|_| CoreError::TeardownNoop)
    }

    /// Run `op` on the owner without waiting for it.
    ///
    /// On the owner thread the closure runs before this returns, unless an
    /// operation is already executing there, in which case it is queued
    /// behind it.
    pub(crate) fn post<F>(&self, op: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut PresentationState) + Send + 'static,
    {
        if self.is_owner() {
            return match try_inline(op) {
                Inline::Ran(()) => Ok(()),
                Inline::Busy(op) => self.enqueue(Box::new(op)),
                Inline::Gone => Err(CoreError::TeardownNoop),
            };
        }
        self.enqueue(Box::new(op))
    }

    /// Queue `op` so that it only runs if the waiting caller has not given
    /// up on it first.
    fn dispatch<F, R>(&self, op: F, reply: impl FnOnce(R) + Send + 'static) -> Result<Arc<Claim>, CoreError>
    where
        F: FnOnce(&mut PresentationState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let claim = Arc::new(Claim::default());
        let owner_claim = Arc::clone(&claim);
        self.enqueue(Box::new(move |state: &mut PresentationState| {
            if owner_claim.start() {
                reply(op(state));
            } else {
                debug!("abandoned call skipped");
            }
        }))?;
        Ok(claim)
    }

    fn call_inline<F, R>(op: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut PresentationState) -> R,
    {
        match try_inline(op) {
            Inline::Ran(value) => Ok(value),
            Inline::Busy(_) => Err(CoreError::Internal(
                "re-entrant call on the owner thread".into(),
            )),
            Inline::Gone => Err(CoreError::TeardownNoop),
        }
    }

    fn timeout_error(&self) -> CoreError {
        CoreError::Timeout {
            timeout_ms: u64::try_from(self.inner.call_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Run `op` on the owner and await its result, bounded by the call timeout.
    ///
    /// A call that times out before the owner reaches it is never applied.
    pub(crate) async fn call<F, R>(&self, op: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut PresentationState) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner() {
            return Self::call_inline(op);
        }
        let (reply, mut rx) = oneshot::channel();
        let claim = self.dispatch(op, move |value| {
            let _ = reply.send(value);
        })?;
        match tokio::time::timeout(self.inner.call_timeout, &mut rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(CoreError::TeardownNoop),
            Err(_) if claim.abandon() => Err(self.timeout_error()),
            // Already running on the owner: its effect lands, so report it.
            Err(_) => rx.await.map_err(|_| CoreError::TeardownNoop),
        }
    }

    /// Run `op` on the owner and block the calling thread until it answers,
    /// bounded by the call timeout.
    ///
    /// Must not be called from inside an async task on a runtime worker.
    pub(crate) fn call_blocking<F, R>(&self, op: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut PresentationState) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner() {
            return Self::call_inline(op);
        }
        let (reply, rx) = std_mpsc::sync_channel(1);
        let claim = self.dispatch(op, move |value| {
            let _ = reply.send(value);
        })?;
        match rx.recv_timeout(self.inner.call_timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Disconnected) => Err(CoreError::TeardownNoop),
            Err(RecvTimeoutError::Timeout) if claim.abandon() => Err(self.timeout_error()),
            Err(RecvTimeoutError::Timeout) => rx.recv().map_err(|_| CoreError::TeardownNoop),
        }
    }
}

/// Decides, exactly once, whether a queued call runs or is abandoned by its
/// caller.
#[derive(Default)]
struct Claim(AtomicU8);

impl Claim {
    const PENDING: u8 = 0;
    const STARTED: u8 = 1;
    const ABANDONED: u8 = 2;

    /// Owner side. `false` means the caller already gave up.
    fn start(&self) -> bool {
        self.0
            .compare_exchange(Self::PENDING, Self::STARTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Caller side. `false` means the owner already started the operation.
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(Self::PENDING, Self::ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

// ── Owner thread ─────────────────────────────────────────────────

fn owner_thread(
    state: PresentationState,
    rx: mpsc::UnboundedReceiver<Operation>,
    cancel: CancellationToken,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(error = %e, "owner runtime failed to start");
            return;
        }
    };

    OWNED.with(|cell| *cell.borrow_mut() = Some(state));
    debug!("owner context running");

    runtime.block_on(owner_loop(rx, cancel));

    let state = OWNED.with(|cell| cell.borrow_mut().take());
    drop(state);
    debug!("owner context torn down");
}

async fn owner_loop(mut rx: mpsc::UnboundedReceiver<Operation>, cancel: CancellationToken) {
    loop {
        let hide_at = match try_inline(|state: &mut PresentationState| state.surface.hide_deadline()) {
            Inline::Ran(deadline) => deadline,
            Inline::Busy(_) | Inline::Gone => None,
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            op = rx.recv() => {
                let Some(op) = op else { return };
                if let Inline::Gone = try_inline(op) {
                    return;
                }
            }
            () = hide_timer(hide_at) => {
                let _ = try_inline(|state: &mut PresentationState| {
                    state.complete_pending_hide(Instant::now());
                });
            }
        }
    }

    // Anything accepted before teardown still runs; later submissions fail.
    rx.close();
    let mut drained = 0_usize;
    while let Ok(op) = rx.try_recv() {
        let _ = try_inline(op);
        drained += 1;
    }
    if drained > 0 {
        debug!(drained, "ran operations queued before teardown");
    }
}

async fn hide_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
