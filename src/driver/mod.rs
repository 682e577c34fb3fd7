//! The two-phase per-dialog state machine driver.
//!
//! `start` and `resume` are the only two entry points an adapter calls.
//! Internally both route through the same advance loop: run the current
//! block's handler, apply its result to the session, save once, and either
//! keep looping (`continue`/`manual_switch`), stop and wait for external
//! input (`wait`), or end the dialog (`break`).

mod handlers;
mod template;

pub use template::substitute;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::adapter::TransportAdapter;
use crate::error::DriverError;
use crate::scenario::{BlockId, Scenario, Value};
use crate::store::{StateStore, UserKey};

/// Whether a session is mid-prompt (about to run a block with no input) or
/// suspended awaiting a specific reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Step {
    Prompting,
    AwaitingInput,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub current_block: BlockId,
    pub variables: HashMap<String, Value>,
    pub step: Step,
    pub active: bool,
}

/// The result a block handler hands back to the driver. The driver alone
/// decides what to persist and whether to keep advancing.
pub(crate) enum Transition {
    /// Take the block's sole (or first) outgoing edge.
    Continue,
    /// The handler already set `current_block` itself (used by `choice`,
    /// which picks one of several outgoing edges based on the answer).
    ManualSwitch,
    /// Suspend; an external event (a `resume` call) will continue the
    /// dialog later.
    Wait,
    /// End the dialog now.
    Break,
}

/// Reserved session metadata keys never included in the `final` block's
/// summary message.
pub(crate) const RESERVED_VARIABLE_KEYS: [&str; 3] = ["user_id", "username", "first_name"];

pub struct Driver<S: StateStore, A: TransportAdapter> {
    scenario: Arc<Scenario>,
    store: S,
    adapter: A,
    locks: DashMap<UserKey, Arc<AsyncMutex<()>>>,
}

impl<S: StateStore, A: TransportAdapter> Driver<S, A> {
    pub fn new(scenario: Arc<Scenario>, store: S, adapter: A) -> Self {
        Driver {
            scenario,
            store,
            adapter,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, user: &UserKey) -> Arc<AsyncMutex<()>> {
        self.locks
            .entry(user.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Begin a fresh dialog for `user`, seeding variables from the
    /// scenario's declared defaults overlaid with `init_meta` (platform
    /// metadata such as a display name). If a session already exists for
    /// this key it is reset in place, not duplicated.
    pub async fn start(&self, user: UserKey, init_meta: HashMap<String, Value>) {
        self.start_with_cancellation(user, init_meta, CancellationToken::new()).await
    }

    /// Same as [`Self::start`], but `cancellation` is threaded into the
    /// advance loop and propagated into `apiRequest`'s outbound HTTP call:
    /// cancelling the token aborts the current event's HTTP wait and routes
    /// through `apiRequest`'s failure branch rather than hanging until the
    /// request timeout.
    pub async fn start_with_cancellation(
        &self,
        user: UserKey,
        init_meta: HashMap<String, Value>,
        cancellation: CancellationToken,
    ) {
        let lock = self.lock_for(&user);
        let _guard = lock.lock().await;

        let mut variables: HashMap<String, Value> = self
            .scenario
            .globals()
            .iter()
            .filter_map(|g| g.default.clone().map(|d| (g.name.clone(), d)))
            .collect();
        variables.extend(init_meta);

        let session = Session {
            current_block: self.scenario.start(),
            variables,
            step: Step::Prompting,
            active: true,
        };

        if let Err(err) = self.store.save(&user, session.clone()).await {
            tracing::error!(%user, %err, "failed to save initial session, aborting start");
            return;
        }

        self.advance_loop(&user, session, &cancellation).await;
    }

    /// Deliver `input` (free text, or a choice option id) to an existing
    /// dialog. A missing session is treated as a fresh `start` with no
    /// metadata available; an inactive session gets a restart hint and is
    /// left untouched.
    pub async fn resume(&self, user: UserKey, input: String) {
        self.resume_with_cancellation(user, input, CancellationToken::new()).await
    }

    /// Same as [`Self::resume`], but threads `cancellation` through to the
    /// advance loop. See [`Self::start_with_cancellation`].
    pub async fn resume_with_cancellation(
        &self,
        user: UserKey,
        input: String,
        cancellation: CancellationToken,
    ) {
        let lock = self.lock_for(&user);
        let guard = lock.lock().await;

        let session = match self.store.load(&user).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                drop(guard);
                self.start_with_cancellation(user, HashMap::new(), cancellation).await;
                return;
            }
            Err(err) => {
                tracing::error!(%user, %err, "state store failure on resume, dropping event");
                return;
            }
        };

        if !session.active {
            self.adapter
                .send(&user, "This dialog has ended. Send /start to begin again.")
                .await;
            return;
        }

        let Some(block) = self.scenario.block(session.current_block) else {
            let err = DriverError::MissingBlock(session.current_block);
            tracing::error!(%user, %err, "ending dialog");
            let mut session = session;
            session.active = false;
            let _ = self.store.save(&user, session).await;
            return;
        };

        let (transition, session) = handlers::dispatch(
            &self.scenario,
            &self.adapter,
            &user,
            block,
            session,
            Some(input),
            &cancellation,
        )
        .await;
        let session = self.apply_transition(&user, session, block.id, transition).await;

        if let Some(session) = session {
            self.advance_loop(&user, session, &cancellation).await;
        }
    }

    /// The auto-advance loop: repeatedly run the current block with no
    /// input until a handler returns `wait` or `break`, or the graph
    /// naturally ends.
    async fn advance_loop(&self, user: &UserKey, mut session: Session, cancellation: &CancellationToken) {
        loop {
            if !session.active || cancellation.is_cancelled() {
                return;
            }

            let Some(block) = self.scenario.block(session.current_block) else {
                let err = DriverError::MissingBlock(session.current_block);
                tracing::error!(%user, %err, "ending dialog");
                session.active = false;
                let _ = self.store.save(user, session).await;
                return;
            };

            let (transition, next_session) = handlers::dispatch(
                &self.scenario,
                &self.adapter,
                user,
                block,
                session,
                None,
                cancellation,
            )
            .await;

            match self.apply_transition(user, next_session, block.id, transition).await {
                Some(next) => session = next,
                None => return,
            }
        }
    }

    /// Persist `session` exactly once and decide whether the advance loop
    /// should keep running. Returns `None` when the loop must stop
    /// (suspended or ended); `Some(session)` to keep going.
    async fn apply_transition(
        &self,
        user: &UserKey,
        mut session: Session,
        current_block_id: BlockId,
        transition: Transition,
    ) -> Option<Session> {
        match transition {
            Transition::Continue => {
                let block = self.scenario.block(current_block_id);
                match block.and_then(|b| b.outgoing.first()) {
                    Some(next) => {
                        session.current_block = *next;
                        session.step = Step::Prompting;
                    }
                    None => session.active = false,
                }
            }
            Transition::ManualSwitch => {
                session.step = Step::Prompting;
            }
            Transition::Wait => {}
            Transition::Break => {
                session.active = false;
            }
        }

        let keep_going = session.active && !matches!(transition, Transition::Wait);

        if let Err(err) = self.store.save(user, session.clone()).await {
            tracing::error!(%user, %err, "state store failure, aborting current event");
            return None;
        }

        if keep_going {
            Some(session)
        } else {
            None
        }
    }
}
