//! The stats manager: public entry point and orchestration.

use crate::config::ManagerConfig;
use crate::error::{StatsError, StatsResult};
use crate::event::{StatEvent, StatEventKind};
use crate::offline::OfflineWriter;
use crate::scheduler::FlushScheduler;
use crate::service::StatsService;
use crate::user::LocalUser;
use parking_lot::Mutex;
use statsync_core::{DocumentPayload, DocumentState, StatDocument, StatValue};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error};

/// Event type handed to the offline writer when a push cannot reach the
/// service.
const OFFLINE_EVENT_TYPE: &str = "StatEvent";
/// Envelope field wrapping the serialized document in an offline event.
const OFFLINE_ENVELOPE_FIELD: &str = "svd";

/// Binds one local user's identity to its stat document and to a
/// remote-service client handle. Owned exclusively by the manager
/// registry.
struct UserStatsContext<S> {
    user: LocalUser,
    document: StatDocument,
    service: Arc<S>,
    /// Set while a dirty removal's final best-effort sync is in flight.
    /// The entry stays addressable for the completion handler, but every
    /// public operation treats the user as absent.
    pending_removal: bool,
}

/// Registry and event queue, guarded together by one lock so map, event,
/// and document transitions stay atomically consistent relative to
/// concurrent async completions.
struct Shared<S> {
    users: HashMap<String, UserStatsContext<S>>,
    events: Vec<StatEvent>,
}

struct ManagerInner<S: StatsService, W: OfflineWriter> {
    service: Arc<S>,
    offline: W,
    shared: Mutex<Shared<S>>,
    normal_flushes: FlushScheduler,
    priority_flushes: FlushScheduler,
}

/// The public entry point: owns the registry of active user contexts, a
/// background periodic sweep, two debounced flush schedulers (normal and
/// high priority), and the outbound event queue.
///
/// Synchronous methods return immediately after scheduling any network
/// work; results are applied later by completion handlers that hold only
/// a weak reference, so a dropped manager (or a concurrently removed
/// user) turns an in-flight completion into a silent no-op. The host must
/// call [`do_work`](StatsManager::do_work) on a regular cadence to drain
/// queued events and advance trigger-based flushing.
///
/// Must be created inside a tokio runtime.
///
/// # Example
///
/// ```
/// use statsync_engine::{
///     LocalUser, ManagerConfig, MockStatsService, NoopOfflineWriter, StatsManager,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let manager = StatsManager::new(
///     ManagerConfig::default(),
///     MockStatsService::new(),
///     NoopOfflineWriter,
/// );
///
/// let user = LocalUser::new("user-1");
/// manager.add_local_user(&user).unwrap();
/// manager.set_stat_number(&user, "score", 42.0).unwrap();
///
/// let events = manager.do_work();
/// # let _ = events;
/// # }
/// ```
pub struct StatsManager<S: StatsService, W: OfflineWriter> {
    inner: Arc<ManagerInner<S, W>>,
}

impl<S: StatsService, W: OfflineWriter> StatsManager<S, W> {
    /// Creates a manager and starts its background sweep.
    pub fn new(config: ManagerConfig, service: S, offline: W) -> Self {
        let service = Arc::new(service);
        let inner = Arc::new_cyclic(|weak: &Weak<ManagerInner<S, W>>| ManagerInner {
            service,
            offline,
            shared: Mutex::new(Shared {
                users: HashMap::new(),
                events: Vec::new(),
            }),
            normal_flushes: flush_scheduler(weak.clone(), config.debounce_window),
            priority_flushes: flush_scheduler(weak.clone(), config.debounce_window),
        });
        ManagerInner::spawn_sweep(&inner, config.sweep_interval);
        Self { inner }
    }

    /// Registers a local user for stat tracking and spawns the initial
    /// document fetch. Returns `InvalidArgument` if the user is already
    /// present (including a removal still completing).
    pub fn add_local_user(&self, user: &LocalUser) -> StatsResult<()> {
        self.inner.add_local_user(user)
    }

    /// Unregisters a local user. A dirty document gets a final
    /// best-effort sync before the context is dropped; either way exactly
    /// one `UserRemoved` event is queued, and the user is absent from all
    /// other operations as soon as this call returns.
    pub fn remove_local_user(&self, user: &LocalUser) -> StatsResult<()> {
        self.inner.remove_local_user(user)
    }

    /// Applies pending local work, clears dirtiness, and arms the
    /// high-priority or normal debounce scheduler for the user.
    pub fn request_flush_to_service(&self, user: &LocalUser, high_priority: bool) -> StatsResult<()> {
        self.inner.request_flush_to_service(user, high_priority)
    }

    /// Writes a numeric stat. Purely local; propagation happens via the
    /// flush path.
    pub fn set_stat_number(&self, user: &LocalUser, name: &str, value: f64) -> StatsResult<()> {
        let mut shared = self.inner.shared.lock();
        let ctx = ManagerInner::<S, W>::require_mut(&mut shared, user)?;
        ctx.document.set_stat_number(name, value)?;
        Ok(())
    }

    /// Writes a string stat. Purely local; propagation happens via the
    /// flush path.
    pub fn set_stat_text(&self, user: &LocalUser, name: &str, value: &str) -> StatsResult<()> {
        let mut shared = self.inner.shared.lock();
        let ctx = ManagerInner::<S, W>::require_mut(&mut shared, user)?;
        ctx.document.set_stat_text(name, value)?;
        Ok(())
    }

    /// Reads a stat from the user's local document. No network.
    pub fn get_stat(&self, user: &LocalUser, name: &str) -> StatsResult<StatValue> {
        let shared = self.inner.shared.lock();
        let ctx = ManagerInner::<S, W>::require(&shared, user)?;
        Ok(ctx.document.get_stat(name)?.clone())
    }

    /// All known stat names for the user, in insertion order.
    pub fn stat_names(&self, user: &LocalUser) -> StatsResult<Vec<String>> {
        let shared = self.inner.shared.lock();
        let ctx = ManagerInner::<S, W>::require(&shared, user)?;
        Ok(ctx.document.stat_names())
    }

    /// The freshness state of the user's document.
    pub fn document_state(&self, user: &LocalUser) -> StatsResult<DocumentState> {
        let shared = self.inner.shared.lock();
        let ctx = ManagerInner::<S, W>::require(&shared, user)?;
        Ok(ctx.document.state())
    }

    /// Returns true if the user's document has writes not yet confirmed
    /// synced.
    pub fn is_document_dirty(&self, user: &LocalUser) -> StatsResult<bool> {
        let shared = self.inner.shared.lock();
        let ctx = ManagerInner::<S, W>::require(&shared, user)?;
        Ok(ctx.document.is_dirty())
    }

    /// Drains and returns the accumulated event list, and pumps local
    /// bookkeeping on every registered document so a due flush trigger
    /// fires even without an explicit flush request.
    pub fn do_work(&self) -> Vec<StatEvent> {
        let mut shared = self.inner.shared.lock();
        for ctx in shared.users.values_mut() {
            if !ctx.pending_removal {
                ctx.document.do_work();
            }
        }
        std::mem::take(&mut shared.events)
    }
}

/// Builds a debounce scheduler whose expiry flushes each batched user.
/// The callback holds only a weak manager reference.
fn flush_scheduler<S: StatsService, W: OfflineWriter>(
    weak: Weak<ManagerInner<S, W>>,
    window: Duration,
) -> FlushScheduler {
    FlushScheduler::new(
        window,
        Arc::new(move |user_ids| {
            for user_id in user_ids {
                tokio::spawn(ManagerInner::flush_user(weak.clone(), user_id));
            }
        }),
    )
}

impl<S: StatsService, W: OfflineWriter> ManagerInner<S, W> {
    fn context<'a>(shared: &'a Shared<S>, user_id: &str) -> Option<&'a UserStatsContext<S>> {
        shared.users.get(user_id).filter(|ctx| !ctx.pending_removal)
    }

    fn context_mut<'a>(
        shared: &'a mut Shared<S>,
        user_id: &str,
    ) -> Option<&'a mut UserStatsContext<S>> {
        shared
            .users
            .get_mut(user_id)
            .filter(|ctx| !ctx.pending_removal)
    }

    fn require<'a>(
        shared: &'a Shared<S>,
        user: &LocalUser,
    ) -> StatsResult<&'a UserStatsContext<S>> {
        Self::context(shared, user.user_id())
            .ok_or_else(|| StatsError::InvalidArgument("user not found in local map".into()))
    }

    fn require_mut<'a>(
        shared: &'a mut Shared<S>,
        user: &LocalUser,
    ) -> StatsResult<&'a mut UserStatsContext<S>> {
        Self::context_mut(shared, user.user_id())
            .ok_or_else(|| StatsError::InvalidArgument("user not found in local map".into()))
    }

    fn add_local_user(self: &Arc<Self>, user: &LocalUser) -> StatsResult<()> {
        let user_id = user.user_id().to_string();
        {
            let mut shared = self.shared.lock();
            if shared.users.contains_key(&user_id) {
                return Err(StatsError::InvalidArgument("user already in local map".into()));
            }

            let mut document = StatDocument::new();
            document.set_state(DocumentState::Loading);
            shared.users.insert(
                user_id.clone(),
                UserStatsContext {
                    user: user.clone(),
                    document,
                    service: Arc::clone(&self.service),
                    pending_removal: false,
                },
            );
        }

        let weak = Arc::downgrade(self);
        let service = Arc::clone(&self.service);
        let user = user.clone();
        tokio::spawn(async move {
            let fetched = service.fetch_document(user.user_id()).await;
            if let Some(inner) = weak.upgrade() {
                inner.complete_add(&user, fetched);
            }
        });

        Ok(())
    }

    /// Applies the initial fetch outcome for a newly added user.
    fn complete_add(self: &Arc<Self>, user: &LocalUser, fetched: StatsResult<DocumentPayload>) {
        let user_id = user.user_id();
        let mut shared = self.shared.lock();

        if user.is_signed_in() {
            // The user could have been removed by the time this lands.
            if let Some(ctx) = Self::context_mut(&mut shared, user_id) {
                match &fetched {
                    Ok(remote) => {
                        ctx.document.merge(remote);
                        ctx.document.set_state(DocumentState::Loaded);
                    }
                    // Fetch failed but the user is signed in: assume an
                    // offline sign-in rather than failing the add.
                    Err(_) => ctx.document.set_state(DocumentState::OfflineNotLoaded),
                }

                let weak = Arc::downgrade(self);
                let trigger_id = user_id.to_string();
                ctx.document.set_flush_trigger(Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.normal_flushes.fire(&trigger_id);
                    }
                }));
            }
        } else {
            debug!(user_id, "could not get stat document and user is not signed in");
        }

        shared.events.push(StatEvent::new(
            StatEventKind::UserAdded,
            user_id,
            fetched.map(|_| ()),
        ));
    }

    fn remove_local_user(self: &Arc<Self>, user: &LocalUser) -> StatsResult<()> {
        let user_id = user.user_id().to_string();
        let mut shared = self.shared.lock();
        let Some(ctx) = Self::context_mut(&mut shared, &user_id) else {
            return Err(StatsError::InvalidArgument("user not found in local map".into()));
        };

        if !ctx.document.is_dirty() {
            shared
                .events
                .push(StatEvent::new(StatEventKind::UserRemoved, &user_id, Ok(())));
            shared.users.remove(&user_id);
            return Ok(());
        }

        // Final local apply, with the trigger detached so it cannot arm
        // another flush for a user that is going away.
        ctx.document.clear_flush_trigger();
        ctx.document.do_work();
        ctx.pending_removal = true;
        let payload = ctx.document.to_payload();
        let service = Arc::clone(&ctx.service);
        drop(shared);

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let result = service.update_document(&user_id, payload).await;
            if let Some(inner) = weak.upgrade() {
                inner.complete_removal(&user_id, result);
            }
        });

        Ok(())
    }

    /// Applies the best-effort sync outcome for a removed user and evicts
    /// the context.
    fn complete_removal(&self, user_id: &str, result: StatsResult<()>) {
        let mut shared = self.shared.lock();
        let Some(ctx) = shared.users.get(user_id) else {
            return;
        };

        if result.as_ref().is_err_and(StatsError::is_connectivity) {
            let payload = ctx.document.to_payload();
            self.write_offline(user_id, &payload);
        }

        shared
            .events
            .push(StatEvent::new(StatEventKind::UserRemoved, user_id, result));
        shared.users.remove(user_id);
    }

    fn request_flush_to_service(
        self: &Arc<Self>,
        user: &LocalUser,
        high_priority: bool,
    ) -> StatsResult<()> {
        let user_id = user.user_id();
        {
            let mut shared = self.shared.lock();
            let ctx = Self::require_mut(&mut shared, user)?;
            // set_stat applies writes immediately, so the only pending
            // local work before a flush is dropping the dirty marker; the
            // scheduled flush reports its own outcome. Invoking the
            // document trigger here would arm a second window.
            if ctx.document.is_dirty() {
                ctx.document.clear_dirty();
            }
        }

        if high_priority {
            self.priority_flushes.fire(user_id);
        } else {
            self.normal_flushes.fire(user_id);
        }
        Ok(())
    }

    /// Background safety net: flush every dirty document so writes reach
    /// the service even if the host never requests a flush.
    fn spawn_sweep(inner: &Arc<Self>, interval: Duration) {
        // tokio intervals must be non-zero.
        let interval = interval.max(Duration::from_millis(1));
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.sweep();
            }
        });
    }

    fn sweep(self: &Arc<Self>) {
        let dirty: Vec<String> = {
            let mut shared = self.shared.lock();
            shared
                .users
                .values_mut()
                .filter(|ctx| !ctx.pending_removal && ctx.document.is_dirty())
                .map(|ctx| {
                    ctx.document.clear_dirty();
                    ctx.user.user_id().to_string()
                })
                .collect()
        };

        for user_id in dirty {
            tokio::spawn(Self::flush_user(Arc::downgrade(self), user_id));
        }
    }

    /// Pushes a user's document to the service, re-fetching and merging
    /// first if the document has never seen the server's baseline. Every
    /// outcome is recorded as an `UpdateCompleted` event.
    async fn flush_user(this: Weak<Self>, user_id: String) {
        let (service, needs_fetch) = {
            let Some(inner) = this.upgrade() else { return };
            let shared = inner.shared.lock();
            let Some(ctx) = Self::context(&shared, &user_id) else { return };
            (
                Arc::clone(&ctx.service),
                ctx.document.state() != DocumentState::Loaded,
            )
        };

        if needs_fetch {
            // Pushing a document that has never seen the server's
            // baseline would silently drop server-only stats. A fetch
            // failure is tolerated; the push proceeds with local state.
            let fetched = service.fetch_document(&user_id).await;
            let Some(inner) = this.upgrade() else { return };
            let mut shared = inner.shared.lock();
            let Some(ctx) = Self::context_mut(&mut shared, &user_id) else { return };
            if let Ok(remote) = &fetched {
                ctx.document.merge(remote);
                ctx.document.set_state(DocumentState::Loaded);
            }
        }

        let payload = {
            let Some(inner) = this.upgrade() else { return };
            let mut shared = inner.shared.lock();
            let Some(ctx) = Self::context_mut(&mut shared, &user_id) else { return };
            // Writes landing after this snapshot re-mark the document and
            // get their own flush.
            ctx.document.clear_dirty();
            ctx.document.to_payload()
        };

        let result = service.update_document(&user_id, payload).await;

        let Some(inner) = this.upgrade() else { return };
        inner.complete_update(&user_id, result);
    }

    /// Applies a push outcome: offline transition and fallback logging
    /// for connectivity failures, event queueing for every outcome.
    fn complete_update(&self, user_id: &str, result: StatsResult<()>) {
        let mut shared = self.shared.lock();
        let Some(ctx) = Self::context_mut(&mut shared, user_id) else {
            return;
        };

        if let Err(err) = &result {
            if err.is_connectivity() {
                if ctx.document.state() == DocumentState::Loaded {
                    ctx.document.set_state(DocumentState::OfflineLoaded);
                }
                let payload = ctx.document.to_payload();
                self.write_offline(user_id, &payload);
            } else {
                // Local state is left as-is so a later retry can succeed.
                error!(user_id, %err, "could not push stat value document");
            }
        }

        shared.events.push(StatEvent::new(
            StatEventKind::UpdateCompleted,
            user_id,
            result,
        ));
    }

    /// Hands the serialized document to the durable offline log under the
    /// `"svd"` envelope. Eventual delivery is the collaborator's problem.
    fn write_offline(&self, user_id: &str, payload: &DocumentPayload) {
        let serialized = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                error!(user_id, %err, "could not serialize stat document for offline write");
                return;
            }
        };

        let mut record = serde_json::Map::new();
        record.insert(OFFLINE_ENVELOPE_FIELD.to_string(), serialized);

        if let Err(err) = self
            .offline
            .write_event(OFFLINE_EVENT_TYPE, serde_json::Value::Object(record))
        {
            error!(user_id, %err, "offline write for stats failed");
        }
    }
}
