//! Background work for the dashboard
//!
//! The refresher runs every GitHub read of the dashboard on spawned tokio
//! tasks and posts the results to the event loop as [`DashboardEvent`]s.
//! Its timer only posts [`DashboardEvent::Tick`]; the event loop answers a
//! tick with [`Refresher::run_cycle`], which skips the cycle while another
//! aggregation is in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::dashboard::{AggregationRequest, AggregationResult, Dashboard};
use crate::models::{RepositoryListEntry, UserProfile};

/// Messages posted by background tasks
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// Poll interval elapsed
    Tick,
    Aggregated(AggregationResult),
    Repositories(Result<Vec<RepositoryListEntry>, String>),
    Profile(Result<UserProfile, String>),
}

/// Number of aggregations currently running
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

/// Marks one running aggregation until dropped
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicUsize>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }

    /// Enter only if nothing else is running
    pub fn try_enter(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }

    /// Enter unconditionally; user-triggered loads never wait for a refresh
    pub fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.0.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Refresher {
    aggregator: Aggregator,
    poll_interval: Duration,
    sender: mpsc::UnboundedSender<DashboardEvent>,
    in_flight: InFlight,
    timer: Option<JoinHandle<()>>,
}

impl Refresher {
    pub fn new(
        aggregator: Aggregator,
        poll_interval: Duration,
        sender: mpsc::UnboundedSender<DashboardEvent>,
    ) -> Self {
        Self {
            aggregator,
            poll_interval,
            sender,
            in_flight: InFlight::new(),
            timer: None,
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Start the poll timer; the first tick fires one interval from now
    pub fn start(&mut self) {
        if self.timer.is_some() {
            return;
        }

        let sender = self.sender.clone();
        let period = self.poll_interval;
        info!("Refresher started with interval: {:?}", period);

        self.timer = Some(tokio::spawn(async move {
            let mut timer = interval(period);
            // Skip the first immediate tick
            timer.tick().await;

            loop {
                timer.tick().await;
                if sender.send(DashboardEvent::Tick).is_err() {
                    debug!("Dashboard event channel closed, stopping timer");
                    break;
                }
            }
        }));
    }

    /// Stop the poll timer; aggregations already spawned run to completion
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!("Refresher stopped");
        }
    }

    /// Fetch the signed-in user's profile and repository list
    pub fn mount(&self, username: &str) {
        let api = self.aggregator.api().clone();
        let sender = self.sender.clone();
        let username = username.to_string();

        tokio::spawn(async move {
            let profile = api.user(&username).await.map_err(|e| format!("{:#}", e));
            let _ = sender.send(DashboardEvent::Profile(profile));

            let repositories = api
                .list_repositories()
                .await
                .map_err(|e| format!("{:#}", e));
            let _ = sender.send(DashboardEvent::Repositories(repositories));
        });
    }

    /// Non-silent load of `owner/repo`, e.g. after a repository switch
    pub fn load(&self, dashboard: &mut Dashboard, owner: &str, repo: &str) {
        let guard = self.in_flight.enter();
        let request = dashboard.begin_aggregation(owner, repo, true);
        info!("Loading {}/{}", owner, repo);
        self.spawn_aggregation(request, guard, false);
    }

    /// One poll cycle: silent aggregation plus repository list refresh
    ///
    /// Returns false when the cycle was skipped.
    pub fn run_cycle(&self, dashboard: &mut Dashboard) -> bool {
        let Some(guard) = self.in_flight.try_enter() else {
            debug!("Aggregation in flight, skipping refresh");
            return false;
        };
        let Some(request) = dashboard.begin_refresh() else {
            debug!("No repository selected, skipping refresh");
            return false;
        };

        debug!("Refreshing {}/{}", request.owner, request.repo);
        self.spawn_aggregation(request, guard, true);
        true
    }

    fn spawn_aggregation(
        &self,
        request: AggregationRequest,
        guard: InFlightGuard,
        refresh_repositories: bool,
    ) {
        let aggregator = self.aggregator.clone();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let outcome = aggregator
                .aggregate(
                    &request.owner,
                    &request.repo,
                    request.reset_selection,
                    request.previous.as_ref(),
                )
                .await
                .map_err(|e| format!("{:#}", e));

            if refresh_repositories {
                let repositories = aggregator
                    .api()
                    .list_repositories()
                    .await
                    .map_err(|e| format!("{:#}", e));
                let _ = sender.send(DashboardEvent::Repositories(repositories));
            }

            // Cleared before the result is posted so the event loop never
            // sees a finished aggregation as still running
            drop(guard);
            let _ = sender.send(DashboardEvent::Aggregated(AggregationResult { request, outcome }));
        });
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.stop();
    }
}
