// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Drift observer: watches kernel events for divergence from the current
//! config and requests rate-limited reconciliation.
//!
//! The observer never writes to the kernel itself. It asks for an apply by
//! sending on the reconcile channel; the daemon's reconcile task runs the
//! normal apply pipeline, which calls `mark_change` again and so suppresses
//! the echo events the apply produces.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jack_adapters::{AddressUpdate, KernelEvents, LinkUpdate, RouteAction, RouteUpdate};
use jack_core::{destinations_equal, Clock, Interface, Route};
use jack_store::{ObserverSettings, StateStore};

/// Kernel events within this window of our own writes are echoes, not drift.
const CHANGE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Reconcile interval used when the configured value is zero.
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

pub struct Observer {
    clock: Arc<dyn Clock>,
    settings: Mutex<ObserverSettings>,
    last_change: Mutex<Option<Instant>>,
    /// `None` until the first reconcile, so the first detected drift
    /// reconciles immediately (equivalent to starting one interval in the
    /// past).
    last_reconcile: Mutex<Option<Instant>>,
    reconcile_tx: mpsc::Sender<()>,
    stop: CancellationToken,
}

impl Observer {
    /// `reconcile_tx` feeds the daemon's reconcile task.
    pub fn new(
        clock: Arc<dyn Clock>,
        settings: ObserverSettings,
        reconcile_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            clock,
            settings: Mutex::new(settings),
            last_change: Mutex::new(None),
            last_reconcile: Mutex::new(None),
            reconcile_tx,
            stop: CancellationToken::new(),
        }
    }

    pub fn update_settings(&self, settings: ObserverSettings) {
        *self.settings.lock() = settings;
    }

    /// Record that jack itself is about to touch the kernel.
    pub fn mark_change(&self) {
        *self.last_change.lock() = Some(self.clock.now());
    }

    /// Whether a kernel event should be treated as an echo of our own write.
    pub fn recently_changed(&self) -> bool {
        self.last_change
            .lock()
            .is_some_and(|at| self.clock.now().duration_since(at) < CHANGE_DEBOUNCE)
    }

    /// Request reconciliation, subject to the enable flag and rate limit.
    /// Returns whether a reconcile was actually enqueued.
    pub fn maybe_reconcile(&self) -> bool {
        let settings = *self.settings.lock();
        if !settings.auto_reconcile {
            debug!("auto-reconcile disabled; drift left in place");
            return false;
        }
        let interval = effective_interval(&settings);
        let now = self.clock.now();
        {
            let mut last = self.last_reconcile.lock();
            if last.is_some_and(|at| now.duration_since(at) < interval) {
                debug!("reconcile rate-limited");
                return false;
            }
            *last = Some(now);
        }
        if self.reconcile_tx.try_send(()).is_err() {
            // A reconcile is already queued
            return false;
        }
        info!("drift reconciliation enqueued");
        true
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Consume kernel events until stopped or the streams close.
    pub async fn run(&self, mut events: KernelEvents, store: Arc<StateStore>) {
        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                update = events.links.recv() => match update {
                    Some(update) => self.on_link(&update, &store),
                    None => break,
                },
                update = events.addresses.recv() => match update {
                    Some(update) => self.on_address(&update, &store),
                    None => break,
                },
                update = events.routes.recv() => match update {
                    Some(update) => self.on_route(&update, &store),
                    None => break,
                },
            }
        }
        debug!("observer loop ended");
    }

    fn on_link(&self, update: &LinkUpdate, store: &StateStore) {
        if self.recently_changed() {
            debug!(link = %update.name, "ignoring echo of our own change");
            return;
        }
        let Some(interfaces) = store.current_interfaces() else { return };
        if let Some(drift) = check_link_drift(&interfaces, update) {
            warn!(drift = %drift, "link drift detected");
            self.maybe_reconcile();
        }
    }

    fn on_address(&self, update: &AddressUpdate, store: &StateStore) {
        if self.recently_changed() {
            debug!(link = %update.link, "ignoring echo of our own change");
            return;
        }
        let Some(interfaces) = store.current_interfaces() else { return };
        if let Some(drift) = check_address_drift(&interfaces, update) {
            warn!(drift = %drift, "address drift detected");
            self.maybe_reconcile();
        }
    }

    fn on_route(&self, update: &RouteUpdate, store: &StateStore) {
        if self.recently_changed() {
            debug!("ignoring echo of our own change");
            return;
        }
        let Some(routes) = store.current_routes() else { return };
        if let Some(drift) = check_route_drift(&routes, update) {
            warn!(drift = %drift, "route drift detected");
            self.maybe_reconcile();
        }
    }
}

fn effective_interval(settings: &ObserverSettings) -> Duration {
    if settings.reconcile_interval_ms == 0 {
        DEFAULT_RECONCILE_INTERVAL
    } else {
        Duration::from_millis(settings.reconcile_interval_ms)
    }
}

/// Link drift: up/down mismatch first, then mtu. First rule wins.
pub fn check_link_drift(
    interfaces: &BTreeMap<String, Interface>,
    update: &LinkUpdate,
) -> Option<String> {
    let (name, interface) =
        interfaces.iter().find(|(_, i)| i.matches_link(&update.name))?;
    if interface.enabled && !update.up {
        return Some(format!(
            "Interface {} ({}) is down but should be up",
            update.name, name
        ));
    }
    if !interface.enabled && update.up {
        return Some(format!(
            "Interface {} ({}) is up but should be down",
            update.name, name
        ));
    }
    if interface.mtu > 0 && update.mtu != interface.mtu {
        return Some(format!(
            "Interface {} ({}) has mtu {} but should have {}",
            update.name, name, update.mtu, interface.mtu
        ));
    }
    None
}

/// Address drift: a new address that does not match the desired host part.
pub fn check_address_drift(
    interfaces: &BTreeMap<String, Interface>,
    update: &AddressUpdate,
) -> Option<String> {
    if !update.added {
        return None;
    }
    let (name, interface) =
        interfaces.iter().find(|(_, i)| i.matches_link(&update.link))?;
    if interface.ipaddr.is_empty() {
        return None;
    }
    let desired = interface.host_addr();
    if update.address != desired {
        return Some(format!(
            "Interface {} ({}) has address {} but should have {}",
            update.link, name, update.address, desired
        ));
    }
    None
}

/// Route drift against every enabled desired route with a matching
/// destination (with `default` ≡ `0.0.0.0/0` and canonicalised CIDRs).
pub fn check_route_drift(
    routes: &BTreeMap<String, Route>,
    update: &RouteUpdate,
) -> Option<String> {
    let actual_dest =
        update.destination.clone().unwrap_or_else(|| "0.0.0.0/0".to_string());
    for route in routes.values().filter(|r| r.enabled) {
        if !destinations_equal(&route.destination, &actual_dest) {
            continue;
        }
        let display = format!("{} ({})", route.destination, route.normalized_destination());
        match update.action {
            RouteAction::Deleted => {
                return Some(format!("Route {display} was deleted externally"));
            }
            RouteAction::Added => {
                if !route.gateway.is_empty()
                    && update.gateway.as_deref() != Some(route.gateway.as_str())
                {
                    let actual =
                        update.gateway.clone().unwrap_or_else(|| "(none)".to_string());
                    return Some(format!(
                        "Route {display} has gateway {actual} but should have {}",
                        route.gateway
                    ));
                }
                if route.table > 0 && update.table != route.table {
                    return Some(format!(
                        "Route {display} has table {} but should have {}",
                        update.table, route.table
                    ));
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
