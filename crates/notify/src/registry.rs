//! Fan-out Registry - per-account subscriber lists
//!
//! ```text
//! publish(event) ──► account has subscribers? ──yes──► account list, in order
//!                                 │no
//!                                 ▼
//!                           global list, in order
//! ```
//!
//! Lists are copied out of the map before any subscriber is awaited, so
//! attach/detach never wait on a slow subscriber and no map guard crosses an
//! `.await`.

use std::sync::{Arc, RwLock};

use corebank_core::AccountId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::event::AccountEvent;
use crate::subscriber::{deliver, Subscriber};

type SubscriberList = Vec<Arc<dyn Subscriber>>;

/// Outcome of one publish
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Subscribers that handled the event, in call order
    pub delivered: Vec<String>,

    /// (subscriber, error) for every failure
    pub failed: Vec<(String, String)>,

    /// True when the account had no subscribers of its own
    pub used_global: bool,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Registry of who hears about which account
pub struct FanoutRegistry {
    accounts: DashMap<AccountId, SubscriberList>,
    global: RwLock<SubscriberList>,
    catalog: RwLock<SubscriberList>,
}

impl Default for FanoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FanoutRegistry {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            global: RwLock::new(Vec::new()),
            catalog: RwLock::new(Vec::new()),
        }
    }

    /// Subscribers `attach_all` hands to an account
    pub fn with_catalog(self, catalog: SubscriberList) -> Self {
        if let Ok(mut known) = self.catalog.write() {
            *known = catalog;
        }
        self
    }

    /// Add a subscriber to the catalog, ignoring duplicate names
    pub fn register_known(&self, subscriber: Arc<dyn Subscriber>) {
        if let Ok(mut known) = self.catalog.write() {
            push_unique(&mut known, subscriber);
        }
    }

    /// Add a fallback subscriber for accounts without their own list
    pub fn attach_global(&self, subscriber: Arc<dyn Subscriber>) {
        if let Ok(mut global) = self.global.write() {
            tracing::debug!(subscriber = subscriber.name(), "Attached global subscriber");
            push_unique(&mut global, subscriber);
        }
    }

    pub fn detach_global(&self, name: &str) -> bool {
        self.global
            .write()
            .map(|mut global| remove_named(&mut global, name))
            .unwrap_or(false)
    }

    /// Attach a subscriber to an account. Returns false if one with the same
    /// name is already attached.
    pub fn attach(&self, account: AccountId, subscriber: Arc<dyn Subscriber>) -> bool {
        let name = subscriber.name().to_string();
        let added = push_unique(&mut self.accounts.entry(account).or_default(), subscriber);
        if added {
            tracing::debug!(account = %account, subscriber = %name, "Attached subscriber");
        }
        added
    }

    /// Detach by name. Returns false if nothing was attached under that name.
    pub fn detach(&self, account: AccountId, name: &str) -> bool {
        let removed = self
            .accounts
            .get_mut(&account)
            .map(|mut list| remove_named(&mut list, name))
            .unwrap_or(false);

        // An emptied list falls back to the global subscribers
        self.accounts.remove_if(&account, |_, list| list.is_empty());

        if removed {
            tracing::debug!(account = %account, subscriber = name, "Detached subscriber");
        }
        removed
    }

    /// Attach every catalog subscriber to an account. Returns how many were new.
    pub fn attach_all(&self, account: AccountId) -> usize {
        let catalog = self.catalog_snapshot();
        catalog
            .into_iter()
            .filter(|subscriber| self.attach(account, Arc::clone(subscriber)))
            .count()
    }

    /// Names attached to an account, in delivery order
    pub fn subscribers(&self, account: AccountId) -> Vec<String> {
        self.accounts
            .get(&account)
            .map(|list| list.iter().map(|s| s.name().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn global_subscribers(&self) -> Vec<String> {
        self.global_snapshot()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Deliver an event to the account's subscribers, or to the global list
    /// if the account has none.
    ///
    /// A failing or panicking subscriber is logged and skipped. Never returns
    /// an error.
    pub async fn publish(&self, event: &AccountEvent) -> DeliveryReport {
        let own = self
            .accounts
            .get(&event.account)
            .map(|list| list.value().clone());
        let (targets, used_global) = match own {
            Some(list) if !list.is_empty() => (list, false),
            _ => (self.global_snapshot(), true),
        };

        let mut report = DeliveryReport {
            used_global,
            ..DeliveryReport::default()
        };

        for subscriber in &targets {
            match deliver(subscriber.as_ref(), event).await {
                Ok(()) => {
                    tracing::debug!(
                        subscriber = subscriber.name(),
                        kind = %event.kind,
                        account = %event.account,
                        "Event delivered"
                    );
                    report.delivered.push(subscriber.name().to_string());
                }
                Err(e) => {
                    tracing::error!(
                        subscriber = subscriber.name(),
                        kind = %event.kind,
                        account = %event.account,
                        error = %e,
                        "Subscriber failed"
                    );
                    report
                        .failed
                        .push((subscriber.name().to_string(), e.to_string()));
                }
            }
        }

        if targets.is_empty() {
            tracing::debug!(account = %event.account, kind = %event.kind, "No subscribers for event");
        }

        report
    }

    fn global_snapshot(&self) -> SubscriberList {
        self.global.read().map(|g| g.clone()).unwrap_or_default()
    }

    fn catalog_snapshot(&self) -> SubscriberList {
        self.catalog.read().map(|c| c.clone()).unwrap_or_default()
    }
}

impl std::fmt::Debug for FanoutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutRegistry")
            .field("accounts", &self.accounts.len())
            .field("global", &self.global_subscribers())
            .finish()
    }
}

fn push_unique(list: &mut SubscriberList, subscriber: Arc<dyn Subscriber>) -> bool {
    if list.iter().any(|s| s.name() == subscriber.name()) {
        return false;
    }
    list.push(subscriber);
    true
}

fn remove_named(list: &mut SubscriberList, name: &str) -> bool {
    let before = list.len();
    list.retain(|s| s.name() != name);
    list.len() != before
}
