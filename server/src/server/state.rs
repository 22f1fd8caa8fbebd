//! Application state for the Gather HTTP server.
//!
//! Shared resources every handler needs: the entity store, the identity
//! provider, and the four engines. Cloned cheaply (all `Arc`) per request.

use crate::config::RegistrationConfig;
use gather_auth::IdentityProvider;
use gather_core::attendance::AttendanceEngine;
use gather_core::coupons::CouponEngine;
use gather_core::notifications::NotificationEngine;
use gather_core::registration::{RegistrationEngine, RegistrationPolicy};
use gather_core::{Clock, Store};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The entity store
    pub store: Arc<dyn Store>,
    /// External identity resolver
    pub identity: Arc<dyn IdentityProvider>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Registration engine
    pub registration: Arc<RegistrationEngine<dyn Store>>,
    /// Attendance engine
    pub attendance: Arc<AttendanceEngine<dyn Store>>,
    /// Coupon engine
    pub coupons: Arc<CouponEngine<dyn Store>>,
    /// Notification engine
    pub notifications: Arc<NotificationEngine<dyn Store>>,
}

impl AppState {
    /// Wires the engines over the given store, identity provider, and
    /// clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        registration_config: &RegistrationConfig,
    ) -> Self {
        let policy = RegistrationPolicy {
            require_event_registration: registration_config.require_event_registration,
        };
        Self {
            registration: Arc::new(RegistrationEngine::new(
                store.clone(),
                clock.clone(),
                policy,
            )),
            attendance: Arc::new(AttendanceEngine::new(store.clone(), clock.clone())),
            coupons: Arc::new(CouponEngine::new(store.clone(), clock.clone())),
            notifications: Arc::new(NotificationEngine::new(store.clone(), clock.clone())),
            store,
            identity,
            clock,
        }
    }
}
