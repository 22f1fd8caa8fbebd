//! Coupon engine: at-most-once redemption of per-event food coupons.
//!
//! Unlike check-in, a repeat redemption is a **hard conflict** (409): every
//! redemption hands over a physical consumable, so silently accepting a
//! second scan would double-spend the pool. The store's insert-if-absent on
//! (event, user, coupon) makes the guarantee hold under racing scans.

use crate::clock::Clock;
use crate::error::{ConflictReason, Error, Result};
use crate::store::{Redemption, Store};
use crate::types::{
    CouponId, EventId, FoodCoupon, Organization, RegistrationStatus, User, UserIdentifier,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Receipt for a successful redemption.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponReceipt {
    /// The event the coupon belongs to
    pub event_id: EventId,
    /// The redeeming user
    pub user: User,
    /// The coupon definition that was redeemed
    pub coupon: FoodCoupon,
    /// When the redemption was recorded
    pub scanned_at: DateTime<Utc>,
}

/// Coupon engine over a [`Store`].
pub struct CouponEngine<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store + ?Sized> CouponEngine<S> {
    /// Creates a new engine.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Redeems one coupon for one attendee, at most once per
    /// (event, user, coupon).
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the event is absent or not owned by `org`,
    ///   the identifier resolves to no user, or the coupon id is not among
    ///   the event's coupon definitions
    /// - [`Error::Conflict`] with `not_registered` if the user holds no
    ///   confirmed registration, or `already_redeemed` on a repeat
    /// - [`Error::Store`] if the store fails
    pub async fn redeem(
        &self,
        org: &Organization,
        event_id: EventId,
        identifier: &UserIdentifier,
        coupon_id: CouponId,
    ) -> Result<CouponReceipt> {
        self.store
            .event_owned_by(event_id, org.id)
            .await?
            .ok_or(Error::not_found("event"))?;

        let user = match identifier {
            UserIdentifier::Id(id) => self.store.user(*id).await?,
            UserIdentifier::External(id) => self.store.user_by_external_id(id).await?,
        }
        .ok_or(Error::not_found("user"))?;

        let coupon = self
            .store
            .coupons_for_event(event_id)
            .await?
            .into_iter()
            .find(|c| c.coupon_id == coupon_id)
            .ok_or(Error::not_found("coupon"))?;

        let registered = self
            .store
            .event_registration(event_id, user.id)
            .await?
            .is_some_and(|r| r.status == RegistrationStatus::Confirmed);
        if !registered {
            return Err(Error::Conflict(ConflictReason::NotRegistered));
        }

        match self
            .store
            .redeem_coupon(event_id, user.id, coupon_id, self.clock.now())
            .await?
        {
            Redemption::Redeemed { scanned_at } => {
                tracing::info!(
                    event_id = %event_id,
                    user_id = %user.id,
                    coupon_id = %coupon_id,
                    "coupon redeemed"
                );
                Ok(CouponReceipt {
                    event_id,
                    user,
                    coupon,
                    scanned_at,
                })
            }
            Redemption::AlreadyRedeemed => Err(Error::Conflict(ConflictReason::AlreadyRedeemed)),
        }
    }

    /// Adds a coupon definition to an owned event, assigning the next free
    /// per-event coupon number.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the event is absent or not owned by `org`
    /// - [`Error::Validation`] if the name is empty
    /// - [`Error::Store`] if the store fails
    pub async fn add_coupon(
        &self,
        org: &Organization,
        event_id: EventId,
        name: &str,
        description: Option<&str>,
        quantity: u32,
    ) -> Result<FoodCoupon> {
        if name.trim().is_empty() {
            return Err(Error::validation("Coupon name is required"));
        }

        self.store
            .event_owned_by(event_id, org.id)
            .await?
            .ok_or(Error::not_found("event"))?;

        self.store
            .add_coupon(event_id, name, description, quantity)
            .await?
            .ok_or(Error::not_found("event"))
    }
}
