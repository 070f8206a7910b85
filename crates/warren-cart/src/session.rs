//! # Cart Session
//!
//! The storefront's cart state for one browser session: a store, a pointer
//! to whose bucket is current, and the set of users already merged.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(42)                                                              │
//! │     │                                                                   │
//! │     ├─ owner := user:42                                                 │
//! │     │                                                                   │
//! │     ├─ already merged 42 this session? ──yes──► return cart:user:42     │
//! │     │                                                                   │
//! │     ├─ read cart:guest, read cart:user:42   (unreadable → empty)        │
//! │     ├─ guest empty? ──yes──► remove stored empty cart:guest, remember 42 │
//! │     ├─ merge_items(guest, user)                                         │
//! │     ├─ write cart:user:42                                               │
//! │     │     ok  ──► remove cart:guest, remember 42                        │
//! │     │     err ──► keep cart:guest for the next attempt                  │
//! │     └─ return merged bucket                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fail-Open
//! Nothing here returns a storage error. An unreadable, corrupt or
//! wrong-version bucket reads as empty; a failed write is logged and the
//! in-memory result is still returned.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use warren_core::cart::{merge_items, CartTotals};
use warren_core::{
    CartBucket, CartOwner, CustomerDetails, ItemKey, LineItem, OrderLineRequest, OrderRequest,
    ValidationError,
};

use crate::error::{CartStoreError, CartStoreResult};
use crate::store::CartStore;

pub struct CartSession<S: CartStore> {
    store: S,
    owner: CartOwner,
    merged_users: HashSet<i64>,
}

impl<S: CartStore> CartSession<S> {
    /// Starts a guest session.
    pub fn new(store: S) -> Self {
        CartSession {
            store,
            owner: CartOwner::Guest,
            merged_users: HashSet::new(),
        }
    }

    #[inline]
    pub fn owner(&self) -> CartOwner {
        self.owner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The current owner's bucket.
    pub fn current(&self) -> CartBucket {
        self.load(self.owner)
    }

    pub fn totals(&self) -> CartTotals {
        self.current().totals()
    }

    // =========================================================================
    // Owner Switching
    // =========================================================================

    /// Switches to the user's bucket, merging the guest cart into it the
    /// first time this user signs in during this session.
    pub fn login(&mut self, user_id: i64) -> CartBucket {
        let owner = CartOwner::User(user_id);
        self.owner = owner;

        if self.merged_users.contains(&user_id) {
            debug!(user_id, "Cart already merged this session");
            return self.load(owner);
        }

        let guest = self.load(CartOwner::Guest);
        let user = self.load(owner);

        if guest.is_empty() {
            // An unreadable guest bucket also loads as empty; only a stored,
            // readable one is spent.
            if let Ok(Some(_)) = self.try_load(CartOwner::Guest) {
                self.remove_guest();
            }
            self.merged_users.insert(user_id);
            return user;
        }

        let merged = CartBucket::with_items(owner, merge_items(&guest.items, &user.items));

        match self.save(&merged) {
            Ok(()) => {
                self.remove_guest();
                self.merged_users.insert(user_id);
                info!(
                    user_id,
                    guest_lines = guest.items.len(),
                    user_lines = user.items.len(),
                    merged_lines = merged.items.len(),
                    "Guest cart merged into user cart"
                );
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to save merged cart; guest cart kept");
            }
        }

        merged
    }

    /// Switches back to the guest bucket.
    pub fn logout(&mut self) -> CartBucket {
        debug!(previous = %self.owner, "Cart owner reset to guest");
        self.owner = CartOwner::Guest;
        self.load(CartOwner::Guest)
    }

    // =========================================================================
    // Mutations (current bucket)
    // =========================================================================

    /// Adds an item; returns the line's quantity afterwards.
    pub fn add(&mut self, item: LineItem) -> i64 {
        self.mutate(|b| b.add(item))
    }

    pub fn increment(&mut self, key: &ItemKey) -> bool {
        self.mutate(|b| b.increment(key))
    }

    pub fn decrement(&mut self, key: &ItemKey) -> bool {
        self.mutate(|b| b.decrement(key))
    }

    pub fn set_quantity(&mut self, key: &ItemKey, quantity: i64) -> Option<i64> {
        self.mutate(|b| b.set_quantity(key, quantity))
    }

    pub fn remove(&mut self, key: &ItemKey) -> bool {
        self.mutate(|b| b.remove(key))
    }

    /// Records a freshly fetched stock figure (`None` for unbounded).
    pub fn refresh_stock(&mut self, key: &ItemKey, stock: Option<i64>) -> bool {
        self.mutate(|b| b.refresh_stock(key, stock))
    }

    /// Re-clamps the current bucket; call once each time the cart view
    /// mounts. Returns how many lines were dropped.
    pub fn on_view_mount(&mut self) -> usize {
        let dropped = self.mutate(CartBucket::reconcile);
        if dropped > 0 {
            info!(owner = %self.owner, dropped, "Dropped sold-out cart lines");
        }
        dropped
    }

    /// Empties the current bucket once the server accepted the order.
    pub fn checkout_succeeded(&mut self) {
        self.mutate(CartBucket::clear);
    }

    /// Builds the order request body for the current bucket.
    ///
    /// Only keys and quantities are sent; the server prices every line from
    /// its own catalog. A signed-in owner fills `user_id` when the caller
    /// left it empty.
    pub fn checkout_request(
        &self,
        mut customer: CustomerDetails,
    ) -> Result<OrderRequest, ValidationError> {
        let bucket = self.current();
        if bucket.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }

        if let (None, CartOwner::User(id)) = (customer.user_id, self.owner) {
            customer.user_id = Some(id);
        }

        Ok(OrderRequest {
            customer,
            items: bucket
                .items
                .iter()
                .map(|line| OrderLineRequest {
                    item: line.key,
                    quantity: line.quantity,
                })
                .collect(),
        })
    }

    // =========================================================================
    // Storage
    // =========================================================================

    fn mutate<R>(&mut self, f: impl FnOnce(&mut CartBucket) -> R) -> R {
        let mut bucket = self.current();
        let result = f(&mut bucket);
        if let Err(e) = self.save(&bucket) {
            warn!(owner = %self.owner, error = %e, "Failed to save cart");
        }
        result
    }

    fn remove_guest(&self) {
        if let Err(e) = self.store.remove(&CartOwner::Guest.storage_key()) {
            warn!(error = %e, "Failed to clear guest cart after merge");
        }
    }

    /// Reads a bucket, treating every failure as an empty bucket.
    fn load(&self, owner: CartOwner) -> CartBucket {
        match self.try_load(owner) {
            Ok(Some(bucket)) => bucket,
            Ok(None) => CartBucket::empty(owner),
            Err(e) => {
                warn!(owner = %owner, error = %e, "Unreadable cart treated as empty");
                CartBucket::empty(owner)
            }
        }
    }

    fn try_load(&self, owner: CartOwner) -> CartStoreResult<Option<CartBucket>> {
        let key = owner.storage_key();
        let Some(raw) = self.store.read(&key)? else {
            return Ok(None);
        };

        let bucket: CartBucket = serde_json::from_str(&raw)
            .map_err(|source| CartStoreError::Corrupt { key: key.clone(), source })?;

        if !bucket.is_supported_version() {
            return Err(CartStoreError::UnsupportedVersion {
                key,
                found: bucket.version,
            });
        }

        // A bucket copied under another key still belongs to this owner.
        Ok(Some(CartBucket { owner, ..bucket }))
    }

    fn save(&self, bucket: &CartBucket) -> CartStoreResult<()> {
        let key = bucket.owner.storage_key();
        let raw = serde_json::to_string(bucket)
            .map_err(|source| CartStoreError::Corrupt { key: key.clone(), source })?;
        self.store.write(&key, &raw)
    }
}
