//! Vitrine Reactive - Live row and table views.
//!
//! This crate implements the identity-preserving cache layer:
//!
//! - [`RowView`]: a single cached record, shared by reference across every
//!   container that displays it. Reference-counted by owner id and torn
//!   down only when the last owner lets go.
//! - [`TableView`]: an ordered, filter-backed container of row views with
//!   incremental two-pointer merges for known create/delete id sets, and a
//!   total row count decoupled from the loaded window.
//! - [`SubscriptionManager`]: callback registry with unsubscribe tokens,
//!   used by both view kinds.
//!
//! Views perform no I/O. Reloads and update refetches are driven by the
//! database layer, which pushes prepared row views into the containers;
//! removal is synchronous, there is no background eviction.

#![no_std]

extern crate alloc;

mod row_view;
mod subscription;
mod table_view;

pub use row_view::RowView;
pub use subscription::{Subscription, SubscriptionId, SubscriptionManager};
pub use table_view::{TableView, ViewId};
