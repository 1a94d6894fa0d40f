// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Resolving glob patterns to concrete paths ([`resolve`]).
//! - Subscribing to OS change notifications ([`subscription`]).
//! - Rate-limiting callbacks per watcher ([`throttle`]).
//! - Running one watcher per pattern set ([`watcher`]) and one watcher per
//!   named group ([`group`]).
//!
//! Event kinds are not filtered: creates, writes, removes and renames all
//! count as "something changed".

pub mod group;
pub mod mock;
pub mod resolve;
pub mod subscription;
pub mod throttle;
pub mod watcher;

pub use group::{watch_groups, GroupCallback, GroupWatch};
pub use mock::MockSubscriber;
pub use resolve::{FsGlobResolver, GlobResolver};
pub use subscription::{
    EventForwarder, NotifySubscriber, Subscriber, Subscription, SubscriptionStreams,
};
pub use throttle::Throttle;
pub use watcher::{watch_one, WatchHandle, WatchOptions, Watcher, DEFAULT_THROTTLE};
