//! Server-side decision engine for A/B tests, feature rollouts and feature tests.
//!
//! # Overview
//!
//! Given a [`SettingsFile`] (campaigns, variations, audiences and mutually exclusive groups), the
//! engine deterministically decides which variation of a campaign a user gets. Decisions are
//! derived from a murmur3 hash of the user id, so the same user lands in the same variation across
//! processes and SDK languages without any coordination.
//!
//! The [`Client`] is the usual entry point: it holds the current settings file in a
//! [`SettingsStore`] and delegates to a [`VariationDecider`]. Hosts can plug in a [`UserStorage`]
//! to make decisions sticky, and a [`DecisionListener`] to forward decisions to their analytics.
//!
//! # Error Handling
//!
//! Loading a settings file returns [`Error`]. Deciding never fails from the caller's point of view:
//! [`Client::get_variation`] returns `None` when the user gets no variation, and the reason (a
//! [`DecisionError`]) is logged. [`VariationDecider::decide`] returns the reason for callers who
//! need it.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages, with
//! the `vwo` target. Consider integrating a `log`-compatible logger implementation for better
//! visibility into decisions.
//!
//! # Examples
//!
//! ```
//! # use vwo_core::{ClientConfig, DecisionOptions, SettingsFile};
//! let settings = SettingsFile::from_json(r#"{
//!   "campaigns": [{
//!     "id": 1, "key": "checkout", "status": "RUNNING", "type": "VISUAL_AB", "percentTraffic": 100,
//!     "variations": [{ "id": 1, "name": "Control", "weight": 100 }]
//!   }]
//! }"#)?;
//! let mut config = ClientConfig::new();
//! config.settings_file(settings);
//! let client = config.to_client();
//!
//! let decision = client.get_variation("checkout", "Ashley", &DecisionOptions::new());
//! assert_eq!(decision.map(|d| d.variation_name).as_deref(), Some("Control"));
//! # Ok::<(), vwo_core::Error>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod bucketer;
mod client;
mod config;
mod decider;
mod decision_listener;
mod error;
pub mod group;
pub mod operand;
pub mod ranges;
pub mod segments;
pub mod settings;
mod settings_store;
mod traffic;
mod user_storage;
mod variables;

pub use client::Client;
pub use config::ClientConfig;
pub use decider::{
    find_whitelisted_variation, Decision, DecisionOptions, DecisionSource, GoalRecord,
    VariationDecider,
};
pub use decision_listener::{DecisionEvent, DecisionListener};
pub use error::{DecisionError, Error, Result, StorageError};
pub use settings::{Campaign, CampaignStatus, CampaignType, Group, SettingsFile, Variation};
pub use settings_store::SettingsStore;
pub use user_storage::{InMemoryUserStorage, UserStorage, UserStorageData};
pub use variables::{VariableValue, Variables, USER_ID_VARIABLE};
