use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Settings file is not valid JSON or does not have the expected shape.
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    #[error("error parsing settings file")]
    SettingsParse(#[source] Arc<serde_json::Error>),

    /// An I/O error while reading a settings file.
    #[error(transparent)]
    Io(Arc<std::io::Error>),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::SettingsParse(Arc::new(value))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

/// Reason a decision ended without a variation.
///
/// None of these are ever surfaced as a failure of the host application. The public entry points
/// turn them into `None` and log them; [`DecisionError::is_normal`] tells which ones deserve a
/// warning.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DecisionError {
    /// No settings file has been provided yet.
    #[error("settings file missing")]
    SettingsMissing,

    /// User id is empty.
    #[error("invalid user id")]
    InvalidUserId,

    /// Requested campaign does not exist in the settings file.
    #[error("campaign not found")]
    CampaignNotFound,

    /// Requested campaign exists but could not be parsed.
    #[error("error parsing campaign, settings file may be newer than this library")]
    CampaignParseError,

    /// Campaign status is not `RUNNING`.
    #[error("campaign is not running")]
    CampaignNotRunning,

    /// Multi-armed-bandit campaigns need a user storage to keep assignments sticky.
    #[error("MAB campaign requires user storage")]
    MabWithoutUserStorage,

    /// Audience segments did not match the supplied custom variables.
    #[error("user did not pass audience segmentation")]
    SegmentationFailed,

    /// User already holds a stored decision for another campaign of the same group.
    #[error("user already part of another campaign in group {group_id}")]
    ExcludedByGroupMember {
        /// Group of the requested campaign.
        group_id: u64,
    },

    /// Another campaign of the same group was selected for the user.
    #[error("user not selected for this campaign in group {group_id}")]
    NotGroupWinner {
        /// Group of the requested campaign.
        group_id: u64,
    },

    /// User's bucket value is outside of the campaign traffic.
    #[error("user not part of campaign traffic")]
    TrafficExcluded,

    /// Bucket value did not fall into any variation range.
    #[error("no variation allocated for bucket value")]
    NoVariationAllocated,
}

impl DecisionError {
    /// Return `true` if the error is an expected outcome of targeting and bucketing, as opposed to
    /// a misconfiguration that needs developer attention.
    pub fn is_normal(self) -> bool {
        match self {
            DecisionError::SettingsMissing
            | DecisionError::CampaignNotRunning
            | DecisionError::SegmentationFailed
            | DecisionError::ExcludedByGroupMember { .. }
            | DecisionError::NotGroupWinner { .. }
            | DecisionError::TrafficExcluded
            | DecisionError::NoVariationAllocated => true,

            DecisionError::InvalidUserId
            | DecisionError::CampaignNotFound
            | DecisionError::CampaignParseError
            | DecisionError::MabWithoutUserStorage => false,
        }
    }
}

/// Error returned by a [`UserStorage`](crate::UserStorage) implementation.
#[derive(Error, Debug)]
#[error("user storage error: {0}")]
pub struct StorageError(Box<dyn std::error::Error + Send + Sync>);

impl StorageError {
    /// Wrap any error (or message) coming from the host storage.
    ///
    /// ```
    /// # use vwo_core::StorageError;
    /// let err = StorageError::new("connection refused");
    /// assert_eq!(err.to_string(), "user storage error: connection refused");
    /// ```
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StorageError(source.into())
    }
}
