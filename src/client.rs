use std::sync::Arc;

use crate::{
    settings::CampaignType, settings_store::SettingsStore, ClientConfig, Decision,
    DecisionError, DecisionOptions, GoalRecord, SettingsFile, VariationDecider,
};

/// Entry point for deciding variations against the current settings file.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// # Examples
/// ```
/// # use vwo_core::{Client, ClientConfig};
/// Client::new(ClientConfig::new());
/// ```
pub struct Client<'a> {
    settings_store: Arc<SettingsStore>,
    decider: VariationDecider<'a>,
}

impl<'a> Client<'a> {
    /// Create a new `Client` using the specified configuration.
    pub fn new(config: ClientConfig<'a>) -> Self {
        let settings_store = Arc::new(SettingsStore::new());
        if let Some(settings_file) = config.settings_file {
            settings_store.set_settings_file(settings_file);
        }
        Client {
            settings_store,
            decider: VariationDecider::new(config.user_storage, config.decision_listener),
        }
    }

    /// Store shared with the client. Hosts refreshing settings from another thread hold on to
    /// it.
    pub fn settings_store(&self) -> Arc<SettingsStore> {
        self.settings_store.clone()
    }

    /// Replace the settings file. Decisions in flight finish with the previous one.
    pub fn set_settings_file(&self, settings_file: SettingsFile) {
        self.settings_store.set_settings_file(settings_file);
    }

    /// Get the variation of campaign `campaign_key` for `user_id`.
    ///
    /// Returns `None` if the user is not part of the campaign, or no settings file was set yet.
    pub fn get_variation(
        &self,
        campaign_key: &str,
        user_id: &str,
        options: &DecisionOptions,
    ) -> Option<Decision> {
        let Some(settings) = self.settings_store.get_settings_file() else {
            log::warn!(target: "vwo",
                       campaign_key,
                       user_id;
                       "deciding variation before a settings file has been set: {}",
                       DecisionError::SettingsMissing);
            return None;
        };
        self.decider
            .get_variation(&settings, campaign_key, user_id, options)
    }

    /// Return `true` if the feature of campaign `campaign_key` is enabled for `user_id`.
    ///
    /// Feature rollouts are enabled for every user part of them; feature tests follow the
    /// decided variation. Always `false` for visual A/B campaigns.
    pub fn is_feature_enabled(
        &self,
        campaign_key: &str,
        user_id: &str,
        options: &DecisionOptions,
    ) -> bool {
        let Some(decision) = self.get_variation(campaign_key, user_id, options) else {
            return false;
        };
        if decision.campaign_type == CampaignType::VisualAb {
            log::warn!(target: "vwo",
                       campaign_key,
                       user_id;
                       "is_feature_enabled is not supported for VISUAL_AB campaigns");
            return false;
        }
        decision.is_feature_enabled.unwrap_or(false)
    }

    /// Remember that `goal_identifier` was tracked for the stored decision of `user_id`.
    ///
    /// Requires user storage; see [`GoalRecord`].
    pub fn record_goal(&self, campaign_key: &str, user_id: &str, goal_identifier: &str) -> GoalRecord {
        self.decider
            .record_goal(user_id, campaign_key, goal_identifier)
    }
}
