use serde::{Deserialize, Serialize};

use crate::{settings::CampaignType, Variables};

/// Emitted for every decision that resolved to a variation, whether fresh, whitelisted or
/// replayed from user storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEvent {
    pub campaign_id: u64,
    pub campaign_key: String,
    pub campaign_type: CampaignType,
    pub variation_id: u64,
    pub variation_name: String,
    pub user_id: String,
    pub from_user_storage: bool,
    pub is_user_whitelisted: bool,
    /// Only set for feature campaigns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_feature_enabled: Option<bool>,
    pub custom_variables: Variables,
    pub variation_targeting_variables: Variables,
    pub timestamp: String,
}

/// Receives decisions, e.g. to forward them to an analytics integration.
pub trait DecisionListener {
    fn on_decision(&self, event: DecisionEvent);
}

pub(crate) struct NoopDecisionListener;
impl DecisionListener for NoopDecisionListener {
    fn on_decision(&self, _event: DecisionEvent) {}
}

impl<T: Fn(DecisionEvent)> DecisionListener for T {
    fn on_decision(&self, event: DecisionEvent) {
        self(event);
    }
}
