use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    bucketer::{bucket_value, bucketing_seed, Murmur3Hasher, MAX_TRAFFIC_VALUE},
    decision_listener::{DecisionEvent, DecisionListener, NoopDecisionListener},
    error::DecisionError,
    group,
    ranges::{allocate, lookup},
    settings::{Campaign, CampaignType, SettingsFile, Variation},
    user_storage::{UserStorage, UserStorageData},
    variables::USER_ID_VARIABLE,
    VariableValue, Variables,
};

/// Per-call inputs besides the user id.
#[derive(Debug, Clone, Default)]
pub struct DecisionOptions {
    /// Audience targeting variables.
    pub custom_variables: Variables,
    /// Whitelisting variables.
    pub variation_targeting_variables: Variables,
}

impl DecisionOptions {
    pub fn new() -> Self {
        DecisionOptions::default()
    }

    pub fn custom_variable(mut self, key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.custom_variables.insert(key.into(), value.into());
        self
    }

    pub fn variation_targeting_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Self {
        self.variation_targeting_variables
            .insert(key.into(), value.into());
        self
    }
}

/// How the variation of a [`Decision`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Forced by whitelisting segments.
    Whitelisted,
    /// Replayed from user storage.
    Stored,
    /// Computed by traffic and variation bucketing.
    Bucketed,
}

/// Variation assigned to a user for a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub campaign_id: u64,
    pub campaign_key: String,
    pub campaign_type: CampaignType,
    pub variation_id: u64,
    pub variation_name: String,
    /// `None` for campaigns that are not feature campaigns.
    pub is_feature_enabled: Option<bool>,
    pub source: DecisionSource,
}

impl Decision {
    fn new(campaign: &Campaign, variation: &Variation, source: DecisionSource) -> Self {
        let is_feature_enabled = match campaign.campaign_type {
            CampaignType::FeatureRollout => Some(true),
            CampaignType::FeatureTest => Some(variation.is_feature_enabled),
            CampaignType::VisualAb => None,
        };
        Decision {
            campaign_id: campaign.id,
            campaign_key: campaign.key.clone(),
            campaign_type: campaign.campaign_type,
            variation_id: variation.id,
            variation_name: variation.name.clone(),
            is_feature_enabled,
            source,
        }
    }

    /// `false` if the decision was replayed from user storage. Tracking layers use this to avoid
    /// reporting the same impression twice.
    pub fn is_fresh(&self) -> bool {
        self.source != DecisionSource::Stored
    }
}

/// Outcome of [`VariationDecider::record_goal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalRecord {
    /// Goal identifier appended to the stored decision.
    Recorded,
    /// Goal identifier was already part of the stored decision.
    AlreadyTracked,
    /// No stored decision to attach the goal to (or storage unavailable).
    NotStored,
}

/// Decides which variation of a campaign a user gets.
///
/// Decisions go through, in order: whitelisting, stored decision lookup, audience segments,
/// mutually exclusive group, traffic allocation and variation allocation. Fresh and whitelisted
/// decisions are written back to user storage.
pub struct VariationDecider<'a> {
    user_storage: Option<Box<dyn UserStorage + Send + Sync + 'a>>,
    decision_listener: Box<dyn DecisionListener + Send + Sync + 'a>,
}

impl<'a> Default for VariationDecider<'a> {
    fn default() -> Self {
        VariationDecider {
            user_storage: None,
            decision_listener: Box::new(NoopDecisionListener),
        }
    }
}

impl<'a> VariationDecider<'a> {
    pub fn new(
        user_storage: Option<Box<dyn UserStorage + Send + Sync + 'a>>,
        decision_listener: Box<dyn DecisionListener + Send + Sync + 'a>,
    ) -> Self {
        VariationDecider {
            user_storage,
            decision_listener,
        }
    }

    /// Get the variation for `user_id` in campaign `campaign_key`, or `None` if the user is not
    /// part of it. Never fails; the reason of a `None` is logged.
    pub fn get_variation(
        &self,
        settings: &SettingsFile,
        campaign_key: &str,
        user_id: &str,
        options: &DecisionOptions,
    ) -> Option<Decision> {
        match self.decide(settings, campaign_key, user_id, options) {
            Ok(decision) => {
                log::trace!(target: "vwo",
                            campaign_key,
                            user_id,
                            decision:serde;
                            "decided variation");
                Some(decision)
            }

            // These are considered normal conditions and usually don't need extra attention.
            Err(err) if err.is_normal() => {
                log::trace!(target: "vwo",
                            campaign_key,
                            user_id;
                            "user not part of campaign: {err}");
                None
            }

            Err(err) => {
                log::warn!(target: "vwo",
                           campaign_key,
                           user_id;
                           "error occurred while deciding variation: {err}");
                None
            }
        }
    }

    /// Like [`get_variation`](Self::get_variation) but return the reason when the user gets no
    /// variation.
    pub fn decide(
        &self,
        settings: &SettingsFile,
        campaign_key: &str,
        user_id: &str,
        options: &DecisionOptions,
    ) -> Result<Decision, DecisionError> {
        if user_id.is_empty() {
            return Err(DecisionError::InvalidUserId);
        }
        let campaign = settings.get_campaign(campaign_key)?;
        if !campaign.is_running() {
            return Err(DecisionError::CampaignNotRunning);
        }

        if campaign.is_forced_variation_enabled {
            if let Some(variation) = find_whitelisted_variation(
                campaign,
                user_id,
                &options.variation_targeting_variables,
                settings.is_nb,
            ) {
                log::debug!(target: "vwo",
                            campaign_key,
                            user_id,
                            variation:display = variation.name;
                            "user whitelisted for variation");
                self.store(user_id, campaign, variation);
                return Ok(self.emit(
                    campaign,
                    variation,
                    user_id,
                    options,
                    DecisionSource::Whitelisted,
                ));
            }
        }

        if let Some(variation) = self.stored_variation(campaign, user_id) {
            log::debug!(target: "vwo",
                        campaign_key,
                        user_id,
                        variation:display = variation.name;
                        "found stored decision");
            return Ok(self.emit(campaign, variation, user_id, options, DecisionSource::Stored));
        }

        if campaign.is_mab && self.user_storage.is_none() {
            return Err(DecisionError::MabWithoutUserStorage);
        }

        if let Some(segments) = &campaign.segments {
            if !segments.eval(&options.custom_variables) {
                return Err(DecisionError::SegmentationFailed);
            }
        }

        if let Some((group_id, group)) = settings.get_group_for_campaign(campaign.id) {
            let has_other_member = settings
                .get_group_campaigns(group)
                .into_iter()
                .filter(|other| other.id != campaign.id)
                .any(|other| self.stored_variation(other, user_id).is_some());
            if has_other_member {
                return Err(DecisionError::ExcludedByGroupMember { group_id });
            }

            let winner = group::resolve(
                settings,
                campaign,
                user_id,
                &options.custom_variables,
                &Murmur3Hasher,
            );
            if winner.map(|winner| winner.id) != Some(campaign.id) {
                return Err(DecisionError::NotGroupWinner { group_id });
            }
        }

        if !campaign.is_user_part_of_campaign(user_id, settings.is_nb, &Murmur3Hasher) {
            return Err(DecisionError::TrafficExcluded);
        }

        let variation = campaign
            .bucket_user_to_variation(user_id, settings.is_nb, &Murmur3Hasher)
            .ok_or(DecisionError::NoVariationAllocated)?;

        self.store(user_id, campaign, variation);
        Ok(self.emit(campaign, variation, user_id, options, DecisionSource::Bucketed))
    }

    /// Remember that `goal_identifier` was tracked for the stored decision of `user_id` in
    /// `campaign_key`.
    pub fn record_goal(&self, user_id: &str, campaign_key: &str, goal_identifier: &str) -> GoalRecord {
        let Some(mut data) = self.get_stored(user_id, campaign_key) else {
            return GoalRecord::NotStored;
        };
        if !data.add_goal(goal_identifier) {
            return GoalRecord::AlreadyTracked;
        }
        self.set_stored(&data);
        GoalRecord::Recorded
    }

    fn get_stored(&self, user_id: &str, campaign_key: &str) -> Option<UserStorageData> {
        let storage = self.user_storage.as_ref()?;
        match storage.get(user_id, campaign_key) {
            Ok(data) => data,
            Err(err) => {
                log::warn!(target: "vwo",
                           campaign_key,
                           user_id;
                           "failed to look up stored decision: {err}");
                None
            }
        }
    }

    fn set_stored(&self, data: &UserStorageData) {
        let Some(storage) = &self.user_storage else {
            return;
        };
        if let Err(err) = storage.set(data) {
            log::warn!(target: "vwo",
                       campaign_key:display = data.campaign_key,
                       user_id:display = data.user_id;
                       "failed to store decision: {err}");
        }
    }

    /// Stored variation, if it still exists in the campaign.
    fn stored_variation<'s>(&self, campaign: &'s Campaign, user_id: &str) -> Option<&'s Variation> {
        let data = self.get_stored(user_id, &campaign.key)?;
        let variation = campaign.get_variation(&data.variation_name);
        if variation.is_none() {
            log::debug!(target: "vwo",
                        campaign_key:display = campaign.key,
                        user_id,
                        variation:display = data.variation_name;
                        "stored variation no longer exists in campaign");
        }
        variation
    }

    fn store(&self, user_id: &str, campaign: &Campaign, variation: &Variation) {
        self.set_stored(&UserStorageData::new(user_id, &campaign.key, &variation.name));
    }

    fn emit(
        &self,
        campaign: &Campaign,
        variation: &Variation,
        user_id: &str,
        options: &DecisionOptions,
        source: DecisionSource,
    ) -> Decision {
        let decision = Decision::new(campaign, variation, source);
        self.decision_listener.on_decision(DecisionEvent {
            campaign_id: decision.campaign_id,
            campaign_key: decision.campaign_key.clone(),
            campaign_type: decision.campaign_type,
            variation_id: decision.variation_id,
            variation_name: decision.variation_name.clone(),
            user_id: user_id.to_owned(),
            from_user_storage: source == DecisionSource::Stored,
            is_user_whitelisted: source == DecisionSource::Whitelisted,
            is_feature_enabled: decision.is_feature_enabled,
            custom_variables: options.custom_variables.clone(),
            variation_targeting_variables: options.variation_targeting_variables.clone(),
            timestamp: Utc::now().to_rfc3339(),
        });
        decision
    }
}

/// Variation forced by whitelisting segments, evaluated against the variation targeting
/// variables (with `_vwo_user_id` defaulting to `user_id`).
///
/// When several variations match, the user is bucketed among them with their weights rescaled
/// to 100.
pub fn find_whitelisted_variation<'s>(
    campaign: &'s Campaign,
    user_id: &str,
    variation_targeting_variables: &Variables,
    is_new_bucketing_enabled: bool,
) -> Option<&'s Variation> {
    // Augmenting variables with the user id, so that `user` leaves can match it.
    let variables = {
        let mut vars = variation_targeting_variables.clone();
        vars.entry(USER_ID_VARIABLE.to_owned())
            .or_insert_with(|| user_id.into());
        vars
    };

    let matched: Vec<&Variation> = campaign
        .variations
        .iter()
        .filter(|variation| {
            variation
                .segments
                .as_ref()
                .is_some_and(|segments| segments.eval(&variables))
        })
        .collect();

    match matched.as_slice() {
        [] => None,
        [variation] => Some(*variation),
        _ => {
            let allocated = allocate(matched.iter().map(|variation| (*variation, variation.weight)));
            let seed = bucketing_seed(is_new_bucketing_enabled, user_id, Some(campaign), None);
            let value = bucket_value(&Murmur3Hasher, &seed, MAX_TRAFFIC_VALUE, 1.0);
            lookup(&allocated, value).map(|allocated| allocated.item)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        fs::File,
        sync::{Arc, Mutex},
    };

    use serde::Deserialize;

    use super::{
        find_whitelisted_variation, DecisionOptions, DecisionSource, GoalRecord, VariationDecider,
    };
    use crate::{
        decision_listener::DecisionEvent,
        error::DecisionError,
        user_storage::{InMemoryUserStorage, UserStorage, UserStorageData},
        SettingsFile, StorageError, VariableValue, Variables,
    };

    fn campaigns() -> SettingsFile {
        SettingsFile::from_reader(File::open("tests/data/settings/campaigns.json").unwrap())
            .unwrap()
    }

    fn groups() -> SettingsFile {
        SettingsFile::from_reader(File::open("tests/data/settings/groups.json").unwrap()).unwrap()
    }

    fn with_storage(storage: Arc<InMemoryUserStorage>) -> VariationDecider<'static> {
        VariationDecider::new(Some(Box::new(storage)), Box::new(|_event: DecisionEvent| {}))
    }

    struct FailingStorage;
    impl UserStorage for FailingStorage {
        fn get(&self, _: &str, _: &str) -> Result<Option<UserStorageData>, StorageError> {
            Err(StorageError::new("get failed"))
        }
        fn set(&self, _: &UserStorageData) -> Result<(), StorageError> {
            Err(StorageError::new("set failed"))
        }
    }

    fn single_campaign(weights: (u32, u32), traffic: u32) -> SettingsFile {
        SettingsFile::from_json(&format!(
            r#"{{
              "campaigns": [{{
                "id": 1, "key": "sticky", "status": "RUNNING", "type": "VISUAL_AB",
                "percentTraffic": {traffic},
                "variations": [
                  {{ "id": 1, "name": "Control", "weight": {} }},
                  {{ "id": 2, "name": "Variation-1", "weight": {} }}
                ]
              }}]
            }}"#,
            weights.0, weights.1
        ))
        .unwrap()
    }

    #[test]
    fn decides_reference_users() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        let options = DecisionOptions::new();
        let name = |user| {
            decider
                .get_variation(&settings, "AB_T_50_W_40_60", user, &options)
                .map(|d| d.variation_name)
        };
        assert_eq!(name("Sarah").as_deref(), Some("Control"));
        assert_eq!(name("Varun").as_deref(), Some("Variation-1"));
        assert_eq!(name("Lucian"), None);
    }

    #[test]
    fn invalid_inputs() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        let options = DecisionOptions::new();
        assert_eq!(
            decider.decide(&settings, "AB_T_50_W_40_60", "", &options),
            Err(DecisionError::InvalidUserId)
        );
        assert_eq!(
            decider.decide(&settings, "missing", "Ashley", &options),
            Err(DecisionError::CampaignNotFound)
        );
        assert_eq!(
            decider.decide(&settings, "PAUSED", "Ashley", &options),
            Err(DecisionError::CampaignNotRunning)
        );
        assert!(decider
            .get_variation(&settings, "missing", "Ashley", &options)
            .is_none());
    }

    #[test]
    fn traffic_exclusion() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        assert_eq!(
            decider.decide(&settings, "AB_T_50_W_40_60", "Lucian", &DecisionOptions::new()),
            Err(DecisionError::TrafficExcluded)
        );
    }

    #[test]
    fn sticky_bucketing_survives_weight_changes() {
        let storage = Arc::new(InMemoryUserStorage::new());
        let decider = with_storage(storage.clone());
        let options = DecisionOptions::new();

        let before = single_campaign((100, 0), 100);
        let first = decider
            .decide(&before, "sticky", "Ashley", &options)
            .unwrap();
        assert_eq!(first.variation_name, "Control");
        assert_eq!(first.source, DecisionSource::Bucketed);
        assert!(first.is_fresh());
        assert_eq!(
            storage.get("Ashley", "sticky").unwrap().unwrap().variation_name,
            "Control"
        );

        // everyone would now land in Variation-1, and half of the traffic is gone
        let after = single_campaign((0, 100), 1);
        let second = decider.decide(&after, "sticky", "Ashley", &options).unwrap();
        assert_eq!(second.variation_name, "Control");
        assert_eq!(second.source, DecisionSource::Stored);
        assert!(!second.is_fresh());
    }

    #[test]
    fn stale_stored_variation_is_recomputed() {
        let storage = Arc::new(InMemoryUserStorage::new());
        storage
            .set(&UserStorageData::new("Ashley", "sticky", "Removed"))
            .unwrap();
        let decider = with_storage(storage.clone());
        let settings = single_campaign((0, 100), 100);
        let decision = decider
            .decide(&settings, "sticky", "Ashley", &DecisionOptions::new())
            .unwrap();
        assert_eq!(decision.variation_name, "Variation-1");
        assert_eq!(decision.source, DecisionSource::Bucketed);
        assert_eq!(
            storage.get("Ashley", "sticky").unwrap().unwrap().variation_name,
            "Variation-1"
        );
    }

    #[test]
    fn storage_failures_are_not_fatal() {
        let decider = VariationDecider::new(Some(Box::new(FailingStorage)), Box::new(|_event: DecisionEvent| {}));
        let settings = single_campaign((100, 0), 100);
        let decision = decider
            .decide(&settings, "sticky", "Ashley", &DecisionOptions::new())
            .unwrap();
        assert_eq!(decision.variation_name, "Control");
        assert_eq!(
            decider.record_goal("Ashley", "sticky", "purchase"),
            GoalRecord::NotStored
        );
    }

    #[test]
    fn segmentation_gate() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        let chrome = DecisionOptions::new().custom_variable("browser", "Chrome");
        let firefox = DecisionOptions::new().custom_variable("browser", "firefox");
        assert!(decider
            .decide(&settings, "AB_T_100_SEGMENTED", "Ashley", &chrome)
            .is_ok());
        assert_eq!(
            decider.decide(&settings, "AB_T_100_SEGMENTED", "Ashley", &firefox),
            Err(DecisionError::SegmentationFailed)
        );
        assert_eq!(
            decider.decide(&settings, "AB_T_100_SEGMENTED", "Ashley", &DecisionOptions::new()),
            Err(DecisionError::SegmentationFailed)
        );
    }

    #[test]
    fn whitelisting_forces_variation() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        // campaign traffic is 10%, Ashley would not be part of it
        assert_eq!(
            decider.decide(&settings, "AB_T_10_WHITELISTING", "Ashley", &DecisionOptions::new()),
            Err(DecisionError::TrafficExcluded)
        );

        let decision = decider
            .decide(
                &settings,
                "AB_T_10_WHITELISTING",
                "Bill",
                &DecisionOptions::new(),
            )
            .unwrap();
        assert_eq!(decision.variation_name, "Variation-2");
        assert_eq!(decision.source, DecisionSource::Whitelisted);

        let decision = decider
            .decide(
                &settings,
                "AB_T_10_WHITELISTING",
                "Ashley",
                &DecisionOptions::new().variation_targeting_variable("chrome", "false"),
            )
            .unwrap();
        assert_eq!(decision.variation_name, "Variation-1");
    }

    #[test]
    fn whitelisting_ignores_audience_segments() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        let decision = decider
            .decide(
                &settings,
                "AB_T_10_WHITELISTING",
                "Bill",
                &DecisionOptions::new().custom_variable("browser", "firefox"),
            )
            .unwrap();
        assert_eq!(decision.source, DecisionSource::Whitelisted);
    }

    #[test]
    fn whitelisting_explicit_user_id_wins_over_user_id() {
        let settings = campaigns();
        let campaign = settings.get_campaign("AB_T_10_WHITELISTING").unwrap();
        let vars = Variables::from([("_vwo_user_id".to_owned(), VariableValue::from("Bill"))]);
        let variation = find_whitelisted_variation(campaign, "Ashley", &vars, false);
        assert_eq!(variation.map(|v| v.name.as_str()), Some("Variation-2"));
    }

    #[test]
    fn whitelisting_disabled() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        assert!(decider
            .decide(
                &settings,
                "AB_T_10_WHITELISTING_DISABLED",
                "Bill",
                &DecisionOptions::new(),
            )
            .map_or(true, |decision| decision.source != DecisionSource::Whitelisted));
    }

    #[test]
    fn whitelisting_among_several_variations() {
        let settings = campaigns();
        let campaign = settings.get_campaign("AB_T_10_WHITELISTING").unwrap();
        let vars = Variables::from([("browser".to_owned(), VariableValue::from("chrome"))]);
        let f = File::open("tests/data/whitelisting.json").unwrap();
        let expected: HashMap<String, String> = serde_json::from_reader(f).unwrap();
        for (user, variation) in expected {
            assert_eq!(
                find_whitelisted_variation(campaign, &user, &vars, false).map(|v| v.name.as_str()),
                Some(variation.as_str()),
                "user {user}"
            );
        }
    }

    #[test]
    fn settings_level_new_bucketing_salts_every_seed() {
        let settings = SettingsFile::from_reader(
            File::open("tests/data/settings/new_bucketing.json").unwrap(),
        )
        .unwrap();
        assert!(settings.is_nb);
        let decider = VariationDecider::default();
        let options = DecisionOptions::new();

        // same campaign shape as in campaigns.json, but hashed with "{campaign_id}_{user_id}"
        assert_eq!(
            decider
                .decide(&campaigns(), "AB_T_50_W_40_60", "Ashley", &options)
                .map(|d| d.variation_name),
            Ok("Variation-1".to_owned())
        );
        assert_eq!(
            decider.decide(&settings, "AB_T_50_W_40_60", "Ashley", &options),
            Err(DecisionError::TrafficExcluded)
        );
        assert_eq!(
            decider
                .decide(&settings, "AB_T_50_W_40_60", "Chris", &options)
                .map(|d| d.variation_name),
            Ok("Control".to_owned())
        );

        let chrome = DecisionOptions::new().variation_targeting_variable("browser", "chrome");
        let f = File::open("tests/data/whitelisting_new_bucketing.json").unwrap();
        let expected: HashMap<String, String> = serde_json::from_reader(f).unwrap();
        for (user, variation) in expected {
            let decision = decider
                .decide(&settings, "AB_T_10_WHITELISTING", &user, &chrome)
                .unwrap();
            assert_eq!(decision.source, DecisionSource::Whitelisted);
            assert_eq!(decision.variation_name, variation, "user {user}");
        }
    }

    #[test]
    fn whitelisted_decision_is_stored() {
        let storage = Arc::new(InMemoryUserStorage::new());
        let decider = with_storage(storage.clone());
        let settings = campaigns();
        decider
            .decide(&settings, "AB_T_10_WHITELISTING", "Bill", &DecisionOptions::new())
            .unwrap();
        assert_eq!(
            storage
                .get("Bill", "AB_T_10_WHITELISTING")
                .unwrap()
                .unwrap()
                .variation_name,
            "Variation-2"
        );
    }

    #[test]
    fn feature_flags() {
        let settings = campaigns();
        let decider = VariationDecider::default();
        let options = DecisionOptions::new();
        let rollout = decider
            .decide(&settings, "FR_T_100", "Ashley", &options)
            .unwrap();
        assert_eq!(rollout.is_feature_enabled, Some(true));

        let test = decider
            .decide(&settings, "FT_T_100_W_50_50", "Ashley", &options)
            .unwrap();
        let expected = test.variation_name == "Variation-1";
        assert_eq!(test.is_feature_enabled, Some(expected));

        let ab = decider
            .decide(&settings, "AB_T_100_W_10_20_30_40", "Ashley", &options)
            .unwrap();
        assert_eq!(ab.is_feature_enabled, None);
    }

    #[test]
    fn mab_requires_user_storage() {
        let settings = campaigns();
        assert_eq!(
            VariationDecider::default().decide(&settings, "MAB", "Ashley", &DecisionOptions::new()),
            Err(DecisionError::MabWithoutUserStorage)
        );
        let decider = with_storage(Arc::new(InMemoryUserStorage::new()));
        assert!(decider
            .decide(&settings, "MAB", "Ashley", &DecisionOptions::new())
            .is_ok());
    }

    #[test]
    fn listener_receives_decisions() {
        let events: Arc<Mutex<Vec<DecisionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let storage = Arc::new(InMemoryUserStorage::new());
        let decider = {
            let events = events.clone();
            VariationDecider::new(
                Some(Box::new(storage)),
                Box::new(move |event: DecisionEvent| events.lock().unwrap().push(event)),
            )
        };
        let settings = single_campaign((100, 0), 100);
        let options = DecisionOptions::new().custom_variable("plan", "pro");
        decider.decide(&settings, "sticky", "Ashley", &options).unwrap();
        decider.decide(&settings, "sticky", "Ashley", &options).unwrap();
        decider.decide(&single_campaign((100, 0), 0), "sticky", "Bill", &options).unwrap_err();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(!events[0].from_user_storage);
        assert!(events[1].from_user_storage);
        assert_eq!(events[0].variation_name, "Control");
        assert_eq!(events[0].user_id, "Ashley");
        assert_eq!(events[0].custom_variables.get("plan"), Some(&VariableValue::from("pro")));
        assert!(!events[0].is_user_whitelisted);
    }

    #[test]
    fn record_goal_appends_identifiers() {
        let storage = Arc::new(InMemoryUserStorage::new());
        let decider = with_storage(storage.clone());
        let settings = single_campaign((100, 0), 100);

        assert_eq!(
            decider.record_goal("Ashley", "sticky", "purchase"),
            GoalRecord::NotStored
        );
        decider
            .decide(&settings, "sticky", "Ashley", &DecisionOptions::new())
            .unwrap();
        assert_eq!(
            decider.record_goal("Ashley", "sticky", "purchase"),
            GoalRecord::Recorded
        );
        assert_eq!(
            decider.record_goal("Ashley", "sticky", "signup"),
            GoalRecord::Recorded
        );
        assert_eq!(
            decider.record_goal("Ashley", "sticky", "purchase"),
            GoalRecord::AlreadyTracked
        );
        assert_eq!(
            storage
                .get("Ashley", "sticky")
                .unwrap()
                .unwrap()
                .goal_identifiers
                .as_deref(),
            Some("purchase,signup")
        );
        assert_eq!(
            VariationDecider::default().record_goal("Ashley", "sticky", "purchase"),
            GoalRecord::NotStored
        );
    }

    #[test]
    fn mutual_exclusivity_by_priority() {
        let settings = groups();
        let decider = VariationDecider::default();
        let options = DecisionOptions::new();
        // both campaigns take 100% of traffic, PRIORITY_B comes first in the priority list
        for user in ["Ashley", "Bill", "Chris", "Dominic", "Emma", "Faizan"] {
            assert!(decider
                .decide(&settings, "PRIORITY_B", user, &options)
                .is_ok());
            assert_eq!(
                decider.decide(&settings, "PRIORITY_A", user, &options),
                Err(DecisionError::NotGroupWinner { group_id: 101 })
            );
        }
    }

    #[test]
    fn user_segmented_out_of_priority_campaign_falls_to_next() {
        let settings = groups();
        let decider = VariationDecider::default();
        let gold = DecisionOptions::new().custom_variable("tier", "gold");
        assert_eq!(
            decider.decide(&settings, "PRIORITY_B", "Ashley", &gold),
            Err(DecisionError::SegmentationFailed)
        );
        assert!(decider
            .decide(&settings, "PRIORITY_A", "Ashley", &gold)
            .is_ok());
    }

    #[test]
    fn stored_group_member_excludes_other_campaigns() {
        let storage = Arc::new(InMemoryUserStorage::new());
        storage
            .set(&UserStorageData::new("Ashley", "PRIORITY_A", "Control"))
            .unwrap();
        let decider = with_storage(storage);
        let settings = groups();
        assert_eq!(
            decider.decide(&settings, "PRIORITY_B", "Ashley", &DecisionOptions::new()),
            Err(DecisionError::ExcludedByGroupMember { group_id: 101 })
        );
        let sticky = decider
            .decide(&settings, "PRIORITY_A", "Ashley", &DecisionOptions::new())
            .unwrap();
        assert_eq!(sticky.source, DecisionSource::Stored);
    }

    #[test]
    fn group_topology_is_read_per_decision() {
        let grouped = groups();
        let ungrouped = SettingsFile::from_json(
            &serde_json::to_string(&{
                let mut raw: serde_json::Value = serde_json::from_reader(
                    File::open("tests/data/settings/groups.json").unwrap(),
                )
                .unwrap();
                raw["groups"] = serde_json::json!({});
                raw["campaignGroups"] = serde_json::json!({});
                raw
            })
            .unwrap(),
        )
        .unwrap();

        let decider = VariationDecider::default();
        let options = DecisionOptions::new();
        assert!(decider
            .decide(&ungrouped, "PRIORITY_A", "Ashley", &options)
            .is_ok());
        assert_eq!(
            decider.decide(&grouped, "PRIORITY_A", "Ashley", &options),
            Err(DecisionError::NotGroupWinner { group_id: 101 })
        );
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct DecisionTestCase {
        settings: String,
        campaign: String,
        #[serde(default)]
        custom_variables: Variables,
        users: HashMap<String, Option<String>>,
    }

    #[test]
    fn decision_sdk_test_data() {
        let decider = VariationDecider::default();
        let f = File::open("tests/data/decisions.json").unwrap();
        let cases: Vec<DecisionTestCase> = serde_json::from_reader(f).unwrap();

        for case in cases {
            let settings = SettingsFile::from_reader(
                File::open(format!("tests/data/settings/{}", case.settings)).unwrap(),
            )
            .unwrap();
            let options = DecisionOptions {
                custom_variables: case.custom_variables.clone(),
                ..DecisionOptions::default()
            };
            for (user, expected) in case.users {
                let decision = decider.get_variation(&settings, &case.campaign, &user, &options);
                assert_eq!(
                    decision.map(|d| d.variation_name),
                    expected,
                    "campaign {} user {}",
                    case.campaign,
                    user
                );
            }
        }
    }
}
