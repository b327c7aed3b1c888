use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::DecisionError,
    ranges::{compute_ranges, AllocationRange, Weighted},
    segments::{non_empty_segments, SegmentNode},
    Result,
};

/// Settings file: the immutable snapshot of campaigns and groups decisions are made against.
///
/// A settings file is never mutated once built. To refresh, build a new one and swap it in
/// [`SettingsStore`](crate::SettingsStore).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub account_id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sdk_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) campaigns: Vec<TryParse<Campaign>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) groups: HashMap<String, Group>,
    /// Campaign id (as string) to group id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) campaign_groups: HashMap<String, u64>,
    /// New bucketing: salt every campaign hash with the campaign id.
    #[serde(default, deserialize_with = "null_as_default", rename = "isNB")]
    pub is_nb: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_event_arch_enabled: bool,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TryParse<T> {
    Parsed(T),
    ParseFailed(serde_json::Value),
}

impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

impl SettingsFile {
    /// Parse a settings file from its JSON representation.
    ///
    /// ```
    /// # use vwo_core::SettingsFile;
    /// let settings = SettingsFile::from_json(r#"{"accountId": 1, "campaigns": []}"#).unwrap();
    /// assert_eq!(settings.account_id, 1);
    /// ```
    pub fn from_json(json: &str) -> Result<SettingsFile> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a settings file from any reader.
    pub fn from_reader(reader: impl std::io::Read) -> Result<SettingsFile> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Campaigns that parsed successfully, in settings-file order.
    pub fn campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter().filter_map(Option::from)
    }

    /// Find a campaign by key.
    pub fn get_campaign(&self, campaign_key: &str) -> std::result::Result<&Campaign, DecisionError> {
        for campaign in &self.campaigns {
            match campaign {
                TryParse::Parsed(campaign) if campaign.key == campaign_key => return Ok(campaign),
                TryParse::ParseFailed(raw)
                    if raw.get("key").and_then(|key| key.as_str()) == Some(campaign_key) =>
                {
                    return Err(DecisionError::CampaignParseError)
                }
                _ => {}
            }
        }
        Err(DecisionError::CampaignNotFound)
    }

    pub fn get_campaign_by_id(&self, campaign_id: u64) -> Option<&Campaign> {
        self.campaigns().find(|campaign| campaign.id == campaign_id)
    }

    /// Group the campaign belongs to, if any.
    pub fn get_group_for_campaign(&self, campaign_id: u64) -> Option<(u64, &Group)> {
        let group_id = *self.campaign_groups.get(&campaign_id.to_string())?;
        let group = self.groups.get(&group_id.to_string())?;
        Some((group_id, group))
    }

    /// Running campaigns of a group, in group order.
    pub fn get_group_campaigns(&self, group: &Group) -> Vec<&Campaign> {
        group
            .campaigns
            .iter()
            .filter_map(|id| self.get_campaign_by_id(*id))
            .filter(|campaign| campaign.is_running())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    VisualAb,
    FeatureTest,
    FeatureRollout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Running,
    Paused,
    #[serde(other)]
    Inactive,
}

/// A single experiment or feature-flag unit.
///
/// Variation allocation ranges are computed when the campaign is deserialized.
#[derive(Debug, Deserialize)]
#[serde(from = "CampaignWire")]
pub struct Campaign {
    pub id: u64,
    pub key: String,
    pub name: Option<String>,
    pub status: CampaignStatus,
    pub campaign_type: CampaignType,
    pub percent_traffic: f64,
    pub variations: Vec<Variation>,
    pub goals: Vec<Goal>,
    pub variables: Vec<Variable>,
    pub segments: Option<SegmentNode>,
    pub is_bucketing_seed_enabled: bool,
    pub is_forced_variation_enabled: bool,
    pub is_mab: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampaignWire {
    id: u64,
    key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: Option<String>,
    status: CampaignStatus,
    #[serde(rename = "type")]
    campaign_type: CampaignType,
    percent_traffic: f64,
    variations: Vec<Variation>,
    #[serde(default, deserialize_with = "null_as_default")]
    goals: Vec<Goal>,
    #[serde(default, deserialize_with = "null_as_default")]
    variables: Vec<Variable>,
    #[serde(default, deserialize_with = "non_empty_segments")]
    segments: Option<SegmentNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    is_bucketing_seed_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    is_forced_variation_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default", rename = "isMAB")]
    is_mab: bool,
}

impl From<CampaignWire> for Campaign {
    fn from(wire: CampaignWire) -> Campaign {
        let mut variations = wire.variations;
        let ranges = compute_ranges(variations.iter().map(|variation| variation.weight));
        for (variation, range) in variations.iter_mut().zip(ranges) {
            variation.allocation_range = range;
        }

        Campaign {
            id: wire.id,
            key: wire.key,
            name: wire.name,
            status: wire.status,
            campaign_type: wire.campaign_type,
            percent_traffic: wire.percent_traffic,
            variations,
            goals: wire.goals,
            variables: wire.variables,
            segments: wire.segments,
            is_bucketing_seed_enabled: wire.is_bucketing_seed_enabled,
            is_forced_variation_enabled: wire.is_forced_variation_enabled,
            is_mab: wire.is_mab,
        }
    }
}

impl Campaign {
    pub fn is_running(&self) -> bool {
        self.status == CampaignStatus::Running
    }

    pub fn get_variation(&self, variation_name: &str) -> Option<&Variation> {
        self.variations
            .iter()
            .find(|variation| variation.name == variation_name)
    }
}

/// One arm of a campaign.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weight: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Vec<Variable>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_feature_enabled: bool,
    /// Whitelisting segments.
    #[serde(default, deserialize_with = "non_empty_segments")]
    pub segments: Option<SegmentNode>,
    #[serde(skip)]
    pub allocation_range: AllocationRange,
}

impl Weighted for Variation {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn allocation_range(&self) -> AllocationRange {
        self.allocation_range
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: u64,
    pub identifier: String,
    #[serde(rename = "type", default)]
    pub goal_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    pub key: String,
    #[serde(rename = "type", default)]
    pub variable_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: serde_json::Value,
}

/// Mutually exclusive group of campaigns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub campaigns: Vec<u64>,
    /// Selection type as authored in the dashboard.
    #[serde(default, deserialize_with = "null_as_default")]
    pub et: Option<u8>,
    /// Campaign ids in priority order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub p: Vec<u64>,
    /// Campaign id (as string) to weight.
    #[serde(default, deserialize_with = "null_as_default")]
    pub wt: HashMap<String, f64>,
}
