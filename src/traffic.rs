//! Traffic allocation: campaign membership and variation selection.
use crate::{
    bucketer::{bucket_value, bucketing_seed, BucketHasher, MAX_TRAFFIC_PERCENT, MAX_TRAFFIC_VALUE},
    ranges::lookup,
    settings::{Campaign, Variation},
};

impl Campaign {
    /// Return `true` if the user's bucket value (`1..=100`) is within `percentTraffic`.
    pub fn is_user_part_of_campaign(
        &self,
        user_id: &str,
        is_new_bucketing_enabled: bool,
        hasher: &impl BucketHasher,
    ) -> bool {
        if user_id.is_empty() {
            return false;
        }
        let seed = bucketing_seed(is_new_bucketing_enabled, user_id, Some(self), None);
        let value = bucket_value(hasher, &seed, MAX_TRAFFIC_PERCENT, 1.0);
        let is_part = value != 0 && f64::from(value) <= self.percent_traffic;

        log::trace!(target: "vwo",
                    campaign_key:display = self.key,
                    user_id,
                    bucket_value = value,
                    is_part;
                    "traffic allocation");
        is_part
    }

    /// Pick a variation for a user already included in the campaign traffic.
    ///
    /// The bucket value (`1..=10000`) is stretched by `(10000 / percentTraffic) / 100` so that the
    /// included part of the traffic spreads over the whole variation range.
    pub fn bucket_user_to_variation(
        &self,
        user_id: &str,
        is_new_bucketing_enabled: bool,
        hasher: &impl BucketHasher,
    ) -> Option<&Variation> {
        if user_id.is_empty() || self.percent_traffic <= 0.0 {
            return None;
        }
        let seed = bucketing_seed(is_new_bucketing_enabled, user_id, Some(self), None);
        let multiplier = (f64::from(MAX_TRAFFIC_VALUE) / self.percent_traffic) / 100.0;
        let value = bucket_value(hasher, &seed, MAX_TRAFFIC_VALUE, multiplier);
        let variation = lookup(&self.variations, value);

        log::trace!(target: "vwo",
                    campaign_key:display = self.key,
                    user_id,
                    bucket_value = value,
                    variation:display = variation.map_or("", |v| v.name.as_str());
                    "variation allocation");
        variation
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs::File};

    use serde::Deserialize;

    use crate::{bucketer::Murmur3Hasher, SettingsFile};

    fn settings() -> SettingsFile {
        SettingsFile::from_reader(File::open("tests/data/settings/campaigns.json").unwrap())
            .unwrap()
    }

    #[test]
    fn traffic_membership() {
        let settings = settings();
        let campaign = settings.get_campaign("AB_T_50_W_40_60").unwrap();
        assert!(campaign.is_user_part_of_campaign("Bob", false, &Murmur3Hasher));
        assert!(!campaign.is_user_part_of_campaign("Lucian", false, &Murmur3Hasher));
        assert!(!campaign.is_user_part_of_campaign("", false, &Murmur3Hasher));
    }

    #[test]
    fn variation_bucketing() {
        let settings = settings();
        let campaign = settings.get_campaign("AB_T_50_W_40_60").unwrap();
        let name = |user| {
            campaign
                .bucket_user_to_variation(user, false, &Murmur3Hasher)
                .map(|variation| variation.name.as_str())
        };
        assert_eq!(name("Sarah"), Some("Control"));
        assert_eq!(name("Varun"), Some("Variation-1"));
        // outside of traffic: bucket value overflows the variation ranges
        assert_eq!(name("Lucian"), None);
    }

    #[test]
    fn zero_traffic() {
        let settings = settings();
        let campaign = settings.get_campaign("AB_T_0_W_50_50").unwrap();
        assert!(!campaign.is_user_part_of_campaign("Bob", false, &Murmur3Hasher));
        assert!(campaign
            .bucket_user_to_variation("Bob", false, &Murmur3Hasher)
            .is_none());
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BucketingTestFile {
        campaign: String,
        #[serde(default)]
        is_new_bucketing: bool,
        users: HashMap<String, Option<String>>,
    }

    #[test]
    fn bucketing_sdk_test_data() {
        let settings = settings();
        let f = File::open("tests/data/bucketing.json").unwrap();
        let test_files: Vec<BucketingTestFile> = serde_json::from_reader(f).unwrap();

        for test_file in test_files {
            let campaign = settings.get_campaign(&test_file.campaign).unwrap();
            for (user, expected) in test_file.users {
                let variation = if campaign.is_user_part_of_campaign(
                    &user,
                    test_file.is_new_bucketing,
                    &Murmur3Hasher,
                ) {
                    campaign.bucket_user_to_variation(
                        &user,
                        test_file.is_new_bucketing,
                        &Murmur3Hasher,
                    )
                } else {
                    None
                };
                assert_eq!(
                    variation.map(|v| v.name.as_str()),
                    expected.as_deref(),
                    "campaign {} user {}",
                    test_file.campaign,
                    user
                );
            }
        }
    }
}
