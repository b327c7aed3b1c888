//! Mutually exclusive groups.
//!
//! Campaigns of a group share the user population: a user is allowed into at most one of them.
//! The winner is chosen among the campaigns the user is eligible for, first by the group priority
//! list, then by the group weights, and otherwise by an equal-weight lottery. Lotteries hash the
//! group-salted seed (`{group_id}_{user_id}`) so they are independent from campaign bucketing.
use crate::{
    bucketer::{bucket_value, bucketing_seed, BucketHasher, MAX_TRAFFIC_VALUE},
    ranges::{allocate, lookup},
    settings::{Campaign, Group, SettingsFile},
    Variables,
};

/// Return `true` if the user passes the campaign audience and traffic allocation.
pub fn is_campaign_eligible(
    campaign: &Campaign,
    user_id: &str,
    custom_variables: &Variables,
    is_new_bucketing_enabled: bool,
    hasher: &impl BucketHasher,
) -> bool {
    let passes_segments = campaign
        .segments
        .as_ref()
        .map_or(true, |segments| segments.eval(custom_variables));
    passes_segments && campaign.is_user_part_of_campaign(user_id, is_new_bucketing_enabled, hasher)
}

/// Running campaigns of `group` the user is eligible for, in group order.
pub fn eligible_campaigns<'s>(
    settings: &'s SettingsFile,
    group: &Group,
    user_id: &str,
    custom_variables: &Variables,
    hasher: &impl BucketHasher,
) -> Vec<&'s Campaign> {
    settings
        .get_group_campaigns(group)
        .into_iter()
        .filter(|campaign| {
            is_campaign_eligible(campaign, user_id, custom_variables, settings.is_nb, hasher)
        })
        .collect()
}

/// Choose the single campaign the user may participate in among `eligible`.
pub fn select_campaign<'s>(
    group_id: u64,
    group: &Group,
    eligible: &[&'s Campaign],
    user_id: &str,
    hasher: &impl BucketHasher,
) -> Option<&'s Campaign> {
    if eligible.is_empty() {
        return None;
    }

    // first eligible campaign of the priority list wins
    if let Some(campaign) = group
        .p
        .iter()
        .find_map(|id| eligible.iter().find(|campaign| campaign.id == *id).copied())
    {
        return Some(campaign);
    }

    let weighted: Vec<(&'s Campaign, f64)> = eligible
        .iter()
        .filter_map(|campaign| {
            let weight = group.wt.get(&campaign.id.to_string())?;
            Some((*campaign, *weight))
        })
        .collect();
    let candidates = if weighted.is_empty() {
        eligible.iter().map(|campaign| (*campaign, 0.0)).collect()
    } else {
        weighted
    };

    let allocated = allocate(candidates);
    let seed = bucketing_seed(false, user_id, None, Some(group_id));
    let value = bucket_value(hasher, &seed, MAX_TRAFFIC_VALUE, 1.0);
    lookup(&allocated, value).map(|allocated| allocated.item)
}

/// Decide which campaign of `campaign`'s group the user may be bucketed into.
///
/// Ungrouped campaigns resolve to themselves. `None` means the user is not eligible for any
/// campaign of the group.
pub fn resolve<'s>(
    settings: &'s SettingsFile,
    campaign: &'s Campaign,
    user_id: &str,
    custom_variables: &Variables,
    hasher: &impl BucketHasher,
) -> Option<&'s Campaign> {
    let Some((group_id, group)) = settings.get_group_for_campaign(campaign.id) else {
        return Some(campaign);
    };

    let eligible = eligible_campaigns(settings, group, user_id, custom_variables, hasher);
    let winner = select_campaign(group_id, group, &eligible, user_id, hasher);

    log::trace!(target: "vwo",
                group_id,
                campaign_key:display = campaign.key,
                user_id,
                eligible:serde = eligible.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
                winner:display = winner.map_or("", |c| c.key.as_str());
                "resolved group winner");
    winner
}
