use std::fs::File;

use vwo_core::{ClientConfig, DecisionEvent, DecisionOptions, InMemoryUserStorage, SettingsFile};

pub fn main() -> vwo_core::Result<()> {
    // Configure env_logger to see decision logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("vwo")).init();

    let path = std::env::var("VWO_SETTINGS_FILE")
        .unwrap_or_else(|_| "tests/data/settings/campaigns.json".to_owned());
    let settings = SettingsFile::from_reader(File::open(path)?)?;

    let mut config = ClientConfig::new();
    config
        .settings_file(settings)
        .user_storage(InMemoryUserStorage::new())
        .decision_listener(|event: DecisionEvent| {
            println!("Decision event: {:?}", event);
        });
    let client = config.to_client();

    let options = DecisionOptions::new().custom_variable("browser", "chrome");
    for user_id in ["Ashley", "Bill", "Chris", "Dominic"] {
        let variation = client
            .get_variation("AB_T_50_W_40_60", user_id, &options)
            .map(|decision| decision.variation_name);
        println!("{user_id}: {variation:?}");

        let enabled = client.is_feature_enabled("FT_T_100_W_50_50", user_id, &options);
        println!("{user_id}: feature enabled = {enabled}");
    }

    Ok(())
}
