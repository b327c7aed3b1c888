use std::sync::{Arc, RwLock};

use crate::settings::SettingsFile;

/// Holds the settings file decisions are made against.
///
/// A settings file is never edited in place: refreshing swaps in a whole new [`SettingsFile`].
/// Each decision clones the [`Arc`] once, so it runs against a single consistent snapshot even if
/// a refresh lands halfway through.
#[derive(Default)]
pub struct SettingsStore {
    current: RwLock<Option<Arc<SettingsFile>>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, or `None` until a settings file has been set.
    pub fn get_settings_file(&self) -> Option<Arc<SettingsFile>> {
        // A poisoned lock means a writer panicked mid-swap; callers see "no settings".
        self.current.read().ok()?.clone()
    }

    /// Swap in `settings_file`, returning the snapshot it replaces.
    pub fn set_settings_file(&self, settings_file: SettingsFile) -> Option<Arc<SettingsFile>> {
        let (account_id, version) = (settings_file.account_id, settings_file.version);
        let next = Arc::new(settings_file);

        let previous = {
            let mut current = self.current.write().ok()?;
            current.replace(next)
        };

        log::debug!(target: "vwo",
                    account_id,
                    version,
                    previous_version:serde = previous.as_ref().map(|settings| settings.version);
                    "settings file replaced");
        previous
    }
}
