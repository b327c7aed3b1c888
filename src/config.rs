use crate::{
    decision_listener::NoopDecisionListener, Client, DecisionListener, SettingsFile, UserStorage,
};

/// Configuration for [`Client`].
pub struct ClientConfig<'a> {
    pub(crate) settings_file: Option<SettingsFile>,
    pub(crate) user_storage: Option<Box<dyn UserStorage + Send + Sync + 'a>>,
    pub(crate) decision_listener: Box<dyn DecisionListener + Send + Sync + 'a>,
}

impl<'a> Default for ClientConfig<'a> {
    fn default() -> Self {
        ClientConfig::new()
    }
}

impl<'a> ClientConfig<'a> {
    /// Create a default configuration: no settings file, no user storage, decisions are not
    /// reported anywhere.
    ///
    /// ```
    /// # use vwo_core::ClientConfig;
    /// ClientConfig::new();
    /// ```
    pub fn new() -> Self {
        ClientConfig {
            settings_file: None,
            user_storage: None,
            decision_listener: Box::new(NoopDecisionListener),
        }
    }

    /// Set the initial settings file. It can be replaced later with
    /// [`Client::set_settings_file`].
    pub fn settings_file(&mut self, settings_file: SettingsFile) -> &mut Self {
        self.settings_file = Some(settings_file);
        self
    }

    /// Set user storage to make decisions sticky across calls and settings changes.
    ///
    /// ```
    /// # use vwo_core::{ClientConfig, InMemoryUserStorage};
    /// let mut config = ClientConfig::new();
    /// config.user_storage(InMemoryUserStorage::new());
    /// ```
    pub fn user_storage(&mut self, user_storage: impl UserStorage + Send + Sync + 'a) -> &mut Self {
        self.user_storage = Some(Box::new(user_storage));
        self
    }

    /// Set decision listener to pass decisions to your analytics integration.
    ///
    /// ```
    /// # use vwo_core::{ClientConfig, DecisionEvent};
    /// let mut config = ClientConfig::new();
    /// config.decision_listener(|event: DecisionEvent| {
    ///   println!("{:?}", event);
    /// });
    /// ```
    pub fn decision_listener(
        &mut self,
        decision_listener: impl DecisionListener + Send + Sync + 'a,
    ) -> &mut Self {
        self.decision_listener = Box::new(decision_listener);
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// ```
    /// # use vwo_core::{ClientConfig, Client};
    /// let client: Client = ClientConfig::new().to_client();
    /// ```
    pub fn to_client(self) -> Client<'a> {
        Client::new(self)
    }
}
