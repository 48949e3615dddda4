use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {async_trait::async_trait, tracing::{debug, info, warn}};

use {youtuply_oauth::DeviceAuthFlow, youtuply_youtube::PlaylistClient};

use crate::{
    Error, Result,
    instance::BotInstance,
    message::{ChatOutbound, InboundMessage},
    settings::{BotSettings, SettingsSink},
    store::SettingsStore,
};

/// Called once per settings file that failed to load at startup.
#[async_trait]
pub trait LoadErrorHook: Send + Sync {
    async fn on_load_error(&self, user_id: &str, server_id: &str, error: &Error);
}

/// Persists every settings change through the shared [`SettingsStore`].
struct StoreSink {
    store: Arc<SettingsStore>,
}

#[async_trait]
impl SettingsSink for StoreSink {
    async fn settings_changed(&self, settings: &BotSettings) -> Result<()> {
        self.store.save(settings)
    }
}

/// All live instances, keyed by owner user id, plus the shared plumbing
/// each new instance is built from.
pub struct InstanceRegistry {
    instances: RwLock<HashMap<String, Arc<BotInstance>>>,
    store: Arc<SettingsStore>,
    outbound: Arc<dyn ChatOutbound>,
    playlists: Arc<PlaylistClient>,
    auth: Arc<DeviceAuthFlow>,
    sink: Arc<dyn SettingsSink>,
}

impl InstanceRegistry {
    pub fn new(
        store: Arc<SettingsStore>,
        outbound: Arc<dyn ChatOutbound>,
        playlists: Arc<PlaylistClient>,
        auth: Arc<DeviceAuthFlow>,
    ) -> Self {
        let sink = Arc::new(StoreSink {
            store: Arc::clone(&store),
        });
        Self {
            instances: RwLock::new(HashMap::new()),
            store,
            outbound,
            playlists,
            auth,
            sink,
        }
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<BotInstance>> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_instance(&self, settings: BotSettings) -> Arc<BotInstance> {
        Arc::new(BotInstance::new(
            settings,
            Arc::clone(&self.outbound),
            Arc::clone(&self.playlists),
            Arc::clone(&self.auth),
            Arc::clone(&self.sink),
        ))
    }

    fn insert(&self, user_id: String, instance: Arc<BotInstance>) {
        self.instances
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id, instance);
    }

    /// Rebuild instances from disk at startup.
    ///
    /// Files that fail to parse are skipped and reported through `hook`
    /// with whatever identity the filename yields; everything else still
    /// loads. Returns the number of instances brought up.
    pub async fn load_all(&self, hook: &dyn LoadErrorHook) -> Result<usize> {
        let mut count = 0;
        for entry in self.store.load_all()? {
            match entry.result {
                Ok(settings) => {
                    let user_id = settings.user_id.clone();
                    debug!(user_id, server_id = %settings.server_id, "instance restored");
                    let instance = self.make_instance(settings);
                    self.insert(user_id, instance);
                    count += 1;
                },
                Err(e) => {
                    warn!(
                        user_id = %entry.user_hint,
                        server_id = %entry.server_hint,
                        error = %e,
                        "settings file skipped"
                    );
                    hook.on_load_error(&entry.user_hint, &entry.server_hint, &e)
                        .await;
                },
            }
        }
        info!(count, "instances loaded");
        Ok(count)
    }

    /// Route one inbound message to the instances that should see it.
    ///
    /// Setup creates (or replaces) the author's instance. Direct messages
    /// go to the recipient's instance and, when different, the author's.
    /// Guild-channel messages are broadcast to every instance; each one
    /// decides through its own connections map whether the channel means
    /// anything to it.
    pub async fn route(&self, message: InboundMessage) {
        if BotInstance::is_setup_request(&message.content) {
            self.handle_setup_request(&message).await;
            return;
        }

        if message.is_direct {
            for instance in self.direct_targets(&message) {
                instance.handle_message(&message).await;
            }
            return;
        }

        let instances: Vec<Arc<BotInstance>> = self
            .instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for instance in instances {
            let msg = message.clone();
            tokio::spawn(async move {
                instance.handle_message(&msg).await;
            });
        }
    }

    /// Instances interested in a DM: the other party's, then the author's
    /// own if it is a different one.
    fn direct_targets(&self, message: &InboundMessage) -> Vec<Arc<BotInstance>> {
        let map = self.instances.read().unwrap_or_else(|e| e.into_inner());
        let mut targets = Vec::new();
        if let Some(recipient) = &message.recipient_id
            && let Some(instance) = map.get(recipient)
        {
            targets.push(Arc::clone(instance));
        }
        if message.recipient_id.as_deref() != Some(message.author_id.as_str())
            && let Some(instance) = map.get(&message.author_id)
        {
            targets.push(Arc::clone(instance));
        }
        targets
    }

    /// `!ytp setup` always starts from a blank instance for the author;
    /// any previous instance (and its connections) is discarded.
    async fn handle_setup_request(&self, message: &InboundMessage) {
        let settings = BotSettings {
            user_id: message.author_id.clone(),
            server_id: message.guild_id.clone().unwrap_or_default(),
            server_name: message.guild_name.clone().unwrap_or_default(),
            connections: HashMap::new(),
        };
        info!(
            user_id = %settings.user_id,
            server_id = %settings.server_id,
            "setup requested, creating fresh instance"
        );

        if let Err(e) = self.store.save(&settings) {
            warn!(user_id = %settings.user_id, error = %e, "could not persist fresh instance");
        }
        let instance = self.make_instance(settings.clone());
        self.insert(settings.user_id, Arc::clone(&instance));

        instance.handle_message(message).await;
    }
}
