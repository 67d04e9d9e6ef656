use crate::config::Config;
use crate::error::AppResult;
use crate::services::{ConversationService, IdentityResolver, JwtIdentityResolver, MessageService};
use crate::store::{ChatStore, Directory};
use crate::websocket::{Gateway, RoomRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<dyn Directory>,
    pub identity: Arc<dyn IdentityResolver>,
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub gateway: Gateway,
}

impl AppState {
    /// Wire services over the given stores with JWT identity resolution.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn ChatStore>,
        directory: Arc<dyn Directory>,
    ) -> AppResult<Self> {
        let identity: Arc<dyn IdentityResolver> = Arc::new(JwtIdentityResolver::new(
            &config.jwt_key,
            directory.clone(),
        )?);
        Ok(Self::with_identity(config, store, directory, identity))
    }

    pub fn with_identity(
        config: Arc<Config>,
        store: Arc<dyn ChatStore>,
        directory: Arc<dyn Directory>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        let conversations = ConversationService::new(store.clone(), directory.clone());
        let messages = MessageService::new(
            store,
            config.message_page_size,
            config.message_page_size_max,
        );
        let gateway = Gateway::new(
            RoomRegistry::new(),
            identity.clone(),
            conversations.clone(),
            messages.clone(),
        );

        Self {
            config,
            directory,
            identity,
            conversations,
            messages,
            gateway,
        }
    }
}
