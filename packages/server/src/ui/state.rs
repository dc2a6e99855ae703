//! Shared application state.

use std::sync::Arc;

use kizuna_shared::time::Clock;

use crate::{
    domain::{
        ConversationRepository, EventPublisher, GraphRepository, SessionRegistry, UserRepository,
    },
    usecase::{
        ClearConversationUseCase, ConnectUsersUseCase, ConnectionStatusUseCase,
        DisconnectUsersUseCase, GetHistoryUseCase, ListConnectionsUseCase,
        ListConversationsUseCase, SendMessageUseCase, SubscriptionUseCase,
    },
};

/// Shared application state
///
/// Every dependency is constructed once at startup and injected here; handlers never
/// reach for globals.
pub struct AppState {
    /// Identity collaborator（トークン → ユーザー）
    pub users: Arc<dyn UserRepository>,
    /// Real-Time Hub のセッション管理
    pub registry: Arc<dyn SessionRegistry>,
    pub clock: Arc<dyn Clock>,
    pub connect_users_usecase: Arc<ConnectUsersUseCase>,
    pub disconnect_users_usecase: Arc<DisconnectUsersUseCase>,
    pub list_connections_usecase: Arc<ListConnectionsUseCase>,
    pub connection_status_usecase: Arc<ConnectionStatusUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub get_history_usecase: Arc<GetHistoryUseCase>,
    pub list_conversations_usecase: Arc<ListConversationsUseCase>,
    pub clear_conversation_usecase: Arc<ClearConversationUseCase>,
    pub subscription_usecase: Arc<SubscriptionUseCase>,
}

impl AppState {
    /// Wire every use case from one store and one hub.
    ///
    /// # Arguments
    ///
    /// * `store` - Identity / Graph / Conversation store
    /// * `hub` - Real-Time Hub (publisher and session registry)
    /// * `clock` - Time source for timestamps
    /// * `max_content_len` - Maximum message length in characters
    pub fn new<S, H>(
        store: Arc<S>,
        hub: Arc<H>,
        clock: Arc<dyn Clock>,
        max_content_len: usize,
    ) -> Self
    where
        S: UserRepository + GraphRepository + ConversationRepository + 'static,
        H: EventPublisher + SessionRegistry + 'static,
    {
        let users: Arc<dyn UserRepository> = store.clone();
        let graph: Arc<dyn GraphRepository> = store.clone();
        let conversations: Arc<dyn ConversationRepository> = store;
        let publisher: Arc<dyn EventPublisher> = hub.clone();
        let registry: Arc<dyn SessionRegistry> = hub;

        Self {
            connect_users_usecase: Arc::new(ConnectUsersUseCase::new(
                graph.clone(),
                publisher.clone(),
                clock.clone(),
            )),
            disconnect_users_usecase: Arc::new(DisconnectUsersUseCase::new(
                graph.clone(),
                publisher.clone(),
            )),
            list_connections_usecase: Arc::new(ListConnectionsUseCase::new(graph.clone())),
            connection_status_usecase: Arc::new(ConnectionStatusUseCase::new(graph)),
            send_message_usecase: Arc::new(
                SendMessageUseCase::new(conversations.clone(), publisher.clone(), clock.clone())
                    .with_max_content_len(max_content_len),
            ),
            get_history_usecase: Arc::new(GetHistoryUseCase::new(conversations.clone())),
            list_conversations_usecase: Arc::new(ListConversationsUseCase::new(
                conversations.clone(),
            )),
            clear_conversation_usecase: Arc::new(ClearConversationUseCase::new(
                conversations.clone(),
                publisher,
            )),
            subscription_usecase: Arc::new(SubscriptionUseCase::new(
                conversations,
                registry.clone(),
            )),
            users,
            registry,
            clock,
        }
    }
}
