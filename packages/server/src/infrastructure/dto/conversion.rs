//! Conversion logic between DTOs and domain entities.

use crate::domain::{
    ConnectionEdge, ConnectionWithProfile, Conversation, ConversationSummary, DomainEvent, Message,
    PayloadKind, User, UserId,
};
use crate::infrastructure::dto::{http, websocket as dto};

/// Characters of message content carried by a chat-preview frame
pub const PREVIEW_CHARS: usize = 80;

fn ids(participant_ids: [UserId; 2]) -> [i64; 2] {
    participant_ids.map(|id| id.value())
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<User> for dto::UserDto {
    fn from(model: User) -> Self {
        Self {
            id: model.id.value(),
            username: model.username,
            email: model.email,
            bio: model.bio,
        }
    }
}

impl From<ConnectionEdge> for dto::ConnectionEdgeDto {
    fn from(model: ConnectionEdge) -> Self {
        Self {
            from_user_id: model.from_user_id.value(),
            to_user_id: model.to_user_id.value(),
            created_at: model.created_at.value(),
        }
    }
}

impl From<Conversation> for dto::ConversationDto {
    fn from(model: Conversation) -> Self {
        Self {
            id: model.id.value(),
            participant_ids: ids(model.participant_ids),
            created_at: model.created_at.value(),
        }
    }
}

impl From<Message> for dto::MessageDto {
    fn from(model: Message) -> Self {
        Self {
            id: model.id.value(),
            conversation_id: model.conversation_id.value(),
            sender_id: model.sender_id.value(),
            content: model.content.into_string(),
            created_at: model.created_at.value(),
        }
    }
}

impl From<ConnectionWithProfile> for http::ConnectionDto {
    fn from(model: ConnectionWithProfile) -> Self {
        Self {
            edge: model.edge.into(),
            user: model.counterpart.into(),
        }
    }
}

impl From<ConversationSummary> for http::ConversationSummaryDto {
    fn from(model: ConversationSummary) -> Self {
        Self {
            conversation: model.conversation.into(),
            counterpart: model.counterpart.into(),
            last_message: model.last_message.map(Into::into),
        }
    }
}

// ========================================
// Domain Event → Server frame
// ========================================

/// Build the frame delivered for one route of a domain event.
///
/// Returns `None` when the event has no payload of the requested kind.
pub fn server_event(event: &DomainEvent, kind: PayloadKind) -> Option<dto::ServerEvent> {
    match (event, kind) {
        (DomainEvent::ConnectionEstablished { edge, conversation }, PayloadKind::Event) => {
            Some(dto::ServerEvent::ConnectionEstablished {
                edge: edge.clone().into(),
                conversation: conversation.clone().into(),
            })
        }
        (
            DomainEvent::ConnectionRemoved {
                from_user_id,
                to_user_id,
                conversation_id,
            },
            PayloadKind::Event,
        ) => Some(dto::ServerEvent::ConnectionRemoved {
            from_user_id: from_user_id.value(),
            to_user_id: to_user_id.value(),
            conversation_id: conversation_id.value(),
        }),
        (
            DomainEvent::MessagePosted {
                conversation_id,
                message,
                ..
            },
            PayloadKind::Event,
        ) => Some(dto::ServerEvent::MessagePosted {
            conversation_id: conversation_id.value(),
            message: message.clone().into(),
        }),
        (
            DomainEvent::MessagePosted {
                conversation_id,
                participant_ids,
                message,
            },
            PayloadKind::ChatPreview,
        ) => Some(dto::ServerEvent::ChatPreview {
            conversation_id: conversation_id.value(),
            participant_ids: ids(*participant_ids),
            sender_id: message.sender_id.value(),
            preview: message.content.preview(PREVIEW_CHARS),
            created_at: message.created_at.value(),
        }),
        (
            DomainEvent::ConversationCleared {
                conversation_id,
                participant_ids,
            },
            PayloadKind::Event,
        ) => Some(dto::ServerEvent::ConversationCleared {
            conversation_id: conversation_id.value(),
            participant_ids: ids(*participant_ids),
        }),
        _ => None,
    }
}
