// Challenge invitation lifecycle and settlement
pub mod collaborators;
pub mod engine;
pub mod types;

pub use collaborators::{
    Clock, InMemoryInvitationStore, InMemorySessionFactory, InvitationStore, ManualClock,
    NotificationBus, NullNotificationBus, RecordingNotificationBus, SessionFactory, SystemClock,
};
pub use engine::{
    AcceptOutcome, InvitationDraft, MatchReport, SessionSettlement, SettlementEngine,
};
pub use types::{
    Invitation, InvitationCategory, InvitationStatus, SessionData, SettlementEvent,
};
