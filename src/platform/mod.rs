//! The platform capability: connection trait, callback stream, and
//! interactive credential capture. Concrete wire transports live outside
//! this crate and implement [`PlatformClient`].

pub mod auth;
pub mod callback;
pub mod traits;

pub use auth::{ConsolePrompter, CredentialPrompt, CredentialsPrompter};
pub use callback::{
    Callback, ConnectResult, FriendEntry, FriendRelationship, LogonResult, MachineAuthChunk,
    MachineAuthResponse, NotificationKind, PurchaseResult,
};
pub use traits::{LogOnDetails, PlatformClient};
