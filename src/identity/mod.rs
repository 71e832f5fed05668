//! Session identity: who the current session's user is and which roles it holds.
//! Keep the public surface thin and split implementation across sub-modules.

mod context;
mod directory;
mod error;
mod principal;
mod session;
mod session_info;

pub use context::{Authentication, AuthenticationContext};
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use error::IdentityError;
pub use principal::{Principal, UserRole};
pub use session::{SessionHandle, SessionId, SessionRegistry};
pub use session_info::SessionInfo;
