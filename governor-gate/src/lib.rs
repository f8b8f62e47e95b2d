//! Auth Gate HTTP middleware: credential extraction (Basic → Bearer →
//! cookie), scope checks, and ACL-backed role guards (`admin`, `user`,
//! `owner_param`, `mod_`, `member`, `no_ban`, `system`).

pub mod context;
pub mod credential;
pub mod error;
pub mod gate;
pub mod guard;
pub mod rank;

pub use context::AuthContext;
pub use credential::Credential;
pub use error::GateError;
pub use gate::{AuthGate, SystemAuthorizer};
pub use guard::{AdminGuard, Guard, MemberGuard, ModGuard, NoBanGuard, OwnerParamGuard, SystemGuard, UserGuard};
pub use rank::{Rank, RankTag};

pub mod prelude {
    pub use crate::{AuthContext, AuthGate, GateError, Guard};
}
