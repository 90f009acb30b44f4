//! Identity, tokens and authorization for tenantgate.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod token;
mod resolver;
mod guard;
mod provider;
mod request_context;
mod middleware;

pub use principal::{EntityId, Principal, Role, TenantId, UnknownRole};
pub use token::{Token, TokenCodec, TokenError, TokenIssueError, DEFAULT_TOKEN_TTL};
pub use resolver::{IdentityResolver, OwnerRole, TenantResolver};
pub use guard::{AccessCheck, AccessDecision, AccessGuard, AccessTier};
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse};
pub use request_context::{require_admin, require_manager_or_admin, RequestIdentity};
pub use middleware::{require_identity, IdentityLayer};
