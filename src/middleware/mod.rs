pub mod auth;
pub mod authorize;
pub mod errors;
pub mod response;

pub use auth::{authenticate, AuthUser};
pub use authorize::{
    require_admin, require_granted_permission, require_token_permission, require_vendor_or_admin, PermissionGate,
};
pub use errors::expose_internal_errors;
pub use response::{ApiResponse, ApiResult};
