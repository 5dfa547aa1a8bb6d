pub mod auth;
pub mod response;
pub mod track;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use track::track_requests;
