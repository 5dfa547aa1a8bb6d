// Endpoints behind the JWT middleware; handlers receive the authenticated
// user through the AuthUser request extension.
pub mod chat;
pub mod lawyers;
pub mod notifications;
pub mod profile;
pub mod two_factor;
