// Endpoints reachable without a token: registration, login and the 2FA /
// password-reset flows that precede a session, plus the lawyer directory.
pub mod auth;
pub mod lawyers;
