/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `users`: User lookup and profile updates
/// - `tasks`: Task lifecycle and assignment

pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;
