pub mod auth;
pub mod error;
pub mod invitations;
pub mod matches;
pub mod middleware;
pub mod scores;
