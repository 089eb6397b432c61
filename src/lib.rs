//! Client core for the FireGuard home fire/temperature monitor: session
//! persistence, the authenticated gateway client, the push-based live update
//! channel, and the dashboard state synchronizer.

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod live;
pub mod session;
