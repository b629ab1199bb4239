pub mod admin;
pub mod agents;
pub mod attachments;
pub mod auth_middleware;
pub mod chat;
pub mod conversations;
pub mod realtime_routes;
pub mod session;
pub mod webhooks;
