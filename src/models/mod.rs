pub mod agents;
pub mod conversations;
pub mod messages;
pub mod profiles;
pub mod schema;
pub mod settings;
