pub mod prelude;

pub mod chats;
pub mod modelfiles;
pub mod settings;
pub mod users;
