pub use super::chats::Entity as Chats;
pub use super::modelfiles::Entity as Modelfiles;
pub use super::settings::Entity as Settings;
pub use super::users::Entity as Users;
