mod settings;
mod users;

pub use settings::cmd_settings;
pub use users::{cmd_user_list, cmd_user_set_role};
