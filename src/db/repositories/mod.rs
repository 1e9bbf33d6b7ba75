pub mod chat;
pub mod modelfile;
pub mod setting;
pub mod user;
