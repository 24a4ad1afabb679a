pub mod bootstrap;
pub mod health;
pub mod modules;
pub mod records;
pub mod render;
pub mod users;
