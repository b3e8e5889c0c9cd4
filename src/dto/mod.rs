pub mod auth;
pub mod cart;
pub mod groups;
pub mod menu;
pub mod orders;
