pub mod api;
pub mod components;
pub mod response;
pub mod verify;
