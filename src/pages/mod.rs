pub mod archive;
pub mod home;
pub mod not_found;
mod widgets;
