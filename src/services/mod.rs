pub mod email;
pub mod profile_photo;
pub mod user;
