pub mod auth;
pub mod category;
pub mod docs;
pub mod info;
pub mod model;
pub mod post;
