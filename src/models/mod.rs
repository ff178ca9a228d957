//! Domain models

pub mod author;
pub mod category;
pub mod loan;
pub mod material;
pub mod publisher;
pub mod user;
