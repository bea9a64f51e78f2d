pub mod catalog;
pub mod details;
pub mod fields;
pub mod identity;
