pub mod find;
pub mod show;
