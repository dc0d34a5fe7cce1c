pub mod clipboard;
pub mod postgres;
