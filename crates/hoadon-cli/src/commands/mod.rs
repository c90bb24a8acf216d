pub mod batch;
pub mod chat;
pub mod config;
pub mod invoices;
pub mod output;
pub mod process;
pub mod templates;
