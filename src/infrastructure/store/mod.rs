//! Record store: persistent users and API keys plus admission control

mod admission;
mod persistence;
mod record_store;

pub use record_store::RecordStore;
