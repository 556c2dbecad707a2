//! Client side of a URL shortener: submit links, keep a short most-recent-first
//! history of them, persist it, and poll the backend for visit counts.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod persistence;
pub mod render;
pub mod scheduler;
pub mod shorten;
pub mod storage;

pub use api::{HttpLinkApi, LinkApi};
pub use client::{LinkClient, SessionEnd};
pub use config::{ClientConfig, HistorySettings};
pub use error::{PersistenceError, RequestError, SubmitError, ValidationError};
pub use history::{HistoryObserver, HistoryStore};
pub use models::LinkRecord;
