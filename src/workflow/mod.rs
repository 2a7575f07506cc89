//! The quality-selection state machine driving a download

pub mod controller;

pub use controller::{
    Delivery, DownloadTicket, Downloaded, Fetched, MetadataSummary, QualityOption, UrlTicket, WorkflowController,
};
