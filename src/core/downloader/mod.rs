pub mod client;

pub use client::{DownloadTrigger, Downloader};
