//! scpush client: transfer requests and how they run
// (c) 2024 Ross Younger

pub mod job;
mod main_loop;
mod progress;
mod transfer;

pub use job::{FilePair, FileSpec, TransferRequest};
pub(crate) use main_loop::client_main;
pub(crate) use progress::MAX_UPDATE_FPS;
pub use transfer::{FileReport, TransferReport};
