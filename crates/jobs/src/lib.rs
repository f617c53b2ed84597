//! The job pipeline: submit a unit of work, poll it to a terminal state
//! under a deadline, and resolve its outputs into downloadable artifacts.
//!
//! Every generation-style operation goes through [`Orchestrator::run`];
//! [`Studio`] is the catalogue of those operations.

pub use {
    error::{JobError, Stage},
    orchestrator::{DeadlineClass, Deadlines, Orchestrator},
    poller::{DEFAULT_POLL_INTERVAL, JobWatch, PollPolicy, Poller},
    request::{
        AssetListing, ImageFormat, ImageToImage, ModelListing, Operation, Privacy,
        RemoveBackground, TextToImage, Upscale,
    },
    resolver::{OutputDescriptor, Resolver},
    studio::Studio,
};

mod error;
mod orchestrator;
mod poller;
pub mod request;
mod resolver;
mod studio;
