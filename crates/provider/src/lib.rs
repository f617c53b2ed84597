//! Client for the remote, queue-based image generation API.
//!
//! [`Provider`] is the seam the job pipeline talks through: one
//! authenticated request per call, JSON in and JSON out. [`HttpProvider`]
//! is the production implementation; tests substitute scripted fakes.

pub use {
    error::ProviderError,
    http::HttpProvider,
    provider::{Provider, with_query},
    reqwest::{Client, Method},
    types::{
        Asset, AssetEnvelope, AssetPage, AssetProperties, Job, JobEnvelope, JobMetadata, JobRef,
        JobStatus, Model, ModelPage, SubmitEnvelope,
    },
};

mod error;
mod http;
mod provider;
mod types;
