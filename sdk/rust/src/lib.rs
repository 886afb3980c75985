//! Client for the approval revoker HTTP API.

pub mod client;

pub use client::{
    ApiErrorBody, CancelResponse, RevokeRequest, RevokeResponse, RevokerClient, SdkError, StatusQuery,
    StatusResponse,
};
