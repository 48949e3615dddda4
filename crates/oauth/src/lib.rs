//! OAuth device-flow token manager.
//!
//! Per-user token storage plus the OAuth 2.0 device authorization grant
//! (the user authorizes in a browser with a short code while we poll the
//! token endpoint) and the refresh-token exchange used when an access
//! token goes stale.

pub mod device_flow;
pub mod error;
pub mod storage;
pub mod types;

pub use {
    device_flow::{DeviceAuthFlow, DeviceCodeResponse, DeviceFlowOutcome},
    error::{Error, Result},
    storage::TokenStore,
    types::{RefreshCredentials, TokenRecord, serialize_secret},
};
