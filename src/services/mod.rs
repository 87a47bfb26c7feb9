//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Portal login and availability calls (`session`)
//! - Response normalization (`normalize`), backed by the `tabular` and
//!   `markup` extractors

mod json;
pub mod markup;
pub mod normalizer;
pub mod session;
pub mod tabular;

pub use normalizer::normalize;
pub use session::{
    AuthContext, AvailabilityRequest, Credentials, HttpTransport, PortalGateway, RawResponse,
    SessionGateway, Transport,
};
