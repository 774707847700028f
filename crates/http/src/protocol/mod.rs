//! Core HTTP protocol abstractions.
//!
//! # Architecture
//!
//! - **Requests** ([`Request`]): a fully read request with its resolved location
//! - **Responses** ([`Response`]): a response under construction, frozen once sent
//!   - [`ResponseBody`]: empty, in-memory bytes, or a [`FileBody`] slice
//! - **Headers** ([`HttpHeaders`]): case-insensitive storage with RFC 2616 normalization
//! - **Identity** ([`ServerIdentity`]): the `(scheme, host, port)` locations the server answers for
//! - **Ranges** ([`RangedSlice`]): single byte range resolution for partial responses
//! - **Message Handling** ([`Message`]): header and payload frames fed to the encoder
//! - **Error Handling**:
//!   - [`ParseError`]: request decoding failures, each with the status code to answer with
//!   - [`SendError`]: response writing failures
//!   - [`HttpError`] / [`HandlerError`]: failures raised by request handlers

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod version;
pub use version::HttpVersion;

mod headers;
pub use headers::HttpHeaders;

mod identity;
pub use identity::{Location, Scheme, ServerIdentity, is_valid_host};

mod request;
pub use request::{Request, RequestBuilder};

mod response;
pub use response::{Response, ResponseBody, ResponseHead};

mod range;
pub use range::RangedSlice;

mod file;
pub use file::{FileBody, FileSource};

mod error;
pub use error::ConnectionError;
pub use error::ErrorHook;
pub use error::HandlerError;
pub use error::HeaderError;
pub use error::HttpError;
pub use error::IdentityError;
pub use error::ParseError;
pub use error::RangeError;
pub use error::ResponseError;
pub use error::SendError;
