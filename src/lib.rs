//! Prompt-to-video studio.
//!
//! The browser side is a single form: the [`FormController`] reads the prompt
//! and options, posts them to `/api/generate`, and plays the returned MP4
//! through an object URL. It talks to the page only through the [`FormView`]
//! and [`ObjectUrls`] traits, so the same controller drives the DOM (see the
//! `web` module, wasm32 only) and the `veo-client` terminal front-end.
//!
//! On the native side, the `server` module serves the page and proxies
//! generation requests to the Veo API through the `veo` module.

pub mod controller;
pub mod error;
pub mod messages;
pub mod object_url;
pub mod transport;
pub mod view;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;
#[cfg(not(target_arch = "wasm32"))]
pub mod veo;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use controller::{FormController, UiState};
pub use error::{ObjectUrlError, TransportError};
pub use messages::{ErrorPayload, FormValues, GenerateRequest};
pub use object_url::{MemoryObjectUrls, ObjectUrl, ObjectUrls};
pub use transport::{GenerateTransport, HttpTransport, TransportResponse};
pub use view::{FormView, StatusTone};
