//! Generative Gateway
//!
//! Uniform call surface for the AI relay: text/vision, image, video, and
//! music generation. The provider trait hides which relay model serves a
//! request, the response envelope normalizes the relay's shifting payload
//! shapes, and the HTTP implementation speaks the actual wire format.

mod envelope;
pub use envelope::*;

mod provider;
pub use provider::*;

mod http;
pub use http::*;
