//! Incremental decoding of chat completion responses
//!
//! - [`framer`]: splits a chunked body into SSE frames
//! - [`extractor`]: pulls text (or images) out of provider-specific JSON
//! - [`policy`]: picks streaming or non-streaming transport per model
//! - [`decoder`]: ties the above into a fragment stream

pub mod decoder;
pub mod extractor;
pub mod framer;
pub mod policy;

pub use decoder::{decode_fragments, single_fragment, FragmentStream};
pub use extractor::{detect_shape, extract_delta, extract_image, EventShape, ImageShape};
pub use framer::{ChunkFramer, Frame, FramedLine};
pub use policy::StreamingPolicy;
