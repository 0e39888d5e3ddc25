//! # omnivault-encode
//!
//! Encoder backends for the shared multimodal embedding space.
//!
//! The space has a fixed dimension ([`omnivault_core::EMBEDDING_DIM`], 512)
//! committed process-wide; every text and image vector is L2-normalized so
//! cosine similarity reduces to a dot product.
//!
//! - [`EncoderStack`]: the process-wide model handle bundle with explicit
//!   init and availability flags
//! - [`FeatureHashEncoder`]: deterministic always-available backend
//! - [`StubCaptioner`] / [`StubTranscriber`]: degradation backends that keep
//!   the pipeline succeeding without model weights

pub mod caption;
pub mod hashed;
pub mod stack;
pub mod transcribe;

pub use caption::StubCaptioner;
pub use hashed::FeatureHashEncoder;
pub use stack::EncoderStack;
pub use transcribe::StubTranscriber;
