//! Domain normalization and validation

pub mod normalizer;

pub use normalizer::{is_valid_label, DomainNormalizer, MAX_LABEL_LEN};
