//! ePub Translator - translate e-books through a remote document translation service
//!
//! This library unpacks an ePub, sends every (X)HTML document to the DeepL
//! document API one at a time, replaces each file with its translation and
//! packs the result into a new ePub.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;
pub mod processors;

// Re-export key types for convenience
pub use core::{
    client::DocumentTranslator,
    config::TranslatorConfig,
    errors::TranslationError,
    models::{CandidateFile, FileOutcome, JobStatus, MarkupKind, RunReport, TranslationJob},
};

pub use processors::epub::EpubProcessor;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
