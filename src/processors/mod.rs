//! File and archive processing: the steps of the ePub pipeline

pub mod archive;
pub mod epub;
pub mod replace;
pub mod selector;
