//! Gather everything needed for one submission before any command is composed

/// The per-run submission parameters, built once and passed through the pipeline
pub mod submission;

/// Option sources: the per-user options file and `-o` flags
pub mod options;

/// Line-oriented input files (file arrays, argument files, library listings)
pub mod read;
