//! Find job scripts and instrument them for submission

/// Resolve a script name against the current directory and the script library
pub mod locate;

/// Header-aware rewriting of a script into its instrumented variant
pub mod decorate;

/// Library listings and script descriptions
pub mod info;
