//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Output rendering in text, JSON or CSV

pub mod exit_codes;
pub mod output;

pub use exit_codes::{
    exit_code_description, print_exit_codes, transport_exit_code, CliResult, ExitCodes,
};
pub use output::{
    render_dual_reading, render_identity, render_info, render_reading, render_sample, OutputFormat,
};
