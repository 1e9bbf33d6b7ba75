//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

/// LLMOS Dashboard - web backend for local LLM chat
#[derive(Parser)]
#[command(name = "llmos-dashboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Reconcile and print every runtime setting with its source
    Settings,

    /// Manage dashboard users
    Users {
        #[command(subcommand)]
        command: Option<UserCommands>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List all users
    #[command(alias = "ls")]
    List,

    /// Change a user's role
    SetRole {
        /// Email of the user
        email: String,

        /// admin, user or pending
        role: String,
    },
}

pub use commands::*;
