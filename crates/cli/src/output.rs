// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text vs. JSON rendering of a controller [`Response`], mirroring every
//! subcommand's output through one function so the two formats never drift
//! apart from each other.

use clap::ValueEnum;
use crewly_controller::Response;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_response(response: &Response, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response).unwrap_or_default());
        }
        OutputFormat::Text => {
            if response.success {
                match &response.data {
                    Some(data) => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
                    None => println!("ok"),
                }
            } else {
                let suggestion = response.suggestion.as_deref().unwrap_or("no further detail available");
                println!("not done: {suggestion}");
                if let Some(data) = &response.data {
                    println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
                }
            }
        }
    }
}
