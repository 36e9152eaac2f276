// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal CLI wrapper so the library can run as a stand-alone tunnel.
//!
//!  Build it with `cargo build --release --bin waypoint`
//!  The binary honours WAYPOINT_CONFIG_FILE or falls back to /etc/waypoint/config.toml.

use std::env;
use std::error::Error;
use waypoint::{Waypoint, error_fmt, info_fmt};

const FALLBACK_CONFIG: &str = "/etc/waypoint/config.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("Starting Waypoint");

    // Base loader always pulls env vars; file path is optional.
    let mut loader = Waypoint::loader().with_env_vars();
    match env::var("WAYPOINT_CONFIG_FILE") {
        Ok(path) => {
            println!("Using configuration from {path}");
            loader = loader.with_config_file(&path);
        }
        Err(_) => {
            println!("No WAYPOINT_CONFIG_FILE env var found. Attempting to use {FALLBACK_CONFIG}");
            if !std::path::Path::new(FALLBACK_CONFIG).exists() {
                println!("Default configuration file {FALLBACK_CONFIG} does not exist.");
                return Err(Box::from("No configuration file found."));
            }
            loader = loader.with_config_file(FALLBACK_CONFIG);
        }
    }

    let waypoint = match loader.build().await {
        Ok(w) => w,
        Err(e) => {
            println!("Failed to build waypoint: {e}");
            return Err(e.into());
        }
    };

    match waypoint.run().await {
        Ok(()) => {
            info_fmt!("Waypoint", "Stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error_fmt!("Waypoint", "Stopped with error: {}", e);
            Err(e.into())
        }
    }
}
