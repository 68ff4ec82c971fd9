// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! Main CA executable.
//!
//! This is the entry point of the `pki-ca` operator binary. It loads the
//! enrollment profiles the same way the CA does and reports what the CA
//! would enforce.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use eyre::WrapErr;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    prelude::*,
};

use pki_ca::ca::Service;
use pki_ca::common::Locale;
use pki_ca::config::Config;
use pki_ca::plugin_manager::PluginManager;
use pki_ca::profile::{ComponentDescription, ProfileApi};
use pki_ca::tps::MappingResolver;

/// Certificate authority enrollment profiles.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CA config file.
    #[arg(short, long, default_value = "/etc/pki/ca/pki-ca.conf")]
    config: PathBuf,

    /// Verbosity level. Repeat to increase level.
    #[arg(short, long, global=true, action = clap::ArgAction::Count, display_order = 920)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load all profiles and report the skipped policies. Fails when any
    /// policy was skipped.
    Check,
    /// Print the inputs, policies and outputs of the profile.
    Describe {
        /// Profile id.
        profile: String,

        /// Locale of the descriptions.
        #[arg(long, default_value = "en")]
        locale: String,
    },
}

fn print_component(indent: &str, component: &ComponentDescription) {
    println!(
        "{indent}{} ({}): {}",
        component.name, component.class_id, component.text
    );
    for (name, descriptor, value) in &component.config {
        println!(
            "{indent}  param {name} [{}] {} = {}",
            descriptor.syntax,
            descriptor.label,
            value.as_deref().unwrap_or("")
        );
    }
    for (name, descriptor) in &component.values {
        println!(
            "{indent}  value {name} [{}] {}{}",
            descriptor.syntax,
            descriptor.label,
            if descriptor.required { " (required)" } else { "" }
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let args = Args::parse();

    let filter = Targets::new().with_default(match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    });

    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter);

    // build the tracing registry
    tracing_subscriber::registry().with(log_layer).init();

    let cfg = Config::new(args.config)?;
    let plugin_manager = PluginManager::default().with_builtin_policies();
    let state = Service::build(cfg.clone(), plugin_manager)?;
    let profiles = state.provider.get_profile_provider();
    let loaded = profiles
        .load_dir(&state)
        .await
        .wrap_err("Failed to load the profiles")?;
    info!("Loaded profiles: {}", loaded.join(", "));

    match args.command {
        Command::Check => {
            let mut skipped = 0;
            for profile in profiles.list_profiles(false).await {
                let status = if profile.is_enabled() { "enabled" } else { "disabled" };
                println!("{} ({status})", profile.id());
                for policy in profile.skipped_policies() {
                    println!("  skipped {policy}");
                }
                skipped += profile.skipped_policies().len();
            }
            if let Some(path) = &cfg.tps.mapping {
                let resolver = MappingResolver::load(path).await?;
                println!("token profile mappings: {}", resolver.mappings().len());
            }
            if skipped > 0 {
                return Err(eyre!("{skipped} policies were skipped"));
            }
        }
        Command::Describe { profile, locale } => {
            let desc = profiles
                .get_profile(&profile)
                .await?
                .describe(&Locale::new(locale));
            println!("{}: {}", desc.id, desc.name);
            if !desc.description.is_empty() {
                println!("  {}", desc.description);
            }
            if let Some(auth) = &desc.auth_instance_id {
                println!("authenticator: {auth}");
            }
            println!("inputs:");
            for input in &desc.inputs {
                print_component("  ", input);
            }
            for set in &desc.policy_sets {
                match &set.match_rule {
                    Some(rule) => println!("policy set {} (match {rule}):", set.id),
                    None => println!("policy set {}:", set.id),
                }
                for policy in &set.policies {
                    println!("  policy {}:", policy.id);
                    print_component("    ", &policy.default);
                    print_component("    ", &policy.constraint);
                }
            }
            println!("outputs:");
            for output in &desc.outputs {
                print_component("  ", output);
            }
        }
    }

    state.terminate().await?;
    Ok(())
}
