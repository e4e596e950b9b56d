// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! objwire-dump - Decode and print an objwire stream
//!
//! Every root object in the file is decoded without compile-time type
//! knowledge (schemas come from the stream) and printed as an indented tree
//! or as JSON.

mod render;

use clap::Parser;
use colored::*;
use objwire::path::register_schemas;
use objwire::{Decoder, DecoderConfig, EntityRegistry};
use render::{Renderer, SchemaInfo};
use std::path::PathBuf;

/// Decode and print objwire object streams
#[derive(Parser, Debug)]
#[command(name = "objwire-dump")]
#[command(version)]
#[command(about = "Decode an objwire stream and print every root object")]
struct Args {
    /// Stream file to decode
    file: PathBuf,

    /// Output format: pretty, json
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Maximum nesting depth accepted by the decoder
    #[arg(long, default_value_t = objwire::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Maximum element count of any list, map or array
    #[arg(long, default_value_t = objwire::config::DEFAULT_MAX_COLLECTION_LEN)]
    max_collection: usize,

    /// Maximum string length in bytes
    #[arg(long, default_value_t = objwire::config::DEFAULT_MAX_STRING_LEN)]
    max_string: usize,

    /// Also print the schemas found in the stream
    #[arg(short, long)]
    schemas: bool,

    /// Do not preload the built-in path schemas (streams must inline all schemas)
    #[arg(long)]
    no_builtin: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(OutputFormat::Pretty),
            "json" | "j" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.file)
        .map_err(|e| format!("cannot read {}: {}", args.file.display(), e))?;
    log::debug!("[dump] {} bytes from {}", bytes.len(), args.file.display());

    // Schemas only: objects always decode dynamically so they can be walked.
    let registry = EntityRegistry::new();
    if !args.no_builtin {
        register_schemas(&registry)?;
    }

    let config = DecoderConfig::new()
        .with_max_depth(args.max_depth)
        .with_max_collection_len(args.max_collection)
        .with_max_string_len(args.max_string);
    let mut input = &bytes[..];
    let mut decoder = Decoder::with_config(&mut input, &registry, config);

    let mut roots = Vec::new();
    while decoder.bytes_read() < bytes.len() as u64 {
        let offset = decoder.bytes_read();
        let root = decoder
            .object()
            .map_err(|e| format!("root {} at offset {}: {}", roots.len(), offset, e))?;
        roots.push(root);
    }
    let schemas: Vec<SchemaInfo> = decoder.entities().iter().map(SchemaInfo::from).collect();
    log::debug!(
        "[dump] {} root(s), {} object(s), {} inline schema(s)",
        roots.len(),
        decoder.object_count(),
        schemas.len()
    );

    let mut renderer = Renderer::new();
    match args.format {
        OutputFormat::Json => {
            let roots: Vec<serde_json::Value> = roots
                .iter()
                .map(|r| renderer.json_object(r.as_ref()))
                .collect();
            let mut doc = serde_json::json!({ "roots": roots });
            if args.schemas {
                doc["schemas"] = serde_json::to_value(&schemas)?;
            }
            Ok(serde_json::to_string_pretty(&doc)? + "\n")
        }
        OutputFormat::Pretty => {
            let mut out = String::new();
            if args.schemas {
                out.push_str(&format!("{}\n", "=== Schemas ===".bold()));
                for schema in &schemas {
                    out.push_str(&format!(
                        "{}.{} {}\n",
                        schema.package.cyan(),
                        schema.name.cyan().bold(),
                        schema.signature.dimmed()
                    ));
                    for field in &schema.fields {
                        out.push_str(&format!("  {}: {}\n", field.name, field.ty));
                    }
                }
                out.push('\n');
            }
            for (i, root) in roots.iter().enumerate() {
                out.push_str(&renderer.pretty_root(i, root.as_ref()));
            }
            out.push_str(&format!(
                "{}\n",
                format!(
                    "--- {} root(s), {} object(s), {} bytes ---",
                    roots.len(),
                    decoder.object_count(),
                    bytes.len()
                )
                .dimmed()
            ));
            Ok(out)
        }
    }
}
