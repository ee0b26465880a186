//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from the
//! resource registry.
//!
//! ## Usage
//!
//! ```bash
//! # All kinds, as a multi-document stream
//! cargo run --bin crdgen > config/crd/cnauth.yaml
//!
//! # A single kind, applied directly
//! cargo run --bin crdgen -- --kind user | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use cnauth_controller::crd::{ResourceKind, ResourceRegistry};

#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Print CNAuth CRDs as YAML")]
struct Cli {
    /// Only print this kind (jwtkey, user, service)
    #[arg(long)]
    kind: Option<ResourceKind>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = match cli.kind {
        Some(kind) => ResourceRegistry::with_kinds(&[kind]),
        None => ResourceRegistry::new(),
    };

    let mut documents = Vec::with_capacity(registry.len());
    for entry in registry.iter() {
        let yaml = serde_yaml::to_string(&entry.definition)
            .with_context(|| format!("Failed to serialize CRD for {}", entry.kind))?;
        documents.push(yaml);
    }

    print!("{}", documents.join("---\n"));
    Ok(())
}
