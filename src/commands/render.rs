//! Render command implementation
//!
//! Composes the configuration from the built-in defaults, optional
//! Elasticsearch connection flags and an optional user settings file, then
//! prints it, writes it to a file, or checks an existing file against it.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ents_config::association::{ResolvedAssociation, StaticAssociationResolver};
use ents_config::composer::new_config;
use ents_config::resource::EnterpriseSearch;
use ents_config::settings::CanonicalConfig;

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// User settings file (YAML), merged over everything else
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Elasticsearch URL; enables the association settings
    #[arg(long, value_name = "URL", requires_all = ["es_username", "es_password"])]
    pub es_url: Option<String>,

    /// Elasticsearch username
    #[arg(long, value_name = "USER", requires = "es_url")]
    pub es_username: Option<String>,

    /// Elasticsearch password
    #[arg(long, value_name = "PASSWORD", env = "ENTS_CONFIG_ES_PASSWORD")]
    pub es_password: Option<String>,

    /// Trust the Elasticsearch CA mounted in the container
    #[arg(long, requires = "es_url")]
    pub es_ca: bool,

    /// Write the rendered file here instead of stdout
    #[arg(short, long, value_name = "PATH", conflicts_with = "check")]
    pub output: Option<PathBuf>,

    /// Compare with an existing rendered file and fail if it differs
    #[arg(long, value_name = "PATH")]
    pub check: Option<PathBuf>,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let mut ents = EnterpriseSearch::new("default", "ents-config");
    if let Some(path) = &args.config {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        ents.spec.config = Some(
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse settings file {}", path.display()))?,
        );
    }

    let resolver = StaticAssociationResolver::new(association_from_args(&args));
    let cfg = new_config(&resolver, &ents)?;

    let rendered = cfg.render()?;

    if let Some(path) = &args.check {
        let existing =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        if existing == rendered {
            println!("{} is up to date", path.display());
            return Ok(());
        }
        // consumers compare raw bytes, so list the drifted keys only as a hint
        let drift = std::str::from_utf8(&existing)
            .ok()
            .and_then(|text| CanonicalConfig::from_yaml_str(text).ok())
            .map(|existing| existing.diff(&cfg))
            .unwrap_or_default();
        if drift.is_empty() {
            println!("  formatting differs");
        }
        for key in &drift {
            println!("  {}", key);
        }
        anyhow::bail!("{} differs from the rendered configuration", path.display());
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&rendered)),
    }
    Ok(())
}

fn association_from_args(args: &RenderArgs) -> Option<ResolvedAssociation> {
    let host = args.es_url.clone()?;
    Some(ResolvedAssociation {
        host,
        username: args.es_username.clone().unwrap_or_default(),
        password: args.es_password.clone().unwrap_or_default(),
        ca_configured: args.es_ca,
    })
}
