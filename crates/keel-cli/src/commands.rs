use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use keel_catalog::{InMemoryCatalog, MetadataCatalog};
use keel_codec::Manifest;
use keel_registry::{LayerCache, ManifestOption, ManifestService, RegistryConfig, Repository};
use keel_store::{ContentStore, InMemoryContentStore};
use keel_types::{MediaType, RepositoryPath};
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, format),
        Command::Digest(args) => cmd_digest(args, format),
        Command::CheckConfig(args) => cmd_check_config(args, format),
        Command::Publish(args) => cmd_publish(args, format).await,
    }
}

fn read_manifest(path: &Path, media_type: Option<&str>) -> anyhow::Result<Manifest> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let hint = media_type.map(MediaType::parse);
    Manifest::decode_with_media_type(&raw, hint.as_ref())
        .with_context(|| format!("decoding {}", path.display()))
}

fn inspect_report(manifest: &Manifest) -> serde_json::Value {
    json!({
        "mediaType": manifest.media_type().as_str(),
        "digest": manifest.digest().to_string(),
        "size": manifest.payload().len(),
        "config": manifest.config().map(|c| c.digest.to_string()),
        "layers": manifest.layers().iter().map(|l| json!({
            "digest": l.digest.to_string(),
            "size": l.size,
            "mediaType": l.media_type,
        })).collect::<Vec<_>>(),
        "references": manifest.references().iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.file, args.media_type.as_deref())?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&inspect_report(&manifest))?);
        return Ok(());
    }
    println!("{} {}", "Media type:".bold(), manifest.media_type().to_string().cyan());
    println!("{} {}", "Digest:".bold(), manifest.digest().to_string().yellow());
    println!("{} {} bytes", "Size:".bold(), manifest.payload().len());
    if let Some(config) = manifest.config() {
        println!("{} {}", "Config:".bold(), config.digest.to_string().dimmed());
    }
    let layers = manifest.layers();
    println!("{} {}", "Layers:".bold(), layers.len());
    for layer in layers {
        if manifest.is_schema1() {
            println!("  {}", layer.digest);
        } else {
            println!("  {}  {:>10}  {}", layer.digest, layer.size, layer.media_type.dimmed());
        }
    }
    Ok(())
}

fn cmd_digest(args: DigestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.file, args.media_type.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "digest": manifest.digest().to_string() })),
        OutputFormat::Text => println!("{}", manifest.digest()),
    }
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = RegistryConfig::load(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            println!("{} {}", "✓".green().bold(), "configuration valid".bold());
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

async fn cmd_publish(args: PublishArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RegistryConfig::default(),
    };
    let path = RepositoryPath::parse(&args.repo)?;
    let payload = std::fs::read(&args.manifest)
        .with_context(|| format!("reading {}", args.manifest.display()))?;

    let store = Arc::new(InMemoryContentStore::new());
    for blob in &args.blobs {
        let data = std::fs::read(blob).with_context(|| format!("reading {}", blob.display()))?;
        let digest = store.put_blob(&path, &data).await?;
        tracing::debug!(file = %blob.display(), %digest, "blob seeded");
    }

    let catalog = Arc::new(InMemoryCatalog::with_quota(config.quota.clone()));
    if args.precreate {
        catalog.create_collection(path.namespace(), path.name()).await?;
    }

    let repo = Repository::new(
        path.clone(),
        config.registry_addr.clone(),
        store.clone(),
        catalog.clone(),
        Arc::new(LayerCache::new(config.blob_repository_cache_ttl())),
    )
    .with_user_catalog(catalog.clone());
    let service = ManifestService::new(repo, &config);

    let options: Vec<ManifestOption> = args.tag.iter().cloned().map(ManifestOption::Tag).collect();
    let hint = args.media_type.as_deref().map(MediaType::parse);
    let digest = service.put(hint.as_ref(), &payload, &options).await?;
    let fetched = service.get(&digest, &options).await?;
    let round_trip = fetched.digest() == digest;
    let record = catalog.get_collection_image(path.namespace(), path.name(), &digest).await?;

    if format == OutputFormat::Json {
        let report = json!({
            "repository": path.to_string(),
            "digest": digest.to_string(),
            "tag": args.tag,
            "pullSpec": record.docker_image_reference,
            "mediaType": record.media_type.as_str(),
            "size": record.size,
            "layers": record.layers.len(),
            "roundTrip": round_trip,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} Published {}", "✓".green().bold(), path.to_string().bold());
        println!("  Digest: {}", digest.to_string().yellow());
        if let Some(tag) = &args.tag {
            println!("  Tag: {}", tag.cyan());
        }
        println!("  Pull spec: {}", record.docker_image_reference);
        println!("  Layers: {}, size {} bytes", record.layers.len(), record.size);
        let status = if round_trip { "ok".green() } else { "mismatch".red() };
        println!("  Round trip: {status}");
    }
    if !round_trip {
        anyhow::bail!("manifest read back with digest {}", fetched.digest());
    }
    Ok(())
}
