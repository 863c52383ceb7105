use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::debug;
use vale_codec::{decode_sequence, encode_to, CodecError, EncodeSummary};
use vale_crypto::{ContentHasher, HashScheme};
use vale_resolve::{DirectoryTreeProvider, HashResolver, ResolverConfig};
use vale_store::FileTree;
use vale_types::{ContentHash, Declaration, Value};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Hash(args) => cmd_hash(args, format),
        Command::Encode(args) => cmd_encode(args, format),
        Command::Decode(args) => cmd_decode(args, format),
        Command::Resolve(args) => cmd_resolve(args, format).await,
    }
}

fn load_tree(path: &Path) -> anyhow::Result<FileTree> {
    FileTree::load_from_path(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Digests of a loaded file or directory.
struct HashReport {
    hash_tree: Option<ContentHash>,
    sha256: Option<ContentHash>,
    blobs: usize,
    verified: bool,
}

/// Hash the tree at `path`, keeping only `scheme` when one is given. With
/// `verify`, fails unless the content matches that hex digest: under either
/// scheme for a file, as a hash-tree digest for a directory.
fn hash_path(path: &Path, scheme: Option<HashScheme>, verify: Option<&str>) -> anyhow::Result<HashReport> {
    let tree = load_tree(path)?;
    let hash_tree = ContentHasher::value_digest(&tree.to_value());
    let sha256 = match &tree {
        FileTree::Blob(bytes) => Some(ContentHasher::digest(HashScheme::Sha256, bytes)),
        FileTree::Tree(_) => None,
    };
    if scheme == Some(HashScheme::Sha256) && sha256.is_none() {
        bail!("{} is a directory; sha256 applies to single files", path.display());
    }

    if let Some(hex) = verify {
        let expected = ContentHash::from_hex(hex)?;
        let matches = match &tree {
            FileTree::Blob(bytes) => ContentHasher::verify_any(bytes, &expected),
            FileTree::Tree(_) => hash_tree == expected,
        };
        if !matches {
            bail!("{} does not match {}", path.display(), expected);
        }
    }

    Ok(HashReport {
        hash_tree: (scheme != Some(HashScheme::Sha256)).then_some(hash_tree),
        sha256: sha256.filter(|_| scheme != Some(HashScheme::HashTree)),
        blobs: tree.enumerate_blobs_transitive().len(),
        verified: verify.is_some(),
    })
}

fn cmd_hash(args: HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = hash_path(&args.path, args.scheme, args.verify.as_deref())?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "path": args.path.display().to_string(),
                "hash_tree": report.hash_tree.map(|h| h.to_hex()),
                "sha256": report.sha256.map(|h| h.to_hex()),
                "blobs": report.blobs,
                "verified": report.verified,
            })
        ),
        OutputFormat::Text => {
            if let Some(h) = report.hash_tree {
                println!("{} {}", HashScheme::HashTree.to_string().bold(), h.to_string().yellow());
            }
            if let Some(h) = report.sha256 {
                println!("{}    {}", HashScheme::Sha256.to_string().bold(), h.to_string().yellow());
            } else if args.scheme.is_none() {
                println!("{} blobs in {}", report.blobs, args.path.display());
            }
            if report.verified {
                println!("{} digest verified", "✓".green().bold());
            }
        }
    }
    Ok(())
}

/// Encode the tree at `path` into `output`. Returns the summary, the root
/// hash and the number of bytes written.
fn encode_path(
    path: &Path,
    output: &Path,
    id_offset: u64,
) -> anyhow::Result<(EncodeSummary, ContentHash, u64)> {
    let value = load_tree(path)?.to_value();
    let file = File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let summary = encode_to(&mut writer, &value, id_offset)?;
    writer.flush()?;
    let written = std::fs::metadata(output)?.len();
    Ok((summary, value.hash(), written))
}

fn cmd_encode(args: EncodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (summary, root, written) = encode_path(&args.path, &args.output, args.id_offset)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "output": args.output.display().to_string(),
                "root": root.to_hex(),
                "declarations": summary.declaration_count,
                "next_id": summary.next_id,
                "bytes": written,
            })
        ),
        OutputFormat::Text => {
            println!(
                "{} Encoded {} into {}",
                "✓".green().bold(),
                args.path.display(),
                args.output.display().to_string().bold()
            );
            println!("  Root: {}", root.to_string().yellow());
            match summary.next_id {
                Some(next) => println!(
                    "  Declarations: {} (next id {next})",
                    summary.declaration_count
                ),
                None => println!("  Declarations: {} (id space exhausted)", summary.declaration_count),
            }
            println!("  Bytes: {written}");
        }
    }
    Ok(())
}

fn decode_file(path: &Path) -> anyhow::Result<Vec<Declaration>> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let declarations = decode_sequence(&data)?;
    if declarations.is_empty() {
        return Err(CodecError::EmptyStream.into());
    }
    Ok(declarations)
}

fn variant(value: &Value) -> &'static str {
    if value.is_blob() {
        "blob"
    } else {
        "list"
    }
}

fn cmd_decode(args: DecodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let declarations = decode_file(&args.file)?;
    let Some(root) = declarations.last() else {
        bail!("no declarations in {}", args.file.display());
    };

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = declarations
                .iter()
                .map(|d| {
                    json!({
                        "id": d.id,
                        "variant": variant(&d.value),
                        "size": d.value.size(),
                        "hash": d.value.hash().to_hex(),
                    })
                })
                .collect();
            println!(
                "{}",
                json!({ "declarations": entries, "root": root.id, "root_hash": root.value.hash().to_hex() })
            );
        }
        OutputFormat::Text => {
            for d in &declarations {
                println!(
                    "{:>6}  {:<4}  {:>10}  {}",
                    d.id.to_string().yellow(),
                    variant(&d.value),
                    d.value.size(),
                    d.value.hash().short_hex().dimmed()
                );
            }
            println!(
                "Root: declaration {} ({})",
                root.id.to_string().yellow().bold(),
                root.value.hash()
            );
        }
    }
    Ok(())
}

async fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };
    if args.cache_dir.is_some() {
        config.cache_dir = args.cache_dir.clone();
    }
    debug!(cache_dir = ?config.cache_dir, hints = ?config.merged_hints(&args.hints), "resolving");

    let resolver = HashResolver::from_config(&config, Arc::new(DirectoryTreeProvider::new()))?;
    let resolved = resolver.resolve(&args.hash, &args.hints).await?;

    if let Some(output) = &args.output {
        std::fs::write(output, &resolved.bytes)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "hash": args.hash.trim().to_lowercase(),
                "len": resolved.bytes.len(),
                "scheme": resolved.scheme.to_string(),
                "origin": resolved.origin.to_string(),
                "output": args.output.as_ref().map(|p| p.display().to_string()),
            })
        ),
        OutputFormat::Text => match &args.output {
            Some(output) => println!(
                "{} {} bytes from {} ({}) written to {}",
                "✓".green().bold(),
                resolved.bytes.len(),
                resolved.origin,
                resolved.scheme.to_string().cyan(),
                output.display().to_string().bold()
            ),
            None => std::io::stdout().write_all(&resolved.bytes)?,
        },
    }
    Ok(())
}
