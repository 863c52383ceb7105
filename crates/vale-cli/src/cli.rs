use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vale_crypto::{HashScheme, HasherError};

#[derive(Parser)]
#[command(
    name = "vale",
    about = "Vale: content-addressed value codec and hash resolver",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the hash-tree and SHA-256 digests of a file or directory
    Hash(HashArgs),
    /// Encode a file or directory into the wire format
    Encode(EncodeArgs),
    /// List the declarations of an encoded stream
    Decode(DecodeArgs),
    /// Fetch and verify the bytes for a content hash
    Resolve(ResolveArgs),
}

#[derive(Args)]
pub struct HashArgs {
    pub path: PathBuf,
    /// Print only this digest: hash-tree or sha256
    #[arg(long, value_parser = parse_scheme)]
    pub scheme: Option<HashScheme>,
    /// Fail unless the content matches this hex digest
    #[arg(long)]
    pub verify: Option<String>,
}

fn parse_scheme(s: &str) -> Result<HashScheme, HasherError> {
    s.parse()
}

#[derive(Args)]
pub struct EncodeArgs {
    pub path: PathBuf,
    #[arg(short, long)]
    pub output: PathBuf,
    /// First declaration id to assign
    #[arg(long, default_value = "0")]
    pub id_offset: u64,
}

#[derive(Args)]
pub struct DecodeArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Hex-encoded hash-tree or SHA-256 digest
    pub hash: String,
    /// Hint source to search, in order. Repeatable.
    #[arg(long = "hint")]
    pub hints: Vec<String>,
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Resolver config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the bytes here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_does_not_panic() {
        assert!(Cli::try_parse_from(["vale", "--help"]).is_err());
    }

    #[test]
    fn parses_resolve_with_repeated_hints() {
        let cli = Cli::try_parse_from([
            "vale", "resolve", "ab12", "--hint", "one", "--hint", "two", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.hash, "ab12");
        assert_eq!(args.hints, vec!["one", "two"]);
        assert!(args.output.is_none());
    }

    #[test]
    fn encode_requires_output() {
        assert!(Cli::try_parse_from(["vale", "encode", "dir"]).is_err());
        let cli = Cli::try_parse_from(["vale", "encode", "dir", "-o", "out.vale", "--id-offset", "7"])
            .unwrap();
        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.id_offset, 7);
    }

    #[test]
    fn hash_accepts_known_schemes_only() {
        let cli = Cli::try_parse_from(["vale", "hash", "f.txt", "--scheme", "sha256", "--verify", "ab"])
            .unwrap();
        let Command::Hash(args) = cli.command else {
            panic!("expected hash");
        };
        assert_eq!(args.scheme, Some(HashScheme::Sha256));
        assert_eq!(args.verify.as_deref(), Some("ab"));

        let err = Cli::try_parse_from(["vale", "hash", "f.txt", "--scheme", "md5"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("md5"));
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["vale", "decode", "x.vale", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Text);
    }
}
