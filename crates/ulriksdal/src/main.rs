#![forbid(unsafe_code)]

//! Ulriksdal CLI: bind, re-marshal, sign and verify XML documents.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use ulriksdal_bind::{AnyElement, BindingContext, ConfigurationLoader, SigningParameters};
use ulriksdal_core::{algorithm, Error, QName};
use ulriksdal_dsig::{DsigContext, EnvelopedSigner, VerifyResult};
use ulriksdal_xml::Document;

#[derive(Parser)]
#[command(
    name = "ulriksdal",
    about = "Ulriksdal: typed object/XML binding with enveloped signatures",
    version
)]
struct Cli {
    /// Log level written to stderr (error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn", global = true)]
    log_level: String,

    /// Load a provider bootstrap document (repeatable)
    #[arg(long = "config", global = true)]
    config: Vec<PathBuf>,

    /// Register an ID attribute: `local` or `prefix:local=uri` (repeatable)
    #[arg(long = "id-attr", global = true)]
    id_attr: Vec<String>,

    /// Skip elements with no registered provider instead of failing
    #[arg(long = "ignore-unknown", global = true)]
    ignore_unknown: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unmarshal a document and marshal it again
    Roundtrip {
        /// Input XML file
        file: PathBuf,

        /// Rebuild every element instead of reusing the parsed tree
        #[arg(long)]
        rebuild: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign the document element with an enveloped HMAC signature
    Sign {
        /// Input XML file
        file: PathBuf,

        /// Load raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: PathBuf,

        /// Name written as ds:KeyName
        #[arg(long = "key-name")]
        key_name: Option<String>,

        /// Digest algorithm URI
        #[arg(long, default_value = algorithm::SHA256)]
        digest: String,

        /// Signature algorithm URI
        #[arg(long, default_value = algorithm::HMAC_SHA256)]
        signature: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify every signature in a document
    Verify {
        /// Input XML file
        file: PathBuf,

        /// Load raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: PathBuf,

        /// Reject signatures naming another key
        #[arg(long = "key-name")]
        key_name: Option<String>,
    },

    /// List registered providers and supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();

    let log_level = cli.log_level.parse().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }

    let result = build_context(&cli).and_then(|ctx| match cli.command {
        Commands::Roundtrip {
            file,
            rebuild,
            output,
        } => cmd_roundtrip(&ctx, &file, rebuild, output),

        Commands::Sign {
            file,
            hmac_key,
            key_name,
            digest,
            signature,
            output,
        } => {
            let anchor = match cli.id_attr.first() {
                Some(arg) => parse_id_attr(arg)?,
                None => QName::local("ID"),
            };
            let params = SigningParameters::new(anchor)
                .with_digest(&digest)
                .with_signature(&signature);
            cmd_sign(ctx, &file, &hmac_key, key_name, params, output)
        }

        Commands::Verify {
            file,
            hmac_key,
            key_name,
        } => cmd_verify(&ctx, &file, &hmac_key, key_name),

        Commands::Info => cmd_info(&ctx),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn build_context(cli: &Cli) -> Result<BindingContext, Error> {
    let ctx = BindingContext::new()
        .with_defaults()
        .with_ignore_unknown_elements(cli.ignore_unknown);
    let loader = ConfigurationLoader::default();
    for path in &cli.config {
        loader.load_file(&ctx, path)?;
    }
    for arg in &cli.id_attr {
        ctx.id_attributes().register(parse_id_attr(arg)?);
    }
    Ok(ctx)
}

/// `local`, or `prefix:local=uri` for a namespaced attribute.
fn parse_id_attr(arg: &str) -> Result<QName, Error> {
    let invalid = || Error::Other(format!("invalid id-attr format: {arg} (expected local or prefix:local=uri)"));
    match arg.split_once('=') {
        Some((qualified, uri)) => {
            let (prefix, local) = qualified.split_once(':').ok_or_else(invalid)?;
            if prefix.is_empty() || local.is_empty() || uri.is_empty() {
                return Err(invalid());
            }
            Ok(QName::with_prefix(uri, local, prefix))
        }
        None if arg.is_empty() || arg.contains(':') => Err(invalid()),
        None => Ok(QName::local(arg)),
    }
}

fn cmd_roundtrip(ctx: &BindingContext, file: &Path, rebuild: bool, output: Option<PathBuf>) -> Result<(), Error> {
    let (mut graph, root) = ctx.unmarshall_document(read_document(file)?)?;
    if rebuild {
        graph.release_all();
    }
    ctx.marshall(&mut graph, root)?;
    write_output(output, graph.document().to_document_string()?.as_bytes())
}

fn cmd_sign(
    ctx: BindingContext,
    file: &Path,
    hmac_key: &Path,
    key_name: Option<String>,
    params: SigningParameters,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let mut dsig = DsigContext::new(read_bytes(hmac_key)?);
    dsig.key_name = key_name;
    let ctx = ctx.with_signature_hook(Arc::new(EnvelopedSigner::new(dsig)));

    let (mut graph, root) = ctx.unmarshall_document(read_document(file)?)?;
    graph
        .object_mut::<AnyElement>(root)
        .map_err(|_| Error::Other("the document element is not bound to an AnyElement".into()))?
        .set_signing_parameters(Some(params));
    ctx.marshall(&mut graph, root)?;
    write_output(output, graph.document().to_document_string()?.as_bytes())
}

fn cmd_verify(ctx: &BindingContext, file: &Path, hmac_key: &Path, key_name: Option<String>) -> Result<(), Error> {
    let mut dsig = DsigContext::new(read_bytes(hmac_key)?);
    dsig.key_name = key_name;

    // Unmarshalling flags the registered ID attributes references resolve to.
    let (graph, _) = ctx.unmarshall_document(read_document(file)?)?;
    let results = ulriksdal_dsig::verify_all(&dsig, graph.document())?;
    if results.is_empty() {
        return Err(Error::MissingElement("Signature".into()));
    }

    let mut failed = false;
    for (_, result) in results {
        match result {
            VerifyResult::Valid => println!("OK"),
            VerifyResult::Invalid { reason } => {
                eprintln!("INVALID: {reason}");
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_info(ctx: &BindingContext) -> Result<(), Error> {
    println!("Ulriksdal: typed object/XML binding");
    println!();
    println!("Registered providers:");
    for name in ctx.registry().names() {
        println!("  {name}");
    }
    println!();
    println!("ID attributes:");
    for name in ctx.id_attributes().names() {
        println!("  {name}");
    }
    println!();
    println!("Supported canonicalization:");
    println!("  Exclusive C14N 1.0 (with and without comments)");
    println!();
    println!("Supported digest algorithms:");
    println!("  SHA-1, SHA-256, SHA-384, SHA-512");
    println!();
    println!("Supported signature algorithms:");
    println!("  HMAC (SHA-1, SHA-256, SHA-384, SHA-512)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_document(path: &Path) -> Result<Document, Error> {
    let xml = std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))?;
    Document::parse(&xml)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| Error::Other(format!("{}: {e}", p.display()))),
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}
