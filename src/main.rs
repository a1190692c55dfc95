use clap::{Parser, Subcommand};
use page_bake::bake::{BakeTarget, Baker};
use page_bake::collab::{ConfiguredRenderer, JsonRenderer};
use page_bake::dump::DumpStore;
use page_bake::exports::ExportStore;
use page_bake::format::EmbedFallbackFormatter;
use page_bake::{config, output};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bake")]
#[command(about = "Bake CMS pages into static documents")]
#[command(long_about = "\
Bake CMS pages into static documents

Pages are read from a JSON snapshot of the CMS. Embedded visualizations are
checked against the exports directory; stale or missing exports are rendered
with the configured command before the page is baked, and any export that
cannot be produced in time is left out.

  bake page energy                 # page or post by slug
  bake post 1234 --preview         # latest revision of post 1234
  bake blog 2 --out blog/2.html    # second page of the blog listing
  bake charts                      # visualization catalog
  bake exports                     # list the current export table

The baked document goes to stdout (or --out); summaries and logs go to
stderr. Set RUST_LOG=page_bake=debug for detail.

Run 'bake gen-config' to generate a documented bake.toml.")]
#[command(version)]
struct Cli {
    /// CMS snapshot to bake from
    #[arg(long, default_value = "cms.json", global = true)]
    dump: PathBuf,

    /// Config file (stock defaults when absent)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Write the document to this file instead of stdout
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bake a page or post by slug
    Page { slug: String },
    /// Bake a page or post by id
    Post {
        id: u64,
        /// Bake the latest revision instead of the published version
        #[arg(long)]
        preview: bool,
    },
    /// Bake the visualization catalog
    Charts,
    /// Bake one page of the blog listing
    Blog {
        #[arg(default_value_t = 1)]
        page_num: usize,
    },
    /// Bake the front page
    Front,
    /// Bake the subscribe page
    Subscribe,
    /// Print the category menu as JSON
    Menu,
    /// List the current export table
    Exports,
    /// Print a stock bake.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "page_bake=info,bake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let list_exports = matches!(cli.command, Command::Exports);

    let target = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Page { slug } => Some(BakeTarget::Slug(slug)),
        Command::Post { id, preview: true } => Some(BakeTarget::Preview(id)),
        Command::Post { id, preview: false } => Some(BakeTarget::Id(id)),
        Command::Charts => Some(BakeTarget::Charts),
        Command::Blog { page_num } => Some(BakeTarget::Blog(page_num)),
        Command::Front => Some(BakeTarget::Front),
        Command::Subscribe => Some(BakeTarget::Subscribe),
        Command::Menu | Command::Exports => None,
    };

    let config = config::load_config(&cli.config)?;
    let renderer = ConfiguredRenderer::from_command(config.exports.render_command.as_deref());
    let exports = ExportStore::new(&config.exports.dir, &config.exports.base_url, renderer)
        .with_render_timeout(config.exports.render_timeout());

    if list_exports {
        output::print_export_table(&exports.lookup_all().await);
        return Ok(());
    }

    let store = DumpStore::load(&cli.dump).await?;
    let formatter = EmbedFallbackFormatter::new(&config.visualization_route);
    let baker = Baker::new(&store, &store, exports, formatter, JsonRenderer, config);

    let document = match target {
        Some(target) => {
            let page = baker.model(&target).await.inspect_err(|e| {
                tracing::error!(error = %e, retryable = e.is_retryable(), "bake failed");
            })?;
            output::print_page_summary(&page);
            baker.document(&page)
        }
        None => baker.render_menu_json().await?,
    };

    match cli.out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &document).await?;
            eprintln!("{}", output::format_written(&path, document.len()));
        }
        None => println!("{}", document),
    }

    Ok(())
}
