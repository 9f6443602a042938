use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use rfcapture::{CaptureSettings, Capturer, LoaderConfig, StaticPage};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Svg,
    Png,
    Jpeg,
    Pixels,
}

/// Capture an element of an HTML page as an image
#[derive(Debug, Parser)]
#[command(name = "rfcapture", version, about)]
struct Args {
    /// Page URL (http/https) or path to a local HTML file
    source: String,

    /// CSS selector of the element to capture; defaults to the document element
    #[arg(short, long)]
    selector: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Png)]
    format: Format,

    /// Output file; data URIs are printed to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with capture settings; flags override its values
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    bgcolor: Option<String>,

    /// JPEG quality in [0, 1]
    #[arg(long)]
    quality: Option<f32>,

    /// Data URL used when a resource cannot be fetched
    #[arg(long)]
    placeholder: Option<String>,

    #[arg(long)]
    cache_bust: bool,

    /// Fail when a resource cannot be fetched and no placeholder is set
    #[arg(long)]
    strict: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> anyhow::Result<CaptureSettings> {
        let mut settings = match &self.options {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading options from {}", path.display()))?;
                CaptureSettings::from_json(&json)?
            }
            None => CaptureSettings::default(),
        };

        if self.width.is_some() {
            settings.width = self.width;
        }
        if self.height.is_some() {
            settings.height = self.height;
        }
        if self.bgcolor.is_some() {
            settings.bgcolor = self.bgcolor.clone();
        }
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if self.placeholder.is_some() {
            settings.image_placeholder = self.placeholder.clone();
        }
        settings.cache_bust |= self.cache_bust;
        settings.strict_resources |= self.strict;
        Ok(settings)
    }
}

fn load_page(source: &str, config: &LoaderConfig) -> anyhow::Result<StaticPage> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(StaticPage::load_url(source, config)?);
    }
    Ok(StaticPage::from_file(Path::new(source))?)
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display())),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = args.settings()?.into_options();
    let config = LoaderConfig::default();

    // The page is fetched with a blocking client, before the runtime starts
    let page = load_page(&args.source, &config)?;
    let node = match &args.selector {
        Some(selector) => match page.select(selector)? {
            Some(node) => node,
            None => bail!("no element matches {}", selector),
        },
        None => page.root(),
    };

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let capturer = Capturer::with_config(&page, &config)?;
    let output = args.output.as_deref();

    runtime.block_on(async {
        match args.format {
            Format::Svg => {
                let uri = capturer.to_svg(node, &options).await?;
                write_output(output, uri.as_bytes())
            }
            Format::Jpeg => {
                let uri = capturer.to_jpeg(node, &options).await?;
                write_output(output, uri.as_bytes())
            }
            Format::Png if output.is_some() => {
                let blob = capturer.to_blob(node, &options).await?;
                write_output(output, &blob.bytes)
            }
            Format::Png => {
                let uri = capturer.to_png(node, &options).await?;
                write_output(output, uri.as_bytes())
            }
            Format::Pixels => {
                let pixels = capturer.to_pixel_data(node, &options).await?;
                log::info!("captured {} bytes of RGBA data", pixels.len());
                write_output(output, &pixels)
            }
        }
    })
}
