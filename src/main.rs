use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Result, anyhow};
use caption_translator::{App, Config, Language, OutputFormat};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "caption-translator",
    version,
    about = "Caption an image, translate the caption and fetch its narration"
)]
struct Cli {
    /// Image to upload (.png, .jpg, .jpeg)
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Target language (English, Hindi, Tamil, Telugu, Marathi, Kannada)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Service base URL (overrides settings and CAPTION_TRANSLATOR_BASE_URL)
    #[arg(long = "base-url")]
    base_url: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Output format for the result view
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the rendered view to a file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Download the stored image and narration into this directory
    #[arg(long = "save-assets")]
    save_assets: Option<String>,

    /// Show supported target languages and exit
    #[arg(long = "show-languages")]
    show_languages: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            file: self.file.clone(),
            lang: self.lang.clone(),
            base_url: self.base_url.clone(),
            settings_path: self.read_settings.clone(),
            format: self.format,
            output: self.output.clone(),
            save_assets: self.save_assets.clone(),
            show_languages: self.show_languages,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    caption_translator::logging::init(cli.verbose)?;
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let output = caption_translator::run(cli.config()).await?;
    println!("{}", output);
    Ok(())
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let mut app = caption_translator::load_app(&cli.config())?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    print!("{}", caption_translator::view::render_text(&app.view())?);

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match handle_interactive_command(input, &mut app).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("error: {:#}", err),
        }
    }
    Ok(())
}

async fn handle_interactive_command(input: &str, app: &mut App) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/show" {
        print!("{}", caption_translator::view::render_text(&app.view())?);
        return Ok(false);
    }
    if trimmed == "/languages" {
        for lang in Language::ALL {
            println!("  {:<8} {}", lang.as_str(), lang.autonym());
        }
        return Ok(false);
    }
    if trimmed == "/submit" {
        println!("[{}]", caption_translator::view::PROCESSING_LABEL);
        match app.submit().await {
            Ok(()) => print!("{}", caption_translator::view::render_text(&app.view())?),
            Err(notice) => eprintln!("{}", notice),
        }
        return Ok(false);
    }
    if trimmed == "/reset" {
        app.form.reset();
        print!("{}", caption_translator::view::render_text(&app.view())?);
        return Ok(false);
    }

    if let Some(arg) = trimmed.strip_prefix("/file") {
        let value = arg.trim();
        if value.is_empty() {
            println!(
                "file: {}",
                app.form.file().map(|f| f.name.as_str()).unwrap_or("(none)")
            );
        } else {
            app.select_file_path(Path::new(value))?;
            println!("file set to {}", value);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/lang") {
        let value = arg.trim();
        if value.is_empty() {
            println!("lang: {}", app.form.language());
        } else {
            let lang: Language = value.parse()?;
            app.form.select_language(lang);
            println!("lang set to {}", lang);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/save-assets") {
        let value = arg.trim();
        if value.is_empty() {
            return Err(anyhow!("usage: /save-assets <dir>"));
        }
        for path in app.save_assets(Path::new(value)).await? {
            println!("saved: {}", path.display());
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/html") {
        let value = arg.trim();
        if value.is_empty() {
            return Err(anyhow!("usage: /html <path>"));
        }
        let html = caption_translator::format_view(&app.view(), OutputFormat::Html)?;
        std::fs::write(value, html)?;
        println!("wrote {}", value);
        return Ok(false);
    }

    eprintln!("unknown command: {}", trimmed);
    Ok(false)
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit          Exit interactive mode");
    println!("  /file <path>          Select the image to upload (or show current)");
    println!("  /lang <language>      Set target language (or show current)");
    println!("  /languages            Show supported languages");
    println!("  /submit               Upload and process the selected image");
    println!("  /reset                Clear the result and upload another image");
    println!("  /show                 Show the form and the current result");
    println!("  /save-assets <dir>    Download the stored image and narration");
    println!("  /html <path>          Write the current view as an HTML page");
}
