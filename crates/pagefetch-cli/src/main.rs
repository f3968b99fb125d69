//! PageFetch CLI - fetch web pages as paginated markdown

mod mcp;

use clap::{Parser, Subcommand, ValueEnum};
use pagefetch::{FetchRequest, FetchResponse, Tool, TOOL_LLMTXT};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Output format for fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// PageFetch - paginated web page fetching for LLM tools
#[derive(Parser, Debug)]
#[command(name = "pagefetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Fetch URL and print one window of its content
    Fetch {
        /// URL to fetch
        url: String,

        /// Maximum number of characters to return
        #[arg(long)]
        max_length: Option<usize>,

        /// Character index to start from
        #[arg(long)]
        start_index: Option<usize>,

        /// Return the content without markdown simplification
        #[arg(long)]
        raw: bool,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,

        /// Fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    match cli.command {
        Some(Commands::Mcp) => {
            mcp::run_server().await;
        }
        Some(Commands::Fetch {
            url,
            max_length,
            start_index,
            raw,
            output,
            user_agent,
            timeout,
        }) => {
            let mut request = FetchRequest::new(url);
            request.max_length = max_length;
            request.start_index = start_index;
            if raw {
                request = request.raw();
            }
            run_fetch(request, output, user_agent, timeout).await;
        }
        None => {
            eprintln!("Usage: pagefetch fetch <URL>");
            eprintln!("   or: pagefetch mcp");
            eprintln!("   or: pagefetch --help");
            std::process::exit(1);
        }
    }
}

/// Log to stderr; stdout carries tool output and MCP messages
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run_fetch(
    request: FetchRequest,
    output: OutputFormat,
    user_agent: Option<String>,
    timeout: Option<u64>,
) {
    let mut builder = Tool::builder();
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(secs) = timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let tool = builder.build();

    match tool.execute(request).await {
        Ok(response) => match output {
            OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&response)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&response).unwrap_or_else(|e| {
                    eprintln!("Error serializing response: {}", e);
                    std::process::exit(1);
                });
                writeln_safe(&json);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Format response as markdown with YAML frontmatter
fn format_md_with_frontmatter(response: &FetchResponse) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", response.url));
    if let Some(ref ct) = response.content_type {
        output.push_str(&format!("source_content_type: {}\n", ct));
    }
    output.push_str(&format!("format: {}\n", response.format));
    output.push_str("---\n");
    output.push_str(&response.content);

    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
