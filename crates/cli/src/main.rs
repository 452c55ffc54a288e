mod config;

use anyhow::Context as _;
use apiroute_http::{
    ApiClient, ApiError, ApiRequest, CacheMode, RequestMethod, RequestParams, Revalidate,
    TransportOptions,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "apiroute", version, about = "Resolve and call named API routes")]
struct Cli {
    /// Route catalog (YAML or JSON).
    #[arg(long, env = "APIROUTE_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    /// Base URL prepended to every route template. Takes precedence over `API_BASE`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the URL a path key resolves to.
    Resolve(TargetArgs),
    /// Dispatch a request and print the JSON result.
    Call(CallArgs),
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Logical path key.
    key: String,

    /// Path parameter (`name=value`), repeatable.
    #[arg(long = "path", value_parser = parse_pair)]
    path_params: Vec<(String, String)>,

    /// Query parameter (`name=value`), repeatable.
    #[arg(long = "query", value_parser = parse_pair)]
    query_params: Vec<(String, String)>,
}

impl TargetArgs {
    fn params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        for (k, v) in &self.path_params {
            params = params.path(k.clone(), v.clone());
        }
        for (k, v) in &self.query_params {
            params = params.query(k.clone(), v.clone());
        }
        params
    }
}

#[derive(Debug, Args)]
struct CallArgs {
    #[command(flatten)]
    target: TargetArgs,

    #[arg(long, default_value = "GET")]
    method: RequestMethod,

    /// Skip stubs and always hit the network.
    #[arg(long)]
    live: bool,

    /// Report non-success responses with their status and body.
    #[arg(long)]
    custom_errors: bool,

    /// JSON payload sent as the request body.
    #[arg(long, value_parser = parse_json)]
    payload: Option<Value>,

    #[arg(long, value_enum)]
    cache: Option<CacheArg>,

    /// Seconds, or `false` to never revalidate.
    #[arg(long, value_parser = parse_revalidate)]
    revalidate: Option<Revalidate>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CacheArg {
    NoStore,
    ForceCache,
}

impl From<CacheArg> for CacheMode {
    fn from(value: CacheArg) -> Self {
        match value {
            CacheArg::NoStore => CacheMode::NoStore,
            CacheArg::ForceCache => CacheMode::ForceCache,
        }
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    if k.is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    Ok((k.to_string(), v.to_string()))
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON payload: {e}"))
}

fn parse_revalidate(s: &str) -> Result<Revalidate, String> {
    if s.eq_ignore_ascii_case("false") {
        return Ok(Revalidate::Never);
    }
    s.parse::<u64>()
        .map(Revalidate::After)
        .map_err(|_| format!("expected seconds or 'false', got '{s}'"))
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let catalog_path = match cli.catalog {
        Some(p) => p,
        None => config::default_catalog_path()?,
    };
    let mut cfg = config::load_catalog(&catalog_path)?.with_env_overrides();
    if let Some(base) = cli.base_url {
        cfg.base_url = base;
    }
    let client = ApiClient::new(cfg).context("build HTTP client")?;

    match cli.command {
        Command::Resolve(target) => {
            let url = client
                .resolve_url(&target.key, &target.params())
                .ok_or(ApiError::MissingUrl)?;
            println!("{url}");
        }
        Command::Call(args) => {
            let mut transport = TransportOptions::default();
            if let Some(cache) = args.cache {
                transport = transport.with_cache(cache.into());
            }
            if let Some(revalidate) = args.revalidate {
                transport = transport.with_revalidate(revalidate);
            }

            let mut request = ApiRequest::new(args.target.key.clone())
                .params(args.target.params())
                .transport(transport)
                .method(args.method)
                .use_mock(!args.live)
                .custom_error_handler(args.custom_errors);
            if let Some(payload) = args.payload {
                request = request.payload(payload);
            }

            let value = match client.dispatch(&request).await {
                Ok(v) => v,
                Err(ApiError::Soft(failure)) => {
                    eprintln!("{}", failure.body);
                    anyhow::bail!(
                        "{} {} returned {}",
                        request.method,
                        failure.url,
                        failure.status
                    );
                }
                Err(e) => return Err(e).with_context(|| format!("call '{}'", request.key)),
            };
            let text = serde_json::to_string_pretty(&value).context("serialize response")?;
            println!("{text}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pair_splits_on_first_equals() {
        assert_eq!(
            parse_pair("q=a=b").expect("pair"),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn parse_revalidate_accepts_seconds_or_false() {
        assert_eq!(parse_revalidate("60"), Ok(Revalidate::After(60)));
        assert_eq!(parse_revalidate("false"), Ok(Revalidate::Never));
        assert!(parse_revalidate("soon").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }

    #[test]
    fn call_args_build_request_params() {
        let cli = Cli::try_parse_from([
            "apiroute", "call", "user", "--path", "id=7", "--query", "a=1", "--method", "post",
            "--live",
        ])
        .expect("parse");
        let Command::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.method, RequestMethod::Post);
        assert!(args.live);
        let params = args.target.params();
        assert_eq!(
            params.path_params.and_then(|p| p.get("id").cloned()),
            Some(Value::String("7".to_string()))
        );
    }
}
