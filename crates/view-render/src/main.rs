/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render a single view from a template directory
 */

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use view_template::config::{SUFFIX_KEY, TEMPLATE_ROOT_KEY};
use view_template::{
    BufferedResponse, EngineConfig, Layered, Model, ModelAndView, ProcessEnv, RequestContext, Value,
    ViewRenderer, WebContext,
};

#[derive(Parser, Debug)]
#[command(name = "view-render")]
#[command(about = "Render a single view from a template directory")]
struct Args {
    /// View name: `page`, `page#block` or `redirect:/somewhere`
    #[arg(value_name = "VIEW")]
    view: String,

    /// Template root directory (overrides template.root)
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// JSON file whose top-level object is merged into the model
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Model variable; VALUE is parsed as JSON, falling back to a string
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    set: Vec<(String, String)>,

    /// Request attribute; VALUE is parsed like --set
    #[arg(short, long = "attr", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    attr: Vec<(String, String)>,

    /// Engine configuration override (takes precedence over the environment)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    define: Vec<(String, String)>,

    /// Request URI
    #[arg(long, default_value = "/")]
    uri: String,

    /// Request method
    #[arg(long, default_value = "GET")]
    method: String,

    /// Request query string
    #[arg(long)]
    query: Option<String>,

    /// Template suffix (overrides template.suffix)
    #[arg(long)]
    suffix: Option<String>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = match args.verbose {
        0 => "view_render=info,view_template=warn",
        1 => "view_render=debug,view_template=debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = engine_config(&args);
    debug!(?config, "Engine configuration");
    let renderer = ViewRenderer::from_config(&config).with_context(|| {
        format!(
            "Failed to load templates from {}",
            config.template_root.display()
        )
    })?;

    let mav = build_model(&args)?;
    let mut request = RequestContext::new(args.method.clone(), args.uri.clone());
    if let Some(query) = &args.query {
        request = request.with_query_string(query.clone());
    }
    for (key, value) in &args.attr {
        request = request.with_attribute(key.clone(), parse_value(value));
    }

    let mut response = BufferedResponse::new();
    {
        let mut cx = WebContext::new(request, &mut response);
        match &args.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                renderer.render(&mav, &mut cx, BufWriter::new(file))?;
                info!(view = %args.view, output = %path.display(), "Rendered view");
            }
            None => renderer.render(&mav, &mut cx, io::stdout())?,
        }
    }

    if let Some(location) = response.location() {
        eprintln!("redirect: {location}");
    }

    Ok(())
}

/// Resolve engine configuration: command-line defines, then the process
/// environment, then built-in defaults. `--root` and `--suffix` win over all.
fn engine_config(args: &Args) -> EngineConfig {
    let mut defines: BTreeMap<String, String> = args.define.iter().cloned().collect();
    if let Some(root) = &args.root {
        defines.insert(TEMPLATE_ROOT_KEY.to_string(), root.display().to_string());
    }
    if let Some(suffix) = &args.suffix {
        defines.insert(SUFFIX_KEY.to_string(), suffix.clone());
    }

    let mut lookup = Layered::new();
    lookup.push(&defines).push(&ProcessEnv);
    EngineConfig::from_lookup(&lookup)
}

fn build_model(args: &Args) -> Result<ModelAndView> {
    let mut model = Model::new();

    if let Some(path) = &args.model {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
        let serde_json::Value::Object(fields) = json else {
            anyhow::bail!("Model file must contain a JSON object: {}", path.display());
        };
        model.extend(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), Value::from_serialize(value))),
        );
    }

    for (key, value) in &args.set {
        model.insert(key.clone(), parse_value(value));
    }

    Ok(ModelAndView::with_model(args.view.clone(), model))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a command-line value as JSON, keeping it as a string otherwise.
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_serialize(&json),
        Err(_) => Value::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert_eq!(
            parse_key_value("flag=").unwrap(),
            ("flag".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Value::from(42));
        assert_eq!(parse_value("true"), Value::from(true));
        assert_eq!(parse_value("hello"), Value::from("hello"));
        assert_eq!(parse_value("[1,2]").len(), Some(2));
    }

    #[test]
    fn test_engine_config_precedence() {
        let args = Args::parse_from([
            "view-render",
            "index",
            "--root",
            "site/templates",
            "-D",
            "template.suffix=.tpl",
            "-D",
            "template.statement.start=<%",
            "-D",
            "template.statement.end=%>",
        ]);
        let config = engine_config(&args);
        assert_eq!(config.template_root, PathBuf::from("site/templates"));
        assert_eq!(config.suffix, ".tpl");
        assert_eq!(config.statement_start, "<%");
        assert_eq!(config.statement_end, "%>");

        let args = Args::parse_from(["view-render", "index", "-D", "template.suffix=.tpl", "--suffix", ".htm"]);
        assert_eq!(engine_config(&args).suffix, ".htm");
    }

    #[test]
    fn test_build_model_from_set() {
        let args = Args::parse_from(["view-render", "index", "-s", "n=3", "-s", "name=ana"]);
        let mav = build_model(&args).unwrap();
        assert_eq!(mav.view(), "index");
        assert_eq!(mav.model().get("n"), Some(&Value::from(3)));
        assert_eq!(mav.model().get("name"), Some(&Value::from("ana")));
    }

    #[test]
    fn test_build_model_set_overrides_model_file() {
        let path = std::env::temp_dir().join(format!("view-render-model-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"title": "Home", "n": 1}"#).unwrap();

        let args = Args::parse_from([
            "view-render",
            "index",
            "--model",
            path.to_str().unwrap(),
            "-s",
            "n=2",
        ]);
        let mav = build_model(&args);
        std::fs::remove_file(&path).unwrap();

        let mav = mav.unwrap();
        assert_eq!(mav.model().get("title"), Some(&Value::from("Home")));
        assert_eq!(mav.model().get("n"), Some(&Value::from(2)));
    }
}
