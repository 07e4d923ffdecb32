use crate::config::{Viewport, load_config};
use crate::expansion::ExpansionOutcome;
use crate::layout_dump::write_layout_dump;
use crate::model::{ExpansionPayload, GraphPayload};
use crate::session::{GraphOrigin, Session};
use crate::source::{
    ExpansionRequest, FetchError, GraphSource, RecordedSource, SampleSource,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "constellation",
    version,
    about = "Radial layout and expansion of LLM-generated knowledge graphs"
)]
pub struct Args {
    /// Completion text or graph JSON, '-' for stdin. Uses the sample graph if omitted.
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout JSON. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Viewport height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Prompt recorded in the graph metadata
    #[arg(short = 'p', long = "prompt", default_value = "knowledge graph")]
    pub prompt: String,

    /// Node to expand; repeat to expand several nodes in order
    #[arg(short = 'x', long = "expand")]
    pub expand: Vec<u64>,

    /// Expansion kind (e.g. theory, practical)
    #[arg(short = 'k', long = "kind", default_value = ExpansionRequest::DEFAULT_KIND)]
    pub kind: String,

    /// Nodes requested per expansion
    #[arg(short = 'l', long = "limit", default_value_t = ExpansionRequest::DEFAULT_LIMIT)]
    pub limit: usize,

    /// JSON object of recorded expansions keyed by node id
    #[arg(short = 'e', long = "expansions")]
    pub expansions: Option<PathBuf>,

    /// Cluster to highlight
    #[arg(short = 'a', long = "active-cluster")]
    pub active_cluster: Option<String>,

    /// Re-layout every subtree with wide spacing
    #[arg(short = 'r', long = "redistribute")]
    pub redistribute: bool,
}

/// Recorded responses first; nodes without a recording get the sample expansion.
struct CliSource {
    recorded: RecordedSource,
    sample: SampleSource,
}

impl GraphSource for CliSource {
    fn fetch_graph(&mut self, prompt: &str) -> Result<GraphPayload, FetchError> {
        self.recorded.fetch_graph(prompt)
    }

    fn fetch_expansion(&mut self, request: &ExpansionRequest) -> Result<ExpansionPayload, FetchError> {
        match self.recorded.fetch_expansion(request) {
            Err(FetchError::NotRecorded(_)) => self.sample.fetch_expansion(request),
            other => other,
        }
    }
}

pub fn run() -> Result<()> {
    run_with(Args::parse())
}

pub fn run_with(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.viewport = Viewport::new(
        args.width.unwrap_or(config.viewport.width),
        args.height.unwrap_or(config.viewport.height),
    );

    let mut recorded = match args.input.as_deref() {
        Some(path) => RecordedSource::from_completion(read_input(path)?),
        None => RecordedSource::new(),
    };
    if let Some(path) = args.expansions.as_deref() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read expansions from {}", path.display()))?;
        recorded = recorded.with_recorded_expansions(&text)?;
    }
    let mut source = CliSource {
        recorded,
        sample: SampleSource,
    };

    let mut session = Session::new(config);
    let origin = session.generate(&args.prompt, &mut source)?;
    if origin == GraphOrigin::Sample && args.input.is_some() {
        warn!("input could not be used, laid out the sample graph instead");
    }

    for &node in &args.expand {
        let request = ExpansionRequest::new(node)
            .with_kind(args.kind.as_str())
            .with_limit(args.limit);
        match session.expand(request, &mut source)? {
            ExpansionOutcome::Merged(report) => {
                info!(node, added = report.added_nodes.len(), "expanded node");
            }
            ExpansionOutcome::Skipped => warn!(node, "node already expanded, skipped"),
            ExpansionOutcome::Discarded => warn!(node, "expansion result discarded"),
        }
    }

    if let Some(cluster) = args.active_cluster.as_deref() {
        session.toggle_cluster(cluster);
    }
    if args.redistribute {
        session.redistribute();
    }

    write_layout_dump(args.output.as_deref(), session.layout(), session.metadata())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_expansions() {
        let args = Args::try_parse_from([
            "constellation",
            "-i",
            "graph.txt",
            "--expand",
            "1",
            "--expand",
            "4",
            "--kind",
            "practical",
            "--redistribute",
        ])
        .expect("valid arguments");
        assert_eq!(args.expand, vec![1, 4]);
        assert_eq!(args.kind, "practical");
        assert_eq!(args.limit, ExpansionRequest::DEFAULT_LIMIT);
        assert!(args.redistribute);
        assert!(args.width.is_none());
    }

    #[test]
    fn unrecorded_expansions_use_the_sample() {
        let mut source = CliSource {
            recorded: RecordedSource::new()
                .with_expansion(2, r#"{"nodes": [{"id": 21, "label": "Recorded"}], "edges": []}"#),
            sample: SampleSource,
        };
        let recorded = source
            .fetch_expansion(&ExpansionRequest::new(2))
            .expect("recorded");
        assert_eq!(recorded.nodes[0].label, "Recorded");
        let sampled = source
            .fetch_expansion(&ExpansionRequest::new(1))
            .expect("sample");
        assert_eq!(sampled.nodes.len(), 3);
        assert!(source.fetch_graph("p").is_err());
    }

    #[test]
    fn writes_layout_for_sample_graph() {
        let dir = std::env::temp_dir().join(format!("constellation-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let output = dir.join("layout.json");
        let args = Args::try_parse_from([
            "constellation",
            "-o",
            output.to_str().expect("utf-8 temp path"),
            "-w",
            "1000",
            "--expand",
            "1",
            "--active-cluster",
            "c2",
        ])
        .expect("valid arguments");
        run_with(args).expect("cli run");

        let dump: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("output written"))
                .expect("valid json");
        assert_eq!(dump["width"], 1000.0);
        assert_eq!(dump["nodes"].as_array().map(Vec::len), Some(13));
        assert_eq!(dump["activeCluster"], "c2");
        std::fs::remove_dir_all(&dir).ok();
    }
}
