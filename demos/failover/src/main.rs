use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use sdnctl_core::{testing, Controller, FlowId, LinkOpts, Mbps};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology file (JSON or Dhall). Defaults to the six-switch sample topology
    #[arg(short, long)]
    topology: Option<PathBuf>,

    /// File with one command per line. Defaults to two sample flows and a link failure
    #[arg(short, long)]
    script: Option<PathBuf>,
}

type Handler = fn(&mut Controller, &[&str]) -> anyhow::Result<()>;

const COMMANDS: &[(&str, Handler)] = &[
    ("add_node", add_node),
    ("remove_node", remove_node),
    ("add_link", add_link),
    ("remove_link", remove_link),
    ("add_flow", add_flow),
    ("remove_flow", remove_flow),
    ("simulate_failure", simulate_failure),
    ("show", show),
];

const DEFAULT_SCRIPT: &str = "\
add_flow s1 s6 5 2
add_flow s3 s4 2 1
show
simulate_failure s2 s4
show
";

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut ctl = match &args.topology {
        Some(path) => sdnctl_utils::read_controller(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => testing::sample_controller()?,
    };
    info!(
        "controller ready with {} nodes and {} links",
        ctl.stats().total_nodes(),
        ctl.stats().total_links()
    );

    let script = match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => DEFAULT_SCRIPT.to_owned(),
    };
    for (lineno, line) in script.lines().enumerate() {
        let words = line.split_whitespace().collect::<Vec<_>>();
        let Some((&name, rest)) = words.split_first() else {
            continue;
        };
        if name.starts_with('#') {
            continue;
        }
        // A failed command is reported and the script carries on
        if let Err(e) = dispatch(&mut ctl, name, rest) {
            eprintln!("line {}: {name}: {e:#}", lineno + 1);
        }
    }
    Ok(())
}

fn dispatch(ctl: &mut Controller, name: &str, args: &[&str]) -> anyhow::Result<()> {
    let (_, handler) = COMMANDS
        .iter()
        .find(|(cmd, _)| *cmd == name)
        .ok_or_else(|| anyhow::anyhow!("unknown command"))?;
    handler(ctl, args)
}

fn arg<'a>(args: &[&'a str], i: usize, what: &str) -> anyhow::Result<&'a str> {
    args.get(i)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("missing {what}"))
}

fn parse_or<T>(args: &[&str], i: usize, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.get(i) {
        Some(s) => Ok(s.parse()?),
        None => Ok(default),
    }
}

fn add_node(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    Ok(ctl.add_node(arg(args, 0, "node")?)?)
}

fn remove_node(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    Ok(ctl.remove_node(arg(args, 0, "node")?)?)
}

fn add_link(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    let defaults = LinkOpts::default();
    let opts = LinkOpts {
        capacity: parse_or(args, 2, defaults.capacity)?,
        weight: parse_or(args, 3, defaults.weight)?,
        delay: parse_or(args, 4, defaults.delay)?,
        ..defaults
    };
    let (src, dst) = (arg(args, 0, "source")?, arg(args, 1, "destination")?);
    Ok(ctl.add_link(src, dst, opts)?)
}

fn remove_link(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    let (src, dst) = (arg(args, 0, "source")?, arg(args, 1, "destination")?);
    Ok(ctl.remove_link(src, dst)?)
}

fn add_flow(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    let flow = ctl.add_flow(
        arg(args, 0, "source")?,
        arg(args, 1, "destination")?,
        parse_or(args, 2, 0)?,
        parse_or(args, 3, Mbps::ONE)?,
    )?;
    match flow.backup_path() {
        Some(backup) => println!("{flow}: primary {}, backup {backup}", flow.path()),
        None => println!("{flow}: primary {}, no backup", flow.path()),
    }
    Ok(())
}

fn remove_flow(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    let id: FlowId = arg(args, 0, "flow ID")?.parse()?;
    ctl.remove_flow(id)?;
    Ok(())
}

fn simulate_failure(ctl: &mut Controller, args: &[&str]) -> anyhow::Result<()> {
    let (src, dst) = (arg(args, 0, "source")?, arg(args, 1, "destination")?);
    let outcome = ctl.simulate_link_failure(src, dst)?;
    for (id, state) in outcome {
        println!("flow {id}: {state:?}");
    }
    Ok(())
}

fn show(ctl: &mut Controller, _args: &[&str]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&ctl.snapshot())?);
    Ok(())
}
