use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use sat_reductions::{
    ExternalOracle, Graph, MaxCliqueSearch, Oracle, OracleConfig, QueensBoard, SearchStrategy, VarisatOracle, Verdict,
};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Reduce N-Queens and maximum clique to SAT and decide them with a SAT solver.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    oracle: OracleArgs,

    /// More output; repeat for more. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct OracleArgs {
    /// SAT solver executable.
    #[arg(long, global = true, env = "SAT_SOLVER_PATH", default_value = "cryptominisat5")]
    solver: PathBuf,

    /// Argument passed to the solver before the instance path.
    #[arg(long = "solver-arg", global = true, allow_hyphen_values = true, default_values_t = [String::from("--verb=0")])]
    solver_args: Vec<String>,

    /// Give up on a single solver run after this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Directory for temporary instance files.
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Decide instances with the built-in varisat solver instead of running `--solver`.
    #[arg(long, global = true)]
    in_process: bool,
}

impl OracleArgs {
    fn oracle(&self) -> Box<dyn Oracle> {
        if self.in_process {
            return Box::new(VarisatOracle);
        }

        let mut config = OracleConfig::default()
            .with_solver(&self.solver)
            .with_args(&self.solver_args);
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.work_dir {
            config = config.with_work_dir(dir);
        }
        Box::new(ExternalOracle::from(config))
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reduce N-Queens to SAT.
    Nq {
        /// Number of rows and columns.
        #[arg(long, default_value_t = 4)]
        n: usize,

        /// Also run the solver and print the placement it finds.
        #[arg(long)]
        solve: bool,

        /// Where to write the DIMACS instance.
        #[arg(long, default_value = "n_queens.solution")]
        solution_path: PathBuf,
    },
    /// Find the size of the largest clique of each graph in a directory.
    Clq {
        /// Directory of `*.graph` edge lists.
        #[arg(long, default_value = "graph_data")]
        graphs_path: PathBuf,

        /// Where to write one `<graph>: <size>` line per graph.
        #[arg(long, default_value = "max_k_for_graphs.solution")]
        solution_path: PathBuf,

        /// How clique sizes are probed: `linear` from 2 upwards, or `binary` over 1 to the node count.
        #[arg(long, default_value_t = SearchStrategy::Linear)]
        strategy: SearchStrategy,
    },
}

fn queens(oracle: &dyn Oracle, n: usize, solve: bool, solution_path: &Path) -> Result<()> {
    let board = QueensBoard::new(n)?;
    let instance = board.encode();

    let file = File::create(solution_path).with_context(|| format!("creating {}", solution_path.display()))?;
    instance.write_dimacs(BufWriter::new(file)).with_context(|| format!("writing {}", solution_path.display()))?;
    info!(path = %solution_path.display(), clauses = instance.clause_count(), "wrote instance");

    if !solve {
        return Ok(());
    }

    match oracle.solve(&instance)? {
        Verdict::Unsatisfiable => println!("UNSATISFIABLE: no placement of {n} queens"),
        Verdict::Inconclusive => println!("INDETERMINATE: the solver gave up"),
        Verdict::Satisfiable(model) => {
            let placement = board.decode(&model);
            println!("SATISFIABLE");
            println!("variables: {}", placement.variables().iter().join(" "));
            println!("queens: {}", placement.queens().iter().join(" "));
            print!("{placement}");
        }
    }

    Ok(())
}

fn graph_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "graph") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn cliques(oracle: &dyn Oracle, graphs_path: &Path, solution_path: &Path, strategy: SearchStrategy) -> Result<()> {
    let mut lines = Vec::new();
    for path in graph_files(graphs_path)? {
        let graph = Graph::from_path(&path).with_context(|| format!("reading graph {}", path.display()))?;
        let report = MaxCliqueSearch::new(&graph, oracle)
            .with_strategy(strategy)
            .run()
            .with_context(|| format!("searching {}", path.display()))?;

        info!(graph = %path.display(), size = report.size, members = ?report.members, "graph done");
        lines.push(format!("{}: {}\n", path.display(), report.size));
    }

    fs::write(solution_path, lines.concat()).with_context(|| format!("writing {}", solution_path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing the tracing subscriber")?;

    let oracle = cli.oracle.oracle();
    match cli.command {
        Command::Nq { n, solve, solution_path } => queens(oracle.as_ref(), n, solve, &solution_path),
        Command::Clq { graphs_path, solution_path, strategy } => {
            cliques(oracle.as_ref(), &graphs_path, &solution_path, strategy)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use sat_reductions::SearchStrategy;

    use super::{Cli, Command};

    #[test]
    fn command_line_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_clq_flag_is_described() {
        let mut cli = Cli::command();
        let help = cli.find_subcommand_mut("clq").unwrap().render_long_help().to_string();
        assert!(help.contains("How clique sizes are probed"));
    }

    #[test]
    fn strategy_parses() {
        let cli = Cli::try_parse_from(["sat-reductions", "clq", "--strategy", "binary"]).unwrap();
        assert!(matches!(cli.command, Command::Clq { strategy: SearchStrategy::Binary, .. }));
        assert!(Cli::try_parse_from(["sat-reductions", "clq", "--strategy", "ternary"]).is_err());
    }
}
