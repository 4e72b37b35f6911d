use clap::Parser;
use coflop::{interpret, logger, LoadMatrix, MilpSolver, PlacementModel, Solver};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

/// Command line options for the placement optimizer. The load matrix is
/// a plain CSV file with one row per node and one field per partition;
/// its declared shape must match `--nodes` x `--partitions`. For
/// example, a 4-node cluster with 60 partitions:
///  ./coflop --nodes=4 --partitions=60 --matrix=loads.csv
///
/// Note: the optimizer prints the 0/1 assignment grid and the node-to-
///   node communication matrix as CSV rows, followed by the solve time,
///   retained-vs-total volume, locality ratio, and the max sent/received
///   objective.
///
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of nodes in the cluster
    #[arg(short, long, value_name = "NUM")]
    nodes: usize,

    /// Number of data partitions to place
    #[arg(short, long, value_name = "NUM")]
    partitions: usize,

    /// Path to the CSV load matrix, one row per node
    #[arg(short, long, value_name = "FILE")]
    matrix: PathBuf,

    /// Write a YAML report of the computed placement
    #[arg(short, long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Verbosity
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Verbosity of generated output?
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/**
 * Main entry-point: load the matrix, build the min-max placement model,
 * solve it, and report the interpreted placement.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();
    let level: String = args.log_level.unwrap_or("info".to_string());
    logger::configure(level.as_str(), args.verbose > 0)?;

    let loads = LoadMatrix::from_csv(&args.matrix, args.nodes, args.partitions)?;
    info!(
        "placing {} partitions across {} nodes, total volume {}",
        loads.partitions(),
        loads.nodes(),
        loads.total()
    );
    if args.verbose > 1 {
        print!("{}", loads);
    }

    let model = PlacementModel::build(&loads);
    debug!(
        "model has {} variables and {} constraints",
        model.var_count(),
        model.constraints().len()
    );

    let solver = MilpSolver::single_threaded();
    let outcome = solver.solve(&model);
    let placement = interpret(&loads, &model, &outcome)?;

    print!("{}", placement.assignment_grid());
    print!("{}", placement.comm());

    println!("scheduling time is {:.3} secs", placement.runtime().as_secs_f64());
    println!(
        "retained/total is {} {}",
        placement.retained(),
        placement.total()
    );
    println!("data locality is {}", placement.locality());
    println!("max sent/received is {}", placement.bottleneck());

    if let Some(path) = args.report {
        let yaml = serde_yaml::to_string(&placement.report())?;
        fs::write(&path, yaml)?;
        info!("wrote placement report to {}", path.display());
    }

    Ok(())
}
