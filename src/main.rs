use clap::Parser;

use boussinesq::{loader, post_processor, solver};

/// Computes Boussinesq compliance rows for a triangulated surface
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input json with metadata, mesh and evaluation points
    input_json: String,

    /// Output csv for the compliance rows
    #[arg(short, long, default_value = "compliance.csv")]
    output: String,

    /// Only compute the row of this mesh node
    #[arg(long)]
    node: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(err) = run(&args) {
        log::error!("{err}");
        std::process::exit(1)
    }
}

fn run(args: &Args) -> Result<(), boussinesq::BoussinesqError> {
    let (mesh, mut eval_points, model_metadata) = loader::run(&args.input_json)?;

    if let Some(node) = args.node {
        let point = mesh.nodes().get(node).copied().ok_or_else(|| {
            boussinesq::BoussinesqError::Input(format!(
                "Node {node} is out of range for a mesh with {} nodes",
                mesh.num_nodes()
            ))
        })?;
        eval_points = vec![point];
    }

    let compliance_matrix = solver::run(&mesh, &eval_points, &model_metadata)?;
    post_processor::csv_output(&compliance_matrix, &eval_points, &args.output)?;

    Ok(())
}
