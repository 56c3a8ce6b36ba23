#[macro_use]
extern crate log;

use std::process;

use clap::{Arg, ArgMatches, Command};
use tessel_core::internal::*;
use tessel_tensorflow::prelude::*;

/// Entrypoint for the command-line interface.
fn main() {
    let matches = Command::new("tessel")
        .version(clap::crate_version!())
        .about("Imports a frozen TensorFlow graph and dumps the resulting static graph")
        .arg(Arg::new("model").required(true).help("Path to a frozen GraphDef (.pb)"))
        .arg(
            Arg::new("verbosity")
                .short('v')
                .multiple_occurrences(true)
                .help("Sets the level of verbosity"),
        )
        .arg(Arg::new("quiet").short('q').long("quiet").help("Do not dump the static graph"))
        .arg(
            Arg::new("dump-foreign")
                .long("dump-foreign")
                .help("Dumps the foreign graph as it stands after the rewrite passes"),
        )
        .arg(
            Arg::new("pass-limit")
                .long("pass-limit")
                .takes_value(true)
                .value_name("N")
                .help("Only runs the first N rewrite passes"),
        )
        .get_matches();

    let level = match matches.occurrences_of("verbosity") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::new().filter_or("TESSEL_LOG", level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    if let Err(e) = handle(&matches) {
        error!("{:?}", e);
        process::exit(1)
    }
}

fn handle(matches: &ArgMatches) -> TesselResult<()> {
    let path = matches.value_of("model").context("No model given")?;
    let mut tf = tensorflow();
    if let Some(limit) = matches.value_of("pass-limit") {
        let limit: usize =
            limit.parse().with_context(|| format!("Invalid pass limit {:?}", limit))?;
        info!("Stopping after {} rewrite passes", limit);
        tf = tf.with_optimizer(Optimizer::default().stopping_at(limit));
    }

    let graph_def = tf.graph_def_for_path(path)?;
    info!("Loaded {} ({} nodes)", path, graph_def.node.len());
    if matches.is_present("dump-foreign") {
        println!("{}", tf.foreign_graph(&graph_def)?);
    }

    let model = tf.model_for_graph_def(&graph_def)?;
    info!(
        "Imported {} nodes, {} tensors, {} inputs, {} outputs",
        model.nodes.len(),
        model.tensors.len(),
        model.inputs.len(),
        model.outputs.len()
    );
    if !matches.is_present("quiet") {
        println!("{}", model);
    }
    Ok(())
}
