//! Subcommand modules for the `gisa` binary.

use clap::*;

use gisa::libs::config::Config;

pub mod bins;
pub mod build;
pub mod gi;
pub mod query;

/// Chain inputs and processing options shared by every subcommand.
pub fn input_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("infiles")
            .required(true)
            .num_args(1..)
            .index(1)
            .help("Chain files (.pdb, .ent, .tsv, optionally .gz) or directories"),
    )
    .arg(
        Arg::new("full")
            .long("full")
            .action(ArgAction::SetTrue)
            .help("Aggregate every sub-chain (full simplex), not only the corner"),
    )
    .arg(
        Arg::new("min_len")
            .long("min-len")
            .num_args(1)
            .default_value("10")
            .value_parser(value_parser!(usize))
            .help("Skip chains with fewer points"),
    )
    .arg(
        Arg::new("parallel")
            .long("parallel")
            .short('p')
            .num_args(1)
            .default_value("1")
            .value_parser(value_parser!(usize))
            .help("Number of threads for parallel processing"),
    )
}

/// Which invariants to aggregate.
pub fn order_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("order")
            .long("order")
            .num_args(1)
            .default_value("2")
            .value_parser(value_parser!(usize))
            .help("Highest invariant order, 1 to 3"),
    )
    .arg(
        Arg::new("abs")
            .long("abs")
            .action(ArgAction::SetTrue)
            .help("Also compute the absolute-value variants"),
    )
}

/// Window length.
pub fn length_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("window")
            .long("window")
            .short('w')
            .num_args(1)
            .default_value("16")
            .value_parser(value_parser!(usize))
            .help("Window length in points"),
    )
}

/// How windows and pairs are laid out.
pub fn window_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("stride")
            .long("stride")
            .short('s')
            .num_args(1)
            .default_value("2")
            .value_parser(value_parser!(usize))
            .help("Distance between window starts"),
    )
    .arg(
        Arg::new("covering")
            .long("covering")
            .num_args(1)
            .default_value("stride")
            .value_parser(["stride", "stretch", "spread"])
            .help("How windows are laid over a chain"),
    )
    .arg(
        Arg::new("overlapping")
            .long("overlapping")
            .action(ArgAction::SetTrue)
            .help("Also pair overlapping windows (and each window with itself)"),
    )
}

/// A `Config` from whichever shared arguments the subcommand offers; the
/// rest keep their defaults.
pub fn config_from(args: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = Config {
        full_simplex: args.get_flag("full"),
        min_chain_length: *args.get_one::<usize>("min_len").unwrap(),
        ..Default::default()
    };
    if let Ok(Some(order)) = args.try_get_one::<usize>("order") {
        config.order = *order;
        config.include_abs = args.get_flag("abs");
    }
    if let Ok(Some(window)) = args.try_get_one::<usize>("window") {
        config.window_length = *window;
    }
    if let Ok(Some(stride)) = args.try_get_one::<usize>("stride") {
        config.stride = *stride;
        config.covering = args.get_one::<String>("covering").unwrap().parse()?;
        config.disjoint_pairs_only = !args.get_flag("overlapping");
    }
    Ok(config)
}

/// Sets the global rayon pool.
pub fn set_parallel(args: &ArgMatches) -> anyhow::Result<()> {
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;
    Ok(())
}
