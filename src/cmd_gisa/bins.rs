use clap::*;

use gisa::libs::config::{Config, QueryMode};
use gisa::libs::db::{write_bins, Database};
use gisa::libs::pipeline::fit_bins;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("bins")
        .about("Fits letter bins on a database")
        .after_help(
            r###"
This command fits the bins `gisa query` would fit on a database and writes them as a bins file,
one line per letter dimension with tab separated inner boundaries (`-` for a single bin).

Fixing the bins lets several databases, or a database and its later extensions, share one
alphabet: pass the file to `gisa query --window-bins` or `--pair-bins`.

Examples:
1. Bins of pair letters in mutual mode:
   gisa bins db.tsv -o pairs.bins

2. Bins of window letters in full mode, 16 equal-width bins:
   gisa bins db.tsv --units windows --mode full --bins 16 --scheme width -o windows.bins

"###,
        )
        .arg(
            Arg::new("db")
                .required(true)
                .index(1)
                .help("Database written by `gisa build`"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .num_args(1)
                .default_value("mutual")
                .value_parser(["mutual", "mutual-abs", "full"])
                .help("Which invariants make up the letters"),
        )
        .arg(
            Arg::new("units")
                .long("units")
                .num_args(1)
                .default_value("pairs")
                .value_parser(["windows", "pairs"])
                .help("Fit window or pair letters"),
        )
        .arg(
            Arg::new("bins")
                .long("bins")
                .num_args(1)
                .default_value("8")
                .value_parser(value_parser!(usize))
                .help("Bins per dimension"),
        )
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .num_args(1)
                .default_value("population")
                .value_parser(["width", "population"])
                .help("Equal-width or equal-population bins"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let db = Database::read(args.get_one::<String>("db").unwrap())?;
    let mode: QueryMode = args.get_one::<String>("mode").unwrap().parse()?;
    let pair_units = args.get_one::<String>("units").unwrap() == "pairs";

    let config = Config {
        order: db.header.order,
        include_abs: db.header.include_abs,
        window_length: db.header.window_length,
        nr_of_bins: *args.get_one::<usize>("bins").unwrap(),
        bin_scheme: args.get_one::<String>("scheme").unwrap().parse()?,
        ..Default::default()
    };
    config.validate()?;

    let binner = fit_bins(&config, &db, mode, pair_units)?;
    write_bins(&binner, args.get_one::<String>("outfile").unwrap())?;

    Ok(())
}
