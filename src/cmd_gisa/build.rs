use clap::*;

use gisa::libs::pipeline::build_database;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("build")
        .about("Builds a window invariant database")
        .after_help(
            r###"
This command computes the invariants of every window of every chain, and the mutual writhe
of every window pair, and writes them as a tab separated database for `gisa query`.

Database layout:
    #gisa-db  order=2  abs=1  window=16  stride=2
    #kinds    I12  Ia12  ...
    #mutual   I12  Ia12
    W  structure  chain  points  window  start  end  <window values>
    P  structure  chain  points  window1  window2  <mutual values>

Notes:
* Window length counts points; a window of L points holds L-1 segments
* Pairs are disjoint unless --overlapping is given
* Queries use the order, --abs and window length recorded in the header

Examples:
1. Default database, second order with absolute values:
   gisa build pdbs/ --abs -o db.tsv

2. Longer windows laid to cover both chain ends:
   gisa build chains.tsv --abs --window 24 --stride 4 --covering spread -o db.tsv

"###,
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );
    let cmd = super::input_args(cmd);
    let cmd = super::order_args(cmd);
    let cmd = super::length_args(cmd);
    super::window_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infiles: Vec<String> = args.get_many::<String>("infiles").unwrap().cloned().collect();
    let config = super::config_from(args)?;
    super::set_parallel(args)?;

    let db = build_database(&config, &infiles)?;
    db.write(args.get_one::<String>("outfile").unwrap())?;

    Ok(())
}
