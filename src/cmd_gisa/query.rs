use clap::*;
use std::io::Write;

use gisa::libs::config::{MatchUnits, QueryMode};
use gisa::libs::db::{read_bins, Database};
use gisa::libs::pipeline::{query, QueryOptions};
use gisa::libs::rarity::{Aggregate, Background, ScorePolicy};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("query")
        .about("Scores how rare the windows of query chains are")
        .after_help(
            r###"
This command matches the windows (or window pairs) of query chains against a database built by
`gisa build`. Invariant values are discretized into letters, one per dimension; a query unit
hits every database record whose letters differ in at most --mismatches positions.

A unit's rarity is ln((N + 1) / (hits + 1)), N being the number of database records.

Modes (--mode):
* mutual     - windows: I12; pairs: I12 of both windows and their mutual I12
* mutual-abs - as mutual, plus the Ia12 counterparts (needs a database built with --abs)
* full       - every invariant stored in the database

Policies (--policy):
* max       - the unit with the largest |mutual I12| gives the score
* signed    - as max, positive and negative units scored separately, the larger wins
* threshold - units with |mutual I12| > --threshold, summed or averaged (--aggregate)

Output is tab separated, one row per chain and mismatch count:
    structure  chain  points  units  mismatches  score  positive  negative  best  p_value

Notes:
* Order, --abs and window length are taken from the database header
* Letter bins are fitted on the database unless --window-bins / --pair-bins are given
* --background turns scores into p-values, the fraction of background scores >= score

Examples:
1. Rarity of window pairs:
   gisa query chains.tsv --db db.tsv

2. Several mismatch counts, both unit kinds, with p-values:
   gisa query q.pdb --db db.tsv --units both --mismatches 0,1,2 --background bg.txt

3. Threshold policy, normalized by the number of units:
   gisa query q.pdb --db db.tsv --policy threshold --threshold 0.1 --normalize

"###,
        )
        .arg(
            Arg::new("db")
                .long("db")
                .short('d')
                .required(true)
                .num_args(1)
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
                .value_parser(["windows", "pairs", "both"])
                .help("Match windows, window pairs, or both"),
        )
        .arg(
            Arg::new("mismatches")
                .long("mismatches")
                .short('m')
                .num_args(1)
                .value_delimiter(',')
                .default_value("0")
                .value_parser(value_parser!(usize))
                .help("Allowed mismatching letters; a comma separated list scores each"),
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
            Arg::new("policy")
                .long("policy")
                .num_args(1)
                .default_value("max")
                .value_parser(["max", "signed", "threshold"])
                .help("How unit rarities make a score"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(f64))
                .help("Minimum |mutual I12| of contributing units"),
        )
        .arg(
            Arg::new("aggregate")
                .long("aggregate")
                .num_args(1)
                .default_value("sum")
                .value_parser(["sum", "mean"])
                .help("Combination of contributing units under --policy threshold"),
        )
        .arg(
            Arg::new("normalize")
                .long("normalize")
                .action(ArgAction::SetTrue)
                .help("Divide scores by the number of examined units"),
        )
        .arg(
            Arg::new("exclude_self")
                .long("exclude-self")
                .action(ArgAction::SetTrue)
                .help("Ignore database records of the query's own structure"),
        )
        .arg(
            Arg::new("window_bins")
                .long("window-bins")
                .num_args(1)
                .help("Bins file for window letters"),
        )
        .arg(
            Arg::new("pair_bins")
                .long("pair-bins")
                .num_args(1)
                .help("Bins file for pair letters"),
        )
        .arg(
            Arg::new("background")
                .long("background")
                .num_args(1)
                .help("Background scores, one per line"),
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
    super::window_args(cmd)
}

fn opt_float(v: Option<f64>) -> String {
    v.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "-".to_string())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infiles: Vec<String> = args.get_many::<String>("infiles").unwrap().cloned().collect();
    let db = Database::read(args.get_one::<String>("db").unwrap())?;
    let mode: QueryMode = args.get_one::<String>("mode").unwrap().parse()?;

    let mut config = super::config_from(args)?;
    config.order = db.header.order;
    config.include_abs = db.header.include_abs;
    config.window_length = db.header.window_length;
    config.match_units = args.get_one::<String>("units").unwrap().parse::<MatchUnits>()?;
    config.allowed_mismatches = args.get_many::<usize>("mismatches").unwrap().copied().collect();
    config.nr_of_bins = *args.get_one::<usize>("bins").unwrap();
    config.bin_scheme = args.get_one::<String>("scheme").unwrap().parse()?;
    config.threshold = *args.get_one::<f64>("threshold").unwrap();
    config.normalize = args.get_flag("normalize");
    config.exclude_self = args.get_flag("exclude_self");
    config.score_policy = match args.get_one::<String>("policy").unwrap().as_str() {
        "signed" => ScorePolicy::MaxMutual { signed: true },
        "threshold" => ScorePolicy::AboveThreshold {
            threshold: config.threshold,
            aggregate: args.get_one::<String>("aggregate").unwrap().parse::<Aggregate>()?,
        },
        _ => ScorePolicy::MaxMutual { signed: false },
    };

    let opts = QueryOptions {
        window_bins: args
            .get_one::<String>("window_bins")
            .map(|f| read_bins(f))
            .transpose()?,
        pair_bins: args
            .get_one::<String>("pair_bins")
            .map(|f| read_bins(f))
            .transpose()?,
        background: args
            .get_one::<String>("background")
            .map(|f| Background::read(f))
            .transpose()?,
    };
    super::set_parallel(args)?;

    //----------------------------
    // Operating
    //----------------------------
    let batch = query(&config, &db, &infiles, mode, &opts)?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = gisa::writer(args.get_one::<String>("outfile").unwrap())?;
    writer.write_fmt(format_args!(
        "structure\tchain\tpoints\tunits\tmismatches\tscore\tpositive\tnegative\tbest\tp_value\n"
    ))?;
    for report in &batch.items {
        for s in &report.scores {
            writer.write_fmt(format_args!(
                "{}\t{}\t{}\t{}\t{}\t{:.6}\t{}\t{}\t{}\t{}\n",
                report.structure,
                report.chain,
                report.points,
                report.units,
                s.mismatches,
                s.score.score,
                opt_float(s.score.positive),
                opt_float(s.score.negative),
                s.best.as_deref().unwrap_or("-"),
                opt_float(s.p_value),
            ))?;
        }
    }
    writer.flush()?;

    Ok(())
}
