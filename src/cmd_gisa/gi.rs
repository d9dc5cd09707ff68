use clap::*;
use itertools::Itertools;
use std::io::Write;

use gisa::libs::pipeline::{compute_invariants, Depth};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("gi")
        .about("Writhe-family invariants of each chain")
        .after_help(
            r###"
This command computes Gauss-integral invariants of backbone chains. Each chain is reduced to
the poly-line through its CA atoms (PDB) or its listed points (TSV), and the signed solid-angle
kernel between segment pairs is aggregated into first, second and third order invariants.

Output is tab separated, one row per chain:
    structure  chain  points  unit  <one column per invariant>

Invariant names:
* I12            - writhe, sum over segment pairs (1,2)
* I1234 I1324 I1423 - second order, serial, crossing and nested pairing
* I123456 ...    - third order, 15 pairings of six segments
* Ia..           - a factor replaced by its absolute value

Notes:
* Chains with fewer than max(2*order+1, --min-len) points are skipped with a warning
* --windows adds one row per window, the unit column reading `wN`;
  chains shorter than one window are then skipped
* .gz inputs are decompressed on the fly

Examples:
1. Writhe and second order invariants of a PDB file:
   gisa gi 1abc.pdb

2. Third order with absolute variants, parallel:
   gisa gi pdbs/ --order 3 --abs --parallel 4 -o gi.tsv

3. Window invariants:
   gisa gi chains.tsv --windows --window 16 --stride 2

"###,
        )
        .arg(
            Arg::new("windows")
                .long("windows")
                .action(ArgAction::SetTrue)
                .help("Also write the invariants of every window"),
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
    //----------------------------
    // Args
    //----------------------------
    let infiles: Vec<String> = args.get_many::<String>("infiles").unwrap().cloned().collect();
    let depth = if args.get_flag("windows") {
        Depth::Windows
    } else {
        Depth::Chain
    };
    let config = super::config_from(args)?;
    super::set_parallel(args)?;

    //----------------------------
    // Operating
    //----------------------------
    let batch = compute_invariants(&config, &infiles, depth)?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = gisa::writer(args.get_one::<String>("outfile").unwrap())?;
    let kinds = gisa::libs::invariant::InvariantKind::for_order(config.order, config.include_abs);
    writer.write_fmt(format_args!(
        "structure\tchain\tpoints\tunit\t{}\n",
        kinds.iter().join("\t")
    ))?;

    for inv in &batch.items {
        let values = inv.corner.iter().map(|(_, v)| format!("{:.6}", v)).join("\t");
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\tchain\t{}\n",
            inv.structure, inv.chain, inv.points, values
        ))?;
        for w in &inv.windows {
            let values = w.values.iter().map(|(_, v)| format!("{:.6}", v)).join("\t");
            writer.write_fmt(format_args!(
                "{}\t{}\t{}\tw{}\t{}\n",
                inv.structure, inv.chain, inv.points, w.window.number, values
            ))?;
        }
    }
    writer.flush()?;

    Ok(())
}
