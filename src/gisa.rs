extern crate clap;
use clap::*;

mod cmd_gisa;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Command::new("gisa")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`gisa` - Gauss integrals for structure alignment-free search")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_gisa::gi::make_subcommand())
        .subcommand(cmd_gisa::build::make_subcommand())
        .subcommand(cmd_gisa::query::make_subcommand())
        .subcommand(cmd_gisa::bins::make_subcommand())
        .after_help(
            r###"Subcommands:

* Invariants:
    * gi    - Writhe-family invariants of whole chains and windows

* Rare sub-structure search:
    * build - Window and window-pair invariants of a structure set
    * bins  - Letter bins fitted on a database
    * query - Score the rarity of query windows against a database

Logging goes to stderr; set RUST_LOG=debug for per-chain detail.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("gi", sub_matches)) => cmd_gisa::gi::execute(sub_matches),
        Some(("build", sub_matches)) => cmd_gisa::build::execute(sub_matches),
        Some(("query", sub_matches)) => cmd_gisa::query::execute(sub_matches),
        Some(("bins", sub_matches)) => cmd_gisa::bins::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
