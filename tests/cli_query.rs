use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn build_db(dir: &Path, args: &[&str]) -> anyhow::Result<PathBuf> {
    let db = dir.join("db.tsv");
    let mut cmd = Command::cargo_bin("gisa")?;
    cmd.arg("build")
        .arg("tests/gisa/chains.tsv")
        .arg("--window")
        .arg("10")
        .arg("--stride")
        .arg("4")
        .args(args)
        .arg("-o")
        .arg(&db);
    cmd.assert().success();
    Ok(db)
}

struct Row {
    structure: String,
    mismatches: usize,
    score: f64,
    best: String,
    p_value: String,
}

fn parse(stdout: &[u8]) -> anyhow::Result<Vec<Row>> {
    let text = String::from_utf8(stdout.to_vec())?;
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("structure\tchain\tpoints\tunits\tmismatches\tscore\tpositive\tnegative\tbest\tp_value")
    );
    let mut rows = vec![];
    for line in lines {
        let f: Vec<&str> = line.split('\t').collect();
        assert_eq!(f.len(), 10);
        rows.push(Row {
            structure: f[0].to_string(),
            mismatches: f[4].parse()?,
            score: f[5].parse()?,
            best: f[8].to_string(),
            p_value: f[9].to_string(),
        });
    }
    Ok(rows)
}

#[test]
fn command_query_mutual() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db = build_db(temp.path(), &[])?;

    let mut cmd = Command::cargo_bin("gisa")?;
    let output = cmd
        .arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .output()?;
    assert!(output.status.success());

    let rows = parse(&output.stdout)?;
    let names: Vec<&str> = rows.iter().map(|r| r.structure.as_str()).collect();
    assert_eq!(names, vec!["1hlx", "2hlx", "3str", "4rnd"]);
    for row in &rows {
        assert_eq!(row.mismatches, 0);
        assert!(row.score >= 0.0);
        // pairs are labelled by both windows
        assert!(row.best.contains('-'));
        assert_eq!(row.p_value, "-");
    }

    Ok(())
}

#[test]
fn command_query_mismatches_both() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db = build_db(temp.path(), &["--abs"])?;

    let mut cmd = Command::cargo_bin("gisa")?;
    let output = cmd
        .arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .arg("--mode")
        .arg("mutual-abs")
        .arg("--units")
        .arg("both")
        .arg("--mismatches")
        .arg("0,1,2")
        .output()?;
    assert!(output.status.success());

    let rows = parse(&output.stdout)?;
    assert_eq!(rows.len(), 4 * 3);
    for chunk in rows.chunks(3) {
        assert_eq!(
            chunk.iter().map(|r| r.mismatches).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        // more tolerance, more hits, less rarity
        assert!(chunk[1].score <= chunk[0].score + 1e-9);
        assert!(chunk[2].score <= chunk[1].score + 1e-9);
    }

    Ok(())
}

#[test]
fn command_query_exclude_self() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db = build_db(temp.path(), &["--abs"])?;

    let mut cmd = Command::cargo_bin("gisa")?;
    let output = cmd
        .arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .arg("--mode")
        .arg("full")
        .arg("--units")
        .arg("windows")
        .arg("--exclude-self")
        .output()?;
    assert!(output.status.success());

    let rows = parse(&output.stdout)?;
    // the two helices find each other, the strand has no twin
    let helix = &rows[0];
    let strand = &rows[2];
    assert_eq!(strand.structure, "3str");
    assert!(strand.score > helix.score);
    assert!(helix.best.starts_with('w'));

    Ok(())
}

#[test]
fn command_query_background() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db = build_db(temp.path(), &[])?;

    let mut cmd = Command::cargo_bin("gisa")?;
    let output = cmd
        .arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .arg("--policy")
        .arg("threshold")
        .arg("--threshold")
        .arg("0.01")
        .arg("--aggregate")
        .arg("mean")
        .arg("--normalize")
        .arg("--background")
        .arg("tests/gisa/background.txt")
        .output()?;
    assert!(output.status.success());

    for row in parse(&output.stdout)? {
        let p: f64 = row.p_value.parse()?;
        assert!((0.0..=1.0).contains(&p));
    }

    Ok(())
}

#[test]
fn command_query_needs_abs() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db = build_db(temp.path(), &[])?;

    let mut cmd = Command::cargo_bin("gisa")?;
    cmd.arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .arg("--mode")
        .arg("mutual-abs");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("absolute values"));

    Ok(())
}

#[test]
fn command_bins_then_query() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db = build_db(temp.path(), &["--abs"])?;
    let bins = temp.path().join("windows.bins");

    let mut cmd = Command::cargo_bin("gisa")?;
    cmd.arg("bins")
        .arg(&db)
        .arg("--units")
        .arg("windows")
        .arg("--mode")
        .arg("full")
        .arg("--bins")
        .arg("4")
        .arg("-o")
        .arg(&bins);
    cmd.assert().success();

    let content = std::fs::read_to_string(&bins)?;
    assert_eq!(content.lines().count(), 14);
    assert!(content.lines().all(|l| l == "-" || l.split('\t').count() <= 3));

    let mut cmd = Command::cargo_bin("gisa")?;
    let output = cmd
        .arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .arg("--mode")
        .arg("full")
        .arg("--units")
        .arg("windows")
        .arg("--bins")
        .arg("4")
        .arg("--window-bins")
        .arg(&bins)
        .output()?;
    assert!(output.status.success());

    // the same bins as fitted in place give the same scores
    let mut cmd = Command::cargo_bin("gisa")?;
    let fitted = cmd
        .arg("query")
        .arg("tests/gisa/chains.tsv")
        .arg("--db")
        .arg(&db)
        .arg("--mode")
        .arg("full")
        .arg("--units")
        .arg("windows")
        .arg("--bins")
        .arg("4")
        .output()?;
    assert_eq!(output.stdout, fitted.stdout);

    Ok(())
}
