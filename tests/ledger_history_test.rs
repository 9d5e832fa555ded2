mod common;

use camino::Utf8Path;

use common::{geo_orbit, res_series, utf8_tempdir, write_report, ScriptedCatalog};
use geocheck::catalog::CatalogMatch;
use geocheck::constants::TargetTag;
use geocheck::ledger::{Ledger, MatchSummary};
use geocheck::orbit_fit::NoOrbitFitter;
use geocheck::params::PostprocessParams;
use geocheck::pipeline::{postprocess, Collaborators};
use geocheck::ref_system::MeanOfDate;
use geocheck::time::NightDate;

fn params(root: &Utf8Path) -> PostprocessParams {
    PostprocessParams::builder()
        .site(43.75, 6.92, 1270.0)
        .ledger_path(root.join("ident.txt"))
        .orbit_dir(root)
        .dump_orbit(false)
        .build()
        .unwrap()
}

fn entry_lines<'a>(content: &'a str, key: &str) -> Vec<&'a str> {
    let mut lines = Vec::new();
    let mut inside = false;
    for line in content.lines() {
        if line.len() > 11 && line.as_bytes()[4] == b'-' {
            inside = line[11..].starts_with(key);
        }
        if inside {
            lines.push(line);
        }
    }
    lines
}

#[test]
fn test_rerun_replaces_only_its_entry() {
    let (_dir, root) = utf8_tempdir();
    let ledger_path = root.join("ident.txt");
    let catalog = ScriptedCatalog::new()
        .with_object(CatalogMatch::new("28884", "tle"), geo_orbit(300.0), 226.9, 5.0..5.007)
        .with_object(CatalogMatch::new("26038", "tle"), geo_orbit(301.0), 227.1, 5.007..6.0);
    let collaborators = Collaborators::new(&catalog, &NoOrbitFitter, &MeanOfDate);

    let first = write_report(&root, "a.res", &[res_series("RES 10092 95232", (21, 0), 6, 5, 5.5)]);
    let second = write_report(&root, "b.res", &[res_series("RES 10092 95233", (22, 0), 6, 5, 5.0)]);

    postprocess(&first, &params(&root), &collaborators, None).unwrap();
    postprocess(&second, &params(&root), &collaborators, None).unwrap();
    let before = std::fs::read_to_string(&ledger_path).unwrap();

    postprocess(&first, &params(&root), &collaborators, None).unwrap();
    let rerun = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(before, rerun);

    // same night and tag, without any identification this time
    postprocess(&first, &params(&root), &Collaborators::default(), None).unwrap();
    let after = std::fs::read_to_string(&ledger_path).unwrap();

    let other = TargetTag::new(10092u32, 95233u32).ledger_key();
    let own = TargetTag::new(10092u32, 95232u32).ledger_key();
    assert!(!entry_lines(&before, &other).is_empty());
    assert_eq!(entry_lines(&before, &other), entry_lines(&after, &other));
    assert_ne!(entry_lines(&before, &own), entry_lines(&after, &own));
    assert_eq!(entry_lines(&after, &own).len(), 1);

    let ledger = Ledger::load(&ledger_path);
    assert_eq!(ledger.len(), 2);
    let night = NightDate::new(2014, 5, 12).unwrap();
    assert_eq!(
        ledger.get(&night, &own),
        Some(&[MatchSummary::Unmatched { total: 6 }][..])
    );

    // 95233 crosses from the first object's window into the second one's
    let summaries = ledger.get(&night, &other).unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries.iter().map(MatchSummary::count).sum::<usize>(), 6);
    assert!(summaries.windows(2).all(|w| w[0].count() >= w[1].count()));
}

#[test]
fn test_unparsable_ledger_is_replaced() {
    let (_dir, root) = utf8_tempdir();
    let ledger_path = root.join("ident.txt");
    std::fs::write(&ledger_path, [0xffu8, 0xfe, 0x00]).unwrap();

    let input = write_report(&root, "a.res", &[res_series("RES 10092 95232", (21, 0), 3, 5, 5.5)]);
    let summary = postprocess(&input, &params(&root), &Collaborators::default(), None).unwrap();
    assert_eq!(summary.ledger_entries, 1);

    let ledger = Ledger::load(&ledger_path);
    assert_eq!(ledger.len(), 1);
}
