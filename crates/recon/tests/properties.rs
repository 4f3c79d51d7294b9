// Property-based tests for the staged name resolution.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use taxalink_recon::config::{
    ChecklistNameField, ReconConfig, RunOptions, SourceNameField, StageConfig,
};
use taxalink_recon::engine::run;
use taxalink_recon::model::{ChecklistEntry, OccurrenceName, ReconInput, ResolvedRecord, TaxonStatus};
use taxalink_recon::stage::run_stages;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

// Small vocabularies so names collide across rows and entries.
const GENERA: [&str; 3] = ["Rosa", "Iris", "Carex"];
const EPITHETS: [&str; 3] = ["alba", "canina", "nigra"];
const FAMILIES: [&str; 3] = ["Rosaceae", "Iridaceae", ""];
const AUTHORS: [&str; 3] = ["L.", "Savi", ""];

fn arb_status() -> impl Strategy<Value = TaxonStatus> {
    prop_oneof![
        3 => Just(TaxonStatus::Accepted),
        1 => Just(TaxonStatus::HomotypicSynonym),
        1 => Just(TaxonStatus::HeterotypicSynonym),
        1 => Just(TaxonStatus::Orthographic),
        1 => Just(TaxonStatus::Other("Unplaced".to_string())),
    ]
}

/// Occurrence rows with unique ids `o0..`.
fn arb_occurrences(max: usize) -> impl Strategy<Value = Vec<OccurrenceName>> {
    proptest::collection::vec((0..3usize, 0..3usize, 0..3usize, 0..3usize, prop::bool::ANY), 0..=max)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (g, e, f, a, var))| {
                    let epithet = if var {
                        format!("{} var. {}", EPITHETS[e], EPITHETS[(e + 1) % 3])
                    } else {
                        EPITHETS[e].to_string()
                    };
                    let base = format!("{} {}", GENERA[g], epithet);
                    let scientific = if AUTHORS[a].is_empty() {
                        base
                    } else {
                        format!("{base} {}", AUTHORS[a])
                    };
                    OccurrenceName::new(format!("o{i}"), scientific, GENERA[g], epithet, FAMILIES[f], GENERA[g])
                })
                .collect()
        })
}

/// Checklist entries with unique ids `c0..`; accepted links may dangle.
fn arb_checklist(max: usize) -> impl Strategy<Value = Vec<ChecklistEntry>> {
    proptest::collection::vec(
        (0..3usize, 0..3usize, 0..3usize, 0..3usize, prop::bool::ANY, arb_status(), proptest::option::of(0..(max + 2))),
        0..=max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (g, e, f, a, var, status, link))| {
                let name = if var {
                    format!("{} {} var. {}", GENERA[g], EPITHETS[e], EPITHETS[(e + 1) % 3])
                } else {
                    format!("{} {}", GENERA[g], EPITHETS[e])
                };
                let accepted = match status {
                    TaxonStatus::Accepted => None,
                    _ => link.map(|l| format!("c{l}")),
                };
                ChecklistEntry {
                    plant_name_id: format!("c{i}"),
                    taxon_name: name,
                    taxon_authors: AUTHORS[a].to_string(),
                    taxon_rank: if var { "Variety" } else { "Species" }.to_string(),
                    taxon_status: status,
                    accepted_plant_name_id: accepted,
                    family: FAMILIES[f].to_string(),
                    genus: GENERA[g].to_string(),
                }
            })
            .collect()
    })
}

fn by_id(records: &[ResolvedRecord]) -> BTreeMap<String, ResolvedRecord> {
    records
        .iter()
        .map(|r| (r.occurrence.id.clone(), r.clone()))
        .collect()
}

// ===========================================================================
// Properties
// ===========================================================================

// Every occurrence id is either output exactly once or dropped as ambiguous.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn ids_partitioned(
        occurrences in arb_occurrences(24),
        checklist in arb_checklist(16),
    ) {
        let input = ReconInput { occurrences, checklist };
        let result = run(&ReconConfig::new("partition"), &input).unwrap();

        let mut seen = BTreeSet::new();
        for r in &result.records {
            prop_assert!(seen.insert(r.occurrence.id.clone()), "id {} output twice", r.occurrence.id);
        }

        let all: BTreeSet<String> = input.occurrences.iter().map(|o| o.id.clone()).collect();
        prop_assert!(seen.is_subset(&all));
        prop_assert_eq!(all.len() - seen.len(), result.summary.dropped_ambiguous_rows);
        prop_assert_eq!(result.summary.total_occurrences, input.occurrences.len());
        prop_assert_eq!(
            result.summary.resolved + result.summary.unmatched,
            result.records.len()
        );
    }
}

// Shuffling either input changes nothing but output order.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn input_order_irrelevant(
        occurrences in arb_occurrences(24),
        checklist in arb_checklist(16),
        rot_occ in 0usize..24,
        rot_chk in 0usize..16,
    ) {
        let config = ReconConfig::new("order");
        let a = run(&config, &ReconInput { occurrences: occurrences.clone(), checklist: checklist.clone() }).unwrap();

        let mut occ2 = occurrences;
        occ2.reverse();
        if !occ2.is_empty() {
            let k = rot_occ % occ2.len();
            occ2.rotate_left(k);
        }
        let mut chk2 = checklist;
        chk2.reverse();
        if !chk2.is_empty() {
            let k = rot_chk % chk2.len();
            chk2.rotate_left(k);
        }
        let b = run(&config, &ReconInput { occurrences: occ2, checklist: chk2 }).unwrap();

        prop_assert_eq!(by_id(&a.records), by_id(&b.records));
        prop_assert_eq!(a.summary, b.summary);
    }
}

// Rows sharing a source name resolve to the same entry.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn one_choice_per_name(
        occurrences in arb_occurrences(24),
        checklist in arb_checklist(16),
    ) {
        let stage = StageConfig::new(
            SourceNameField::ComparisonName,
            ChecklistNameField::NameWithoutAuthors,
            &[],
            false,
        );
        let config = ReconConfig::new("unique").with_stages(vec![stage]);
        let result = run(&config, &ReconInput { occurrences, checklist }).unwrap();

        let mut choice: BTreeMap<String, String> = BTreeMap::new();
        for r in &result.records {
            if let Some(m) = &r.matched {
                let name = &r.occurrence.comparison_name;
                if let Some(prev) = choice.insert(name.clone(), m.match_id.clone()) {
                    prop_assert_eq!(&prev, &m.match_id, "name {} resolved two ways", name);
                }
            }
        }
    }
}

// A resolved row reports the stage that matched that row, and no stage is
// credited with more rows than it matched.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn match_stage_is_the_rows_own(
        occurrences in arb_occurrences(24),
        checklist in arb_checklist(16),
    ) {
        let config = ReconConfig::new("stage");
        let input = ReconInput { occurrences, checklist };
        let result = run(&config, &input).unwrap();

        let staged = run_stages(&config.stages, &input.occurrences, &input.checklist, &config.run);
        let matched_at: BTreeMap<&str, usize> = staged
            .candidates
            .iter()
            .map(|c| (c.original_id.as_str(), c.match_stage))
            .collect();

        let mut per_stage = vec![0usize; config.stages.len()];
        for r in &result.records {
            if let Some(m) = &r.matched {
                let id = r.occurrence.id.as_str();
                prop_assert_eq!(Some(&m.match_stage), matched_at.get(id), "id {}", id);
                per_stage[m.match_stage] += 1;
            }
        }
        for (stats, n) in result.summary.stages.iter().zip(per_stage) {
            prop_assert!(n <= stats.matched_ids, "stage {} credited {} rows", stats.index, n);
        }
    }
}

// Accepted matches are their own accepted concept; withheld statuses carry none.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn accepted_fields_consistent(
        occurrences in arb_occurrences(24),
        checklist in arb_checklist(16),
    ) {
        let result = run(&ReconConfig::new("accepted"), &ReconInput { occurrences, checklist }).unwrap();

        for m in result.records.iter().filter_map(|r| r.matched.as_ref()) {
            match &m.match_status {
                TaxonStatus::Accepted => {
                    let acc = m.accepted.as_ref();
                    prop_assert_eq!(acc.map(|a| a.id.as_str()), Some(m.match_id.as_str()));
                }
                TaxonStatus::HeterotypicSynonym | TaxonStatus::Other(_) => {
                    prop_assert!(m.accepted.is_none());
                }
                _ => {}
            }
        }
    }
}

// Sharding and a dedicated pool are invisible in the result.
proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn sharding_irrelevant(
        occurrences in arb_occurrences(24),
        checklist in arb_checklist(16),
        shards in 2usize..6,
    ) {
        let input = ReconInput { occurrences, checklist };
        let plain = run(&ReconConfig::new("plain"), &input).unwrap();
        let sharded = run(
            &ReconConfig::new("sharded").with_run(RunOptions { shards, threads: Some(2) }),
            &input,
        )
        .unwrap();
        prop_assert_eq!(plain.records, sharded.records);
        prop_assert_eq!(plain.summary, sharded.summary);
    }
}
