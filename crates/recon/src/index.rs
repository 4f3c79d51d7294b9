use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use rayon::prelude::*;

use crate::config::{ChecklistNameField, JoinColumn, SourceNameField};
use crate::model::{ChecklistEntry, OccurrenceName};

/// Join-column values in stage order, followed by the name.
/// Compared byte for byte: no case folding, no trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(Vec<String>);

impl JoinKey {
    pub fn checklist(entry: &ChecklistEntry, columns: &[JoinColumn], name: ChecklistNameField) -> Self {
        let mut parts: Vec<String> = columns.iter().map(|c| entry.column(*c).to_string()).collect();
        parts.push(entry.name(name));
        Self(parts)
    }

    pub fn occurrence(occ: &OccurrenceName, columns: &[JoinColumn], name: SourceNameField) -> Self {
        let mut parts: Vec<String> = columns.iter().map(|c| occ.column(*c).to_string()).collect();
        parts.push(occ.name(name).to_string());
        Self(parts)
    }

    /// The name component (always last).
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    fn shard(&self, shards: usize) -> usize {
        if shards <= 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        (hasher.finish() % shards as u64) as usize
    }
}

/// Equality-join lookup over the checklist for one stage's key shape.
///
/// Entries are partitioned by key hash; each shard holds a disjoint key set,
/// so shards build independently and a probe only touches one of them.
/// Bucket contents stay in checklist order.
pub struct ReferenceIndex<'a> {
    checklist: &'a [ChecklistEntry],
    shards: Vec<HashMap<JoinKey, Vec<usize>>>,
}

impl<'a> ReferenceIndex<'a> {
    pub fn build(
        checklist: &'a [ChecklistEntry],
        columns: &[JoinColumn],
        name: ChecklistNameField,
    ) -> Self {
        Self::build_sharded(checklist, columns, name, 1)
    }

    pub fn build_sharded(
        checklist: &'a [ChecklistEntry],
        columns: &[JoinColumn],
        name: ChecklistNameField,
        shards: usize,
    ) -> Self {
        let shards = shards.max(1);

        if shards == 1 {
            let mut map: HashMap<JoinKey, Vec<usize>> = HashMap::new();
            for (i, entry) in checklist.iter().enumerate() {
                map.entry(JoinKey::checklist(entry, columns, name))
                    .or_default()
                    .push(i);
            }
            return Self {
                checklist,
                shards: vec![map],
            };
        }

        let keyed: Vec<(usize, JoinKey)> = checklist
            .par_iter()
            .map(|entry| {
                let key = JoinKey::checklist(entry, columns, name);
                (key.shard(shards), key)
            })
            .collect();

        let shards = (0..shards)
            .into_par_iter()
            .map(|s| {
                let mut map: HashMap<JoinKey, Vec<usize>> = HashMap::new();
                for (i, (shard, key)) in keyed.iter().enumerate() {
                    if *shard == s {
                        map.entry(key.clone()).or_default().push(i);
                    }
                }
                map
            })
            .collect();

        Self { checklist, shards }
    }

    /// All checklist entries sharing `key`, in checklist order.
    pub fn probe(&self, key: &JoinKey) -> Vec<&'a ChecklistEntry> {
        let shard = &self.shards[key.shard(self.shards.len())];
        shard
            .get(key)
            .map(|idxs| idxs.iter().map(|&i| &self.checklist[i]).collect())
            .unwrap_or_default()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.shards.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonStatus;

    fn entry(id: &str, name: &str, authors: &str, family: &str) -> ChecklistEntry {
        ChecklistEntry {
            plant_name_id: id.into(),
            taxon_name: name.into(),
            taxon_authors: authors.into(),
            taxon_rank: "Species".into(),
            taxon_status: TaxonStatus::Accepted,
            accepted_plant_name_id: None,
            family: family.into(),
            genus: name.split(' ').next().unwrap_or("").into(),
        }
    }

    fn checklist() -> Vec<ChecklistEntry> {
        vec![
            entry("1", "Rosa canina", "L.", "Rosaceae"),
            entry("2", "Rosa canina", "Hook.", "Rosaceae"),
            entry("3", "Iris alba", "Savi", "Iridaceae"),
            entry("4", "Iris alba", "Poir.", "Asteraceae"),
        ]
    }

    fn ids(found: Vec<&ChecklistEntry>) -> Vec<&str> {
        found.iter().map(|e| e.plant_name_id.as_str()).collect()
    }

    #[test]
    fn name_only_key_groups_homonyms() {
        let list = checklist();
        let index = ReferenceIndex::build(&list, &[], ChecklistNameField::NameWithoutAuthors);
        assert_eq!(index.len(), 2);
        let key = JoinKey(vec!["Rosa canina".into()]);
        assert_eq!(ids(index.probe(&key)), vec!["1", "2"]);
    }

    #[test]
    fn join_columns_narrow_the_bucket() {
        let list = checklist();
        let index =
            ReferenceIndex::build(&list, &[JoinColumn::Family], ChecklistNameField::NameWithoutAuthors);
        let key = JoinKey(vec!["Iridaceae".into(), "Iris alba".into()]);
        assert_eq!(ids(index.probe(&key)), vec!["3"]);
    }

    #[test]
    fn with_authors_key() {
        let list = checklist();
        let index = ReferenceIndex::build(&list, &[], ChecklistNameField::NameWithAuthors);
        let key = JoinKey(vec!["Rosa canina L.".into()]);
        assert_eq!(ids(index.probe(&key)), vec!["1"]);
    }

    #[test]
    fn probe_is_case_sensitive() {
        let list = checklist();
        let index = ReferenceIndex::build(&list, &[], ChecklistNameField::NameWithoutAuthors);
        assert!(index.probe(&JoinKey(vec!["rosa canina".into()])).is_empty());
    }

    #[test]
    fn sharded_build_matches_sequential() {
        let list = checklist();
        let cols = [JoinColumn::Family, JoinColumn::Genus];
        let seq = ReferenceIndex::build(&list, &cols, ChecklistNameField::NameWithoutAuthors);
        let par = ReferenceIndex::build_sharded(&list, &cols, ChecklistNameField::NameWithoutAuthors, 3);
        assert_eq!(par.shard_count(), 3);
        assert_eq!(seq.len(), par.len());
        for e in &list {
            let key = JoinKey::checklist(e, &cols, ChecklistNameField::NameWithoutAuthors);
            assert_eq!(ids(seq.probe(&key)), ids(par.probe(&key)));
        }
    }

    #[test]
    fn occurrence_key_uses_stage_fields() {
        let occ = OccurrenceName::new("X", "Rosa canina L.", "Rosa", "canina", "Rosaceae", "Rosa");
        let key = JoinKey::occurrence(&occ, &[JoinColumn::Genus], SourceNameField::ComparisonName);
        assert_eq!(key, JoinKey(vec!["Rosa".into(), "Rosa canina".into()]));
        assert_eq!(key.name(), "Rosa canina");
    }

    #[test]
    fn empty_checklist_builds_empty_index() {
        let list: Vec<ChecklistEntry> = Vec::new();
        let index = ReferenceIndex::build_sharded(&list, &[], ChecklistNameField::NameWithAuthors, 4);
        assert!(index.is_empty());
        assert!(index.probe(&JoinKey(vec!["Rosa canina".into()])).is_empty());
    }
}
