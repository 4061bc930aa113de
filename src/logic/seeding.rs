//! Seed distribution across the two groups of a dual-group bracket.

use crate::models::{GroupId, SeedRecord, TeamId};
use std::collections::{BTreeMap, HashSet};

/// Group sizes for `n` teams: group A takes the extra team when `n` is odd.
pub fn group_sizes(n: usize) -> (usize, usize) {
    (n.div_ceil(2), n / 2)
}

/// Alternate seeds across groups (1st → A, 2nd → B, 3rd → A, ...).
pub fn distribute_seeds(seeds: &[TeamId], groups: &[GroupId]) -> BTreeMap<TeamId, GroupId> {
    if groups.is_empty() {
        return BTreeMap::new();
    }
    seeds
        .iter()
        .enumerate()
        .map(|(i, &seed)| (seed, groups[i % groups.len()]))
        .collect()
}

/// Split teams into groups A and B.
///
/// With no seeds the split is contiguous: the first `ceil(n/2)` teams form A.
/// Otherwise the first `seed_count` teams are seeds, alternated across the groups,
/// and the remaining teams fill A then B up to their sizes, keeping input order.
pub fn split_into_groups(teams: &[TeamId], seed_count: usize) -> (BTreeMap<GroupId, Vec<TeamId>>, SeedRecord) {
    let (size_a, size_b) = group_sizes(teams.len());
    let seed_count = seed_count.min(teams.len());

    let mut groups: BTreeMap<GroupId, Vec<TeamId>> = GroupId::ALL.iter().map(|g| (*g, Vec::new())).collect();
    if seed_count == 0 {
        groups.insert(GroupId::A, teams[..size_a].to_vec());
        groups.insert(GroupId::B, teams[size_a..].to_vec());
        return (groups, SeedRecord::default());
    }

    let seeds = teams[..seed_count].to_vec();
    let distribution = distribute_seeds(&seeds, &GroupId::ALL);
    for seed in &seeds {
        groups.entry(distribution[seed]).or_default().push(*seed);
    }

    let seeded: HashSet<TeamId> = seeds.iter().copied().collect();
    let targets = [(GroupId::A, size_a), (GroupId::B, size_b)];
    let mut rest = teams.iter().copied().filter(|t| !seeded.contains(t));
    for (group, target) in targets {
        let members = groups.entry(group).or_default();
        while members.len() < target {
            match rest.next() {
                Some(team) => members.push(team),
                None => break,
            }
        }
    }

    (groups, SeedRecord { seeds, distribution })
}
