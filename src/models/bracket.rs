//! Elimination bracket structure: rounds of matches linked forward to the slot
//! their winner fills.
//!
//! Matches live in one vector per round; position `p` is index `p - 1`. Forward
//! links are checked by [`Bracket::validate`] whenever a bracket is built or
//! loaded, so lookups through them never miss.

use crate::models::error::EngineError;
use crate::models::team::TeamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Ordered rounds; each round is its matches ordered by position.
pub type Rounds = Vec<Vec<BracketMatch>>;

/// Side of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    /// Odd positions feed slot 1 of the next round, even positions slot 2.
    pub fn for_position(position: u32) -> Self {
        if position % 2 == 1 {
            Slot::One
        } else {
            Slot::Two
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Slot::One),
            2 => Ok(Slot::Two),
            other => Err(format!("team slot must be 1 or 2, got {other}")),
        }
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// One of the two groups in a dual-group contest.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum GroupId {
    A,
    B,
}

impl GroupId {
    pub const ALL: [GroupId; 2] = [GroupId::A, GroupId::B];

    /// Side of the final this group's winner takes.
    pub fn final_slot(self) -> Slot {
        match self {
            GroupId::A => Slot::One,
            GroupId::B => Slot::Two,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::A => write!(f, "A"),
            GroupId::B => write!(f, "B"),
        }
    }
}

/// Which part of a bracket a match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// The single tree of a plain or seeded bracket.
    Main,
    Group(GroupId),
    Final,
}

/// Address of a match inside a bracket (1-based round and position).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct MatchRef {
    pub section: Section,
    pub round: u32,
    pub position: u32,
}

impl MatchRef {
    pub fn new(section: Section, round: u32, position: u32) -> Self {
        Self {
            section,
            round,
            position,
        }
    }
}

impl fmt::Display for MatchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section {
            Section::Main => {}
            Section::Group(g) => write!(f, "group {g} ")?,
            Section::Final => write!(f, "final stage ")?,
        }
        write!(f, "round {} position {}", self.round, self.position)
    }
}

/// Where a match's winner goes in the next round of the same section.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NextSlot {
    pub position: u32,
    pub slot: Slot,
}

/// A node in the bracket.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketMatch {
    pub round: u32,
    pub position: u32,
    pub team1_id: Option<TeamId>,
    pub team2_id: Option<TeamId>,
    pub winner_id: Option<TeamId>,
    /// First-round match with no opponent by construction; its lone team advances.
    #[serde(default)]
    pub bye: bool,
    pub next_match_position: Option<u32>,
    pub next_match_team_slot: Option<Slot>,
}

impl BracketMatch {
    pub fn new(round: u32, position: u32, next: Option<NextSlot>) -> Self {
        Self {
            round,
            position,
            team1_id: None,
            team2_id: None,
            winner_id: None,
            bye: false,
            next_match_position: next.map(|n| n.position),
            next_match_team_slot: next.map(|n| n.slot),
        }
    }

    pub fn next(&self) -> Option<NextSlot> {
        match (self.next_match_position, self.next_match_team_slot) {
            (Some(position), Some(slot)) => Some(NextSlot { position, slot }),
            _ => None,
        }
    }

    pub fn team(&self, slot: Slot) -> Option<TeamId> {
        match slot {
            Slot::One => self.team1_id,
            Slot::Two => self.team2_id,
        }
    }

    pub fn team_mut(&mut self, slot: Slot) -> &mut Option<TeamId> {
        match slot {
            Slot::One => &mut self.team1_id,
            Slot::Two => &mut self.team2_id,
        }
    }

    pub fn has_team(&self, team: TeamId) -> bool {
        self.team1_id == Some(team) || self.team2_id == Some(team)
    }

    pub fn clear(&mut self) {
        self.team1_id = None;
        self.team2_id = None;
        self.winner_id = None;
    }
}

/// One group of a dual-group bracket.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Teams drawn into this group, in placement order.
    pub members: Vec<TeamId>,
    pub rounds: Rounds,
}

/// Seeded teams and, for grouped brackets, which group each was drawn into.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    pub seeds: Vec<TeamId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub distribution: BTreeMap<TeamId, GroupId>,
}

/// Bracket shape: a single tree, or two group trees feeding a final.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bracket {
    Plain {
        rounds: Rounds,
        #[serde(default)]
        seeds: SeedRecord,
    },
    Grouped {
        groups: BTreeMap<GroupId, Group>,
        final_stage: Rounds,
        #[serde(default)]
        seeds: SeedRecord,
    },
}

impl Bracket {
    pub fn seeds(&self) -> &SeedRecord {
        match self {
            Bracket::Plain { seeds, .. } | Bracket::Grouped { seeds, .. } => seeds,
        }
    }

    /// Rounds of a section, if the bracket has it.
    pub fn rounds(&self, section: Section) -> Option<&Rounds> {
        match (self, section) {
            (Bracket::Plain { rounds, .. }, Section::Main) => Some(rounds),
            (Bracket::Grouped { groups, .. }, Section::Group(g)) => groups.get(&g).map(|g| &g.rounds),
            (Bracket::Grouped { final_stage, .. }, Section::Final) => Some(final_stage),
            _ => None,
        }
    }

    pub fn rounds_mut(&mut self, section: Section) -> Option<&mut Rounds> {
        match (self, section) {
            (Bracket::Plain { rounds, .. }, Section::Main) => Some(rounds),
            (Bracket::Grouped { groups, .. }, Section::Group(g)) => groups.get_mut(&g).map(|g| &mut g.rounds),
            (Bracket::Grouped { final_stage, .. }, Section::Final) => Some(final_stage),
            _ => None,
        }
    }

    /// Sections in progression order: groups before the final.
    pub fn sections(&self) -> Vec<Section> {
        match self {
            Bracket::Plain { .. } => vec![Section::Main],
            Bracket::Grouped { groups, .. } => groups
                .keys()
                .map(|g| Section::Group(*g))
                .chain(std::iter::once(Section::Final))
                .collect(),
        }
    }

    pub fn match_at(&self, at: MatchRef) -> Option<&BracketMatch> {
        let round = at.round.checked_sub(1)? as usize;
        let position = at.position.checked_sub(1)? as usize;
        self.rounds(at.section)?.get(round)?.get(position)
    }

    pub fn match_at_mut(&mut self, at: MatchRef) -> Option<&mut BracketMatch> {
        let round = at.round.checked_sub(1)? as usize;
        let position = at.position.checked_sub(1)? as usize;
        self.rounds_mut(at.section)?.get_mut(round)?.get_mut(position)
    }

    /// Every match with its address, sections in progression order.
    pub fn matches(&self) -> Vec<(MatchRef, &BracketMatch)> {
        let mut out = Vec::new();
        for section in self.sections() {
            if let Some(rounds) = self.rounds(section) {
                for m in rounds.iter().flatten() {
                    out.push((MatchRef::new(section, m.round, m.position), m));
                }
            }
        }
        out
    }

    /// Winner of the deciding match, once known.
    pub fn champion(&self) -> Option<TeamId> {
        let last = match self {
            Bracket::Plain { rounds, .. } => rounds.last(),
            Bracket::Grouped { final_stage, .. } => final_stage.last(),
        };
        last.and_then(|r| r.first()).and_then(|m| m.winner_id)
    }

    /// Remove every team placement and winner.
    pub fn clear_placements(&mut self) {
        for section in self.sections() {
            if let Some(rounds) = self.rounds_mut(section) {
                rounds.iter_mut().flatten().for_each(BracketMatch::clear);
            }
        }
    }

    /// Check round/position numbering, forward links, and that no team sits in
    /// two slots of the same round. Round 1 of the two groups counts as one round.
    pub fn validate(&self) -> Result<(), EngineError> {
        for section in self.sections() {
            let rounds = self
                .rounds(section)
                .ok_or_else(|| EngineError::CorruptBracket(format!("missing section {section:?}")))?;
            validate_rounds(section, rounds)?;
        }
        if let Bracket::Grouped { groups, final_stage, .. } = self {
            if groups.len() != 2 {
                return Err(EngineError::CorruptBracket(format!("expected 2 groups, found {}", groups.len())));
            }
            for (id, group) in groups {
                if group.rounds.last().map_or(false, |r| r.len() != 1) {
                    return Err(EngineError::CorruptBracket(format!("group {id} does not end in a single match")));
                }
            }
            if final_stage.len() != 1 || final_stage[0].len() != 1 {
                return Err(EngineError::CorruptBracket("final stage must hold exactly one match".into()));
            }
            let mut first_round = HashSet::new();
            let opening = groups.values().filter_map(|g| g.rounds.first()).flatten();
            for team in opening.flat_map(|m| [m.team1_id, m.team2_id]).flatten() {
                if !first_round.insert(team) {
                    return Err(EngineError::DuplicatePlacement { team, round: 1 });
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a stored bracket and validate its links.
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let bracket: Bracket =
            serde_json::from_str(raw).map_err(|e| EngineError::CorruptBracket(e.to_string()))?;
        bracket.validate()?;
        Ok(bracket)
    }
}

fn validate_rounds(section: Section, rounds: &Rounds) -> Result<(), EngineError> {
    let corrupt = |at: MatchRef, what: &str| EngineError::CorruptBracket(format!("{at}: {what}"));
    for (ri, round) in rounds.iter().enumerate() {
        let round_no = ri as u32 + 1;
        let mut seen = HashSet::new();
        let mut fed = HashSet::new();
        for (pi, m) in round.iter().enumerate() {
            let at = MatchRef::new(section, round_no, pi as u32 + 1);
            if m.round != round_no || m.position != at.position {
                return Err(corrupt(at, "numbering out of order"));
            }
            for team in [m.team1_id, m.team2_id].into_iter().flatten() {
                if !seen.insert(team) {
                    return Err(EngineError::DuplicatePlacement { team, round: round_no });
                }
            }
            if let Some(w) = m.winner_id {
                if !m.has_team(w) {
                    return Err(corrupt(at, "winner is not one of the teams"));
                }
            }
            if m.next_match_position.is_some() != m.next_match_team_slot.is_some() {
                return Err(corrupt(at, "half-specified forward link"));
            }
            match (m.next(), rounds.get(ri + 1)) {
                (Some(next), Some(next_round)) => {
                    if next.position == 0 || next.position as usize > next_round.len() {
                        return Err(corrupt(at, "forward link points past the next round"));
                    }
                    if !fed.insert((next.position, next.slot)) {
                        return Err(corrupt(at, "two matches feed the same slot"));
                    }
                }
                (Some(_), None) => return Err(corrupt(at, "forward link out of the last round")),
                (None, Some(_)) => return Err(corrupt(at, "missing forward link")),
                (None, None) => {}
            }
        }
    }
    Ok(())
}

/// Persisted bracket with a version that increases on every changed save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BracketDocument {
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub structure: Bracket,
}

impl BracketDocument {
    pub fn new(structure: Bracket) -> Self {
        Self {
            version: 1,
            updated_at: Utc::now(),
            structure,
        }
    }

    /// Replace the structure, bumping the version.
    pub fn succeed(&self, structure: Bracket) -> Self {
        Self {
            version: self.version + 1,
            updated_at: Utc::now(),
            structure,
        }
    }
}
