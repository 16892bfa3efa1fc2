mod loader;
mod records;
mod worker;

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

pub use loader::{LoadError, LoadEvent, LoadProgress, load_dataset, spawn_load};
pub use records::{
    Group, GroupKind, Hierarchy, Occupation, ParseError, RecordSet, Relation, RelationType, Skill,
    parse_records,
};
pub use worker::{ParseRequest, ParseResponse, ParseWorker};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetFile {
    Occupations,
    Skills,
    OccupationGroups,
    SkillGroups,
    OccupationSkillRelations,
    OccupationHierarchy,
    SkillHierarchy,
}

impl DatasetFile {
    pub const ALL: [DatasetFile; 7] = [
        Self::Occupations,
        Self::Skills,
        Self::OccupationGroups,
        Self::SkillGroups,
        Self::OccupationSkillRelations,
        Self::OccupationHierarchy,
        Self::SkillHierarchy,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Occupations => "occupations.csv",
            Self::Skills => "skills.csv",
            Self::OccupationGroups => "occupation_groups.csv",
            Self::SkillGroups => "skill_groups.csv",
            Self::OccupationSkillRelations => "occupation_to_skill_relations.csv",
            Self::OccupationHierarchy => "occupation_hierarchy.csv",
            Self::SkillHierarchy => "skill_hierarchy.csv",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Occupations | Self::Skills | Self::OccupationGroups | Self::SkillGroups => {
                &["ID", "PREFERREDLABEL"]
            }
            Self::OccupationSkillRelations => &["OCCUPATIONID", "SKILLID", "RELATIONTYPE"],
            Self::OccupationHierarchy | Self::SkillHierarchy => &["PARENTID", "CHILDID"],
        }
    }
}

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Occupation {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Skill {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Group {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Id-keyed records that keep file order for deterministic iteration.
#[derive(Clone, Debug)]
pub struct RecordTable<T> {
    records: Vec<T>,
    index_by_id: HashMap<String, usize>,
}

impl<T: Keyed> RecordTable<T> {
    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let mut table = Self {
            records: Vec::new(),
            index_by_id: HashMap::new(),
        };
        for record in records {
            table.insert(record);
        }
        table
    }

    fn insert(&mut self, record: T) {
        // a later row with the same id replaces the earlier one in place
        if let Some(&index) = self.index_by_id.get(record.key()) {
            self.records[index] = record;
        } else {
            self.index_by_id
                .insert(record.key().to_owned(), self.records.len());
            self.records.push(record);
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index_by_id.get(id).map(|&index| &self.records[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Keyed> Default for RecordTable<T> {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct DatasetSummary {
    pub occupations: usize,
    pub skills: usize,
    pub groups: usize,
    pub relations: usize,
    pub hierarchies: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub occupations: RecordTable<Occupation>,
    pub skills: RecordTable<Skill>,
    pub groups: RecordTable<Group>,
    pub relations: Vec<Relation>,
    pub hierarchies: Vec<Hierarchy>,
    skill_connections: HashMap<String, usize>,
    occupation_skills: HashMap<String, usize>,
    relations_by_skill: HashMap<String, Vec<usize>>,
    relations_by_occupation: HashMap<String, Vec<usize>>,
}

impl Dataset {
    pub fn new(
        occupations: Vec<Occupation>,
        skills: Vec<Skill>,
        groups: Vec<Group>,
        relations: Vec<Relation>,
        hierarchies: Vec<Hierarchy>,
    ) -> Self {
        let mut skill_connections: HashMap<String, usize> = HashMap::new();
        let mut occupation_skills: HashMap<String, usize> = HashMap::new();
        let mut relations_by_skill: HashMap<String, Vec<usize>> = HashMap::new();
        let mut relations_by_occupation: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, relation) in relations.iter().enumerate() {
            *skill_connections
                .entry(relation.skill_id.clone())
                .or_default() += 1;
            *occupation_skills
                .entry(relation.occupation_id.clone())
                .or_default() += 1;
            relations_by_skill
                .entry(relation.skill_id.clone())
                .or_default()
                .push(index);
            relations_by_occupation
                .entry(relation.occupation_id.clone())
                .or_default()
                .push(index);
        }

        Self {
            occupations: RecordTable::from_records(occupations),
            skills: RecordTable::from_records(skills),
            groups: RecordTable::from_records(groups),
            relations,
            hierarchies,
            skill_connections,
            occupation_skills,
            relations_by_skill,
            relations_by_occupation,
        }
    }

    pub fn from_record_sets(sets: impl IntoIterator<Item = RecordSet>) -> Self {
        let mut occupations = Vec::new();
        let mut skills = Vec::new();
        let mut groups = Vec::new();
        let mut relations = Vec::new();
        let mut hierarchies = Vec::new();

        for set in sets {
            match set {
                RecordSet::Occupations(records) => occupations.extend(records),
                RecordSet::Skills(records) => skills.extend(records),
                RecordSet::Groups(records) => groups.extend(records),
                RecordSet::Relations(records) => relations.extend(records),
                RecordSet::Hierarchies(records) => hierarchies.extend(records),
            }
        }

        let dataset = Self::new(occupations, skills, groups, relations, hierarchies);
        let summary = dataset.summary();
        info!(
            occupations = summary.occupations,
            skills = summary.skills,
            groups = summary.groups,
            relations = summary.relations,
            hierarchies = summary.hierarchies,
            "assembled dataset"
        );
        dataset
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            occupations: self.occupations.len(),
            skills: self.skills.len(),
            groups: self.groups.len(),
            relations: self.relations.len(),
            hierarchies: self.hierarchies.len(),
        }
    }

    pub fn skill_connection_count(&self, skill_id: &str) -> usize {
        self.skill_connections.get(skill_id).copied().unwrap_or(0)
    }

    pub fn occupation_skill_count(&self, occupation_id: &str) -> usize {
        self.occupation_skills
            .get(occupation_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn relations_for_skill(&self, skill_id: &str) -> impl Iterator<Item = &Relation> {
        self.relations_by_skill
            .get(skill_id)
            .into_iter()
            .flatten()
            .map(|&index| &self.relations[index])
    }

    pub fn relations_for_occupation(&self, occupation_id: &str) -> impl Iterator<Item = &Relation> {
        self.relations_by_occupation
            .get(occupation_id)
            .into_iter()
            .flatten()
            .map(|&index| &self.relations[index])
    }

    pub fn occupations_in_group<'a>(
        &'a self,
        group_code: &'a str,
    ) -> impl Iterator<Item = &'a Occupation> + 'a {
        self.occupations
            .iter()
            .filter(move |occupation| occupation.group_code.as_deref() == Some(group_code))
    }

    pub fn group_total_skills(&self, group: &Group) -> usize {
        let Some(code) = group.code.as_deref() else {
            return 0;
        };
        self.occupations_in_group(code)
            .map(|occupation| self.occupation_skill_count(&occupation.id))
            .sum()
    }
}
