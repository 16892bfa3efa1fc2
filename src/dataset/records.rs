use std::fmt;

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::DatasetFile;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{file} is missing required column {column}")]
    MissingColumn {
        file: &'static str,
        column: &'static str,
    },
    #[error("{file} is not valid CSV: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Essential,
    Optional,
}

impl RelationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "essential" => Some(Self::Essential),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Occupation,
    Skill,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Occupation {
    pub id: String,
    pub code: Option<String>,
    pub group_code: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl Occupation {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown Occupation")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skill {
    pub id: String,
    pub skill_type: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl Skill {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown Skill")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub id: String,
    pub kind: GroupKind,
    pub code: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl Group {
    pub fn display_label(&self) -> String {
        match (&self.label, &self.code) {
            (Some(label), _) => label.clone(),
            (None, Some(code)) => format!("Group {code}"),
            (None, None) => format!("Group {}", self.id),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub occupation_id: String,
    pub skill_id: String,
    pub relation_type: RelationType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hierarchy {
    pub parent_type: Option<String>,
    pub parent_id: String,
    pub child_type: Option<String>,
    pub child_id: String,
}

#[derive(Clone, Debug)]
pub enum RecordSet {
    Occupations(Vec<Occupation>),
    Skills(Vec<Skill>),
    Groups(Vec<Group>),
    Relations(Vec<Relation>),
    Hierarchies(Vec<Hierarchy>),
}

impl RecordSet {
    pub fn empty_for(file: DatasetFile) -> Self {
        match file {
            DatasetFile::Occupations => Self::Occupations(Vec::new()),
            DatasetFile::Skills => Self::Skills(Vec::new()),
            DatasetFile::OccupationGroups | DatasetFile::SkillGroups => Self::Groups(Vec::new()),
            DatasetFile::OccupationSkillRelations => Self::Relations(Vec::new()),
            DatasetFile::OccupationHierarchy | DatasetFile::SkillHierarchy => {
                Self::Hierarchies(Vec::new())
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Occupations(records) => records.len(),
            Self::Skills(records) => records.len(),
            Self::Groups(records) => records.len(),
            Self::Relations(records) => records.len(),
            Self::Hierarchies(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct RowRejection(&'static str);

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

fn clean_cell(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "null" {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn cleaned<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(clean_cell))
}

#[derive(Deserialize)]
struct OccupationRow {
    #[serde(rename = "ID", default, deserialize_with = "cleaned")]
    id: Option<String>,
    #[serde(rename = "CODE", default, deserialize_with = "cleaned")]
    code: Option<String>,
    #[serde(rename = "OCCUPATIONGROUPCODE", default, deserialize_with = "cleaned")]
    group_code: Option<String>,
    #[serde(rename = "PREFERREDLABEL", default, deserialize_with = "cleaned")]
    label: Option<String>,
    #[serde(rename = "DESCRIPTION", default, deserialize_with = "cleaned")]
    description: Option<String>,
}

impl OccupationRow {
    fn into_record(self) -> Result<Occupation, RowRejection> {
        Ok(Occupation {
            id: self.id.ok_or(RowRejection("missing ID"))?,
            code: self.code,
            group_code: self.group_code,
            label: self.label,
            description: self.description,
        })
    }
}

#[derive(Deserialize)]
struct SkillRow {
    #[serde(rename = "ID", default, deserialize_with = "cleaned")]
    id: Option<String>,
    #[serde(rename = "SKILLTYPE", default, deserialize_with = "cleaned")]
    skill_type: Option<String>,
    #[serde(rename = "PREFERREDLABEL", default, deserialize_with = "cleaned")]
    label: Option<String>,
    #[serde(rename = "DESCRIPTION", default, deserialize_with = "cleaned")]
    description: Option<String>,
}

impl SkillRow {
    fn into_record(self) -> Result<Skill, RowRejection> {
        Ok(Skill {
            id: self.id.ok_or(RowRejection("missing ID"))?,
            skill_type: self.skill_type,
            label: self.label,
            description: self.description,
        })
    }
}

#[derive(Deserialize)]
struct GroupRow {
    #[serde(rename = "ID", default, deserialize_with = "cleaned")]
    id: Option<String>,
    #[serde(rename = "CODE", default, deserialize_with = "cleaned")]
    code: Option<String>,
    #[serde(rename = "PREFERREDLABEL", default, deserialize_with = "cleaned")]
    label: Option<String>,
    #[serde(rename = "DESCRIPTION", default, deserialize_with = "cleaned")]
    description: Option<String>,
}

impl GroupRow {
    fn into_group(self, kind: GroupKind) -> Result<Group, RowRejection> {
        Ok(Group {
            id: self.id.ok_or(RowRejection("missing ID"))?,
            kind,
            code: self.code,
            label: self.label,
            description: self.description,
        })
    }
}

#[derive(Deserialize)]
struct RelationRow {
    #[serde(rename = "OCCUPATIONID", default, deserialize_with = "cleaned")]
    occupation_id: Option<String>,
    #[serde(rename = "SKILLID", default, deserialize_with = "cleaned")]
    skill_id: Option<String>,
    #[serde(rename = "RELATIONTYPE", default, deserialize_with = "cleaned")]
    relation_type: Option<String>,
}

impl RelationRow {
    fn into_record(self) -> Result<Relation, RowRejection> {
        let relation_type = self
            .relation_type
            .as_deref()
            .and_then(RelationType::parse)
            .ok_or(RowRejection("unknown RELATIONTYPE"))?;
        Ok(Relation {
            occupation_id: self
                .occupation_id
                .ok_or(RowRejection("missing OCCUPATIONID"))?,
            skill_id: self.skill_id.ok_or(RowRejection("missing SKILLID"))?,
            relation_type,
        })
    }
}

#[derive(Deserialize)]
struct HierarchyRow {
    #[serde(rename = "PARENTOBJECTTYPE", default, deserialize_with = "cleaned")]
    parent_type: Option<String>,
    #[serde(rename = "PARENTID", default, deserialize_with = "cleaned")]
    parent_id: Option<String>,
    #[serde(rename = "CHILDOBJECTTYPE", default, deserialize_with = "cleaned")]
    child_type: Option<String>,
    #[serde(rename = "CHILDID", default, deserialize_with = "cleaned")]
    child_id: Option<String>,
}

impl HierarchyRow {
    fn into_record(self) -> Result<Hierarchy, RowRejection> {
        Ok(Hierarchy {
            parent_type: self.parent_type,
            parent_id: self.parent_id.ok_or(RowRejection("missing PARENTID"))?,
            child_type: self.child_type,
            child_id: self.child_id.ok_or(RowRejection("missing CHILDID"))?,
        })
    }
}

fn parse_rows<R, T>(
    file: DatasetFile,
    raw: &str,
    convert: impl Fn(R) -> Result<T, RowRejection>,
) -> Result<Vec<T>, ParseError>
where
    R: DeserializeOwned,
{
    let name = file.file_name();
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| ParseError::Csv { file: name, source })?
        .clone();
    for &column in file.required_columns() {
        if !headers.iter().any(|header| header == column) {
            return Err(ParseError::MissingColumn { file: name, column });
        }
    }

    let mut records = Vec::new();
    let mut rejected = 0usize;
    for (row_index, row) in reader.deserialize::<R>().enumerate() {
        // header is line 1
        let line = row_index + 2;
        match row {
            Ok(row) => match convert(row) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    rejected += 1;
                    debug!(file = name, line, %reason, "rejected row");
                }
            },
            Err(error) => {
                rejected += 1;
                debug!(file = name, line, %error, "malformed row");
            }
        }
    }

    if rejected > 0 {
        warn!(file = name, rejected, accepted = records.len(), "dropped invalid rows");
    }
    Ok(records)
}

pub fn parse_records(file: DatasetFile, raw: &str) -> Result<RecordSet, ParseError> {
    let set = match file {
        DatasetFile::Occupations => {
            RecordSet::Occupations(parse_rows(file, raw, OccupationRow::into_record)?)
        }
        DatasetFile::Skills => RecordSet::Skills(parse_rows(file, raw, SkillRow::into_record)?),
        DatasetFile::OccupationGroups => RecordSet::Groups(parse_rows(file, raw, |row: GroupRow| {
            row.into_group(GroupKind::Occupation)
        })?),
        DatasetFile::SkillGroups => RecordSet::Groups(parse_rows(file, raw, |row: GroupRow| {
            row.into_group(GroupKind::Skill)
        })?),
        DatasetFile::OccupationSkillRelations => {
            RecordSet::Relations(parse_rows(file, raw, RelationRow::into_record)?)
        }
        DatasetFile::OccupationHierarchy | DatasetFile::SkillHierarchy => {
            RecordSet::Hierarchies(parse_rows(file, raw, HierarchyRow::into_record)?)
        }
    };
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_placeholder_cells() {
        let raw = "ID,PREFERREDLABEL,DESCRIPTION,OCCUPATIONGROUPCODE,CODE\n\
                   occ-1,  Baker ,nan,C1,1.1\n\
                   occ-2,null,,C1,1.2\n";
        let RecordSet::Occupations(rows) =
            parse_records(DatasetFile::Occupations, raw).expect("parses")
        else {
            panic!("wrong record set");
        };

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label.as_deref(), Some("Baker"));
        assert_eq!(rows[0].description, None);
        assert_eq!(rows[1].label, None);
        assert_eq!(rows[1].display_label(), "Unknown Occupation");
        assert_eq!(rows[1].group_code.as_deref(), Some("C1"));
    }

    #[test]
    fn rejects_rows_without_ids_or_with_unknown_relation_type() {
        let raw = "OCCUPATIONID,SKILLID,RELATIONTYPE\n\
                   occ-1,skill-1,essential\n\
                   occ-1,,optional\n\
                   occ-2,skill-2,sometimes\n\
                   occ-3,skill-3,Optional\n";
        let RecordSet::Relations(rows) =
            parse_records(DatasetFile::OccupationSkillRelations, raw).expect("parses")
        else {
            panic!("wrong record set");
        };

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].relation_type, RelationType::Essential);
        assert_eq!(rows[1].relation_type, RelationType::Optional);
        assert_eq!(rows[1].skill_id, "skill-3");
    }

    #[test]
    fn missing_required_column_fails_the_file() {
        let raw = "ID,DESCRIPTION\nskill-1,something\n";
        let error = parse_records(DatasetFile::Skills, raw).expect_err("missing label column");
        assert!(matches!(
            error,
            ParseError::MissingColumn {
                column: "PREFERREDLABEL",
                ..
            }
        ));
    }

    #[test]
    fn group_files_are_tagged_with_their_kind() {
        let raw = "ID,CODE,PREFERREDLABEL,DESCRIPTION\ngrp-1,S1,,\n";
        let RecordSet::Groups(rows) = parse_records(DatasetFile::SkillGroups, raw).expect("parses")
        else {
            panic!("wrong record set");
        };

        assert_eq!(rows[0].kind, GroupKind::Skill);
        assert_eq!(rows[0].display_label(), "Group S1");
    }

    #[test]
    fn hierarchy_rows_keep_object_types() {
        let raw = "PARENTOBJECTTYPE,PARENTID,CHILDOBJECTTYPE,CHILDID\n\
                   iscogroup,grp-1,escooccupation,occ-1\n";
        let RecordSet::Hierarchies(rows) =
            parse_records(DatasetFile::OccupationHierarchy, raw).expect("parses")
        else {
            panic!("wrong record set");
        };

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parent_type.as_deref(), Some("iscogroup"));
        assert_eq!(rows[0].child_id, "occ-1");
    }
}
