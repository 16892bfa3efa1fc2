use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use super::records::RecordSet;
use super::worker::{ParseResponse, ParseWorker};
use super::{Dataset, DatasetFile};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load {file}: {source}")]
    Fetch {
        file: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("reader thread for {file} panicked")]
    ReaderPanicked { file: &'static str },
    #[error("failed to start parse worker: {0}")]
    WorkerSpawn(#[source] io::Error),
    #[error("parse worker disconnected")]
    WorkerDisconnected,
    #[error("parse worker answered for {received} while {expected} was pending")]
    ProtocolMismatch {
        expected: &'static str,
        received: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadProgress {
    pub percent: f32,
    pub stage: String,
}

impl LoadProgress {
    fn new(percent: f32, stage: &str) -> Self {
        Self {
            percent,
            stage: stage.to_owned(),
        }
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Finished(Result<Box<Dataset>, LoadError>),
}

const FETCHED_PERCENT: f32 = 20.0;
const PARSED_SPAN_PERCENT: f32 = 60.0;
const ASSEMBLED_PERCENT: f32 = 85.0;

fn fetch_all(data_dir: &Path) -> Result<Vec<(DatasetFile, String)>, LoadError> {
    thread::scope(|scope| {
        let handles = DatasetFile::ALL
            .iter()
            .map(|&file| {
                let path = data_dir.join(file.file_name());
                (file, scope.spawn(move || fs::read_to_string(path)))
            })
            .collect::<Vec<_>>();

        let mut files = Vec::with_capacity(handles.len());
        for (file, handle) in handles {
            let raw = handle
                .join()
                .map_err(|_| LoadError::ReaderPanicked {
                    file: file.file_name(),
                })?
                .map_err(|source| LoadError::Fetch {
                    file: file.file_name(),
                    source,
                })?;
            files.push((file, raw));
        }
        Ok(files)
    })
}

/// Reads every dataset file, parses each on the worker one at a time and
/// assembles the lookup maps. Any read failure aborts the whole load; a
/// file the worker cannot parse degrades to an empty record set.
pub fn load_dataset(
    data_dir: &Path,
    parse_yield: Duration,
    mut progress: impl FnMut(LoadProgress),
) -> Result<Dataset, LoadError> {
    progress(LoadProgress::new(0.0, "Initializing..."));
    let worker = ParseWorker::spawn().map_err(LoadError::WorkerSpawn)?;

    progress(LoadProgress::new(0.0, "Loading CSV files..."));
    let files = fetch_all(data_dir)?;
    progress(LoadProgress::new(FETCHED_PERCENT, "Processing core data..."));

    let file_count = files.len() as f32;
    let mut sets = Vec::with_capacity(files.len());
    for (position, (file, raw)) in files.into_iter().enumerate() {
        let response = worker.parse(file, raw)?;
        let set = match response {
            ParseResponse {
                success: true,
                data: Some(set),
                ..
            } => {
                info!(file = file.file_name(), records = set.len(), "processed file");
                set
            }
            ParseResponse { error: message, .. } => {
                error!(
                    file = file.file_name(),
                    error = message.as_deref().unwrap_or("unknown parsing error"),
                    "failed to process file, continuing without it"
                );
                RecordSet::empty_for(file)
            }
        };
        sets.push(set);

        let percent =
            FETCHED_PERCENT + (position as f32 + 1.0) * (PARSED_SPAN_PERCENT / file_count);
        progress(LoadProgress::new(percent, "Processing core data..."));
        thread::sleep(parse_yield);
    }
    worker.terminate();

    progress(LoadProgress::new(
        FETCHED_PERCENT + PARSED_SPAN_PERCENT,
        "Building data structures...",
    ));
    let dataset = Dataset::from_record_sets(sets);
    progress(LoadProgress::new(ASSEMBLED_PERCENT, "Building data structures..."));

    if dataset.skills.is_empty() {
        warn!("dataset has no skills; the graph will only show groups and occupations");
    }
    Ok(dataset)
}

pub fn spawn_load(data_dir: PathBuf, parse_yield: Duration) -> Receiver<LoadEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let progress_tx = tx.clone();
        let result = load_dataset(&data_dir, parse_yield, |progress| {
            let _ = progress_tx.send(LoadEvent::Progress(progress));
        });
        if let Err(load_error) = &result {
            error!(data_dir = %data_dir.display(), error = %load_error, "dataset load failed");
        }
        let _ = tx.send(LoadEvent::Finished(result.map(Box::new)));
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_dataset(dir: &Path, skip: Option<DatasetFile>) {
        let contents = [
            (
                DatasetFile::Occupations,
                "ID,PREFERREDLABEL,DESCRIPTION,OCCUPATIONGROUPCODE,CODE\nocc-1,Baker,Bakes,C1,C1.1\n",
            ),
            (
                DatasetFile::Skills,
                "ID,PREFERREDLABEL,DESCRIPTION,SKILLTYPE\nskill-1,Kneading,,skill\n",
            ),
            (
                DatasetFile::OccupationGroups,
                "ID,CODE,PREFERREDLABEL,DESCRIPTION\ngrp-1,C1,Food,\n",
            ),
            (DatasetFile::SkillGroups, "ID,CODE,PREFERREDLABEL\n"),
            (
                DatasetFile::OccupationSkillRelations,
                "OCCUPATIONID,SKILLID,RELATIONTYPE\nocc-1,skill-1,essential\n",
            ),
            (
                DatasetFile::OccupationHierarchy,
                "PARENTOBJECTTYPE,PARENTID,CHILDOBJECTTYPE,CHILDID\ngroup,grp-1,occupation,occ-1\n",
            ),
            (DatasetFile::SkillHierarchy, "BROKEN HEADER ONLY\n"),
        ];

        for (file, body) in contents {
            if Some(file) == skip {
                continue;
            }
            fs::write(dir.join(file.file_name()), body).expect("write fixture");
        }
    }

    #[test]
    fn loads_all_files_and_degrades_unparseable_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_dataset(dir.path(), None);

        let mut events = Vec::new();
        let dataset = load_dataset(dir.path(), Duration::ZERO, |progress| events.push(progress))
            .expect("dataset loads");

        assert_eq!(dataset.occupations.len(), 1);
        assert_eq!(dataset.skills.len(), 1);
        assert_eq!(dataset.groups.len(), 1);
        assert_eq!(dataset.relations.len(), 1);
        // skill_hierarchy.csv lacks its columns and degrades to empty
        assert_eq!(dataset.hierarchies.len(), 1);

        let percents = events.iter().map(|event| event.percent).collect::<Vec<_>>();
        assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(percents.last().copied(), Some(ASSEMBLED_PERCENT));
        assert!(events.iter().any(|event| event.stage == "Loading CSV files..."));
    }

    #[test]
    fn missing_file_fails_the_whole_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_dataset(dir.path(), Some(DatasetFile::SkillGroups));

        let error = load_dataset(dir.path(), Duration::ZERO, |_| {}).expect_err("load fails");
        assert!(matches!(
            error,
            LoadError::Fetch {
                file: "skill_groups.csv",
                ..
            }
        ));
    }

    #[test]
    fn spawned_load_reports_progress_then_finishes() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_dataset(dir.path(), None);

        let rx = spawn_load(dir.path().to_path_buf(), Duration::ZERO);
        let mut saw_progress = false;
        let mut finished = None;
        for event in rx.iter() {
            match event {
                LoadEvent::Progress(_) => saw_progress = true,
                LoadEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
            }
        }

        assert!(saw_progress);
        let dataset = finished.expect("finished event").expect("load succeeds");
        assert_eq!(dataset.summary().relations, 1);
    }
}
