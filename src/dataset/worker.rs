use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use super::loader::LoadError;
use super::records::{RecordSet, parse_records};
use super::DatasetFile;

pub struct ParseRequest {
    pub file: DatasetFile,
    pub csv_data: String,
    pub reply: Sender<ParseResponse>,
}

#[derive(Debug)]
pub struct ParseResponse {
    pub file: DatasetFile,
    pub success: bool,
    pub data: Option<RecordSet>,
    pub error: Option<String>,
}

/// Dedicated parse thread. Requests and responses are moved across
/// channels; the worker never touches loader or engine state.
pub struct ParseWorker {
    requests: Option<Sender<ParseRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl ParseWorker {
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<ParseRequest>();
        let handle = thread::Builder::new()
            .name("csv-parse-worker".to_owned())
            .spawn(move || run_worker(rx))?;

        Ok(Self {
            requests: Some(tx),
            handle: Some(handle),
        })
    }

    /// Sends one request and waits for its response. Each request carries its
    /// own reply channel, which is dropped once the response arrives, so
    /// responses for different files can never cross.
    pub fn parse(&self, file: DatasetFile, csv_data: String) -> Result<ParseResponse, LoadError> {
        let requests = self.requests.as_ref().ok_or(LoadError::WorkerDisconnected)?;
        let (reply, response_rx) = mpsc::channel();

        requests
            .send(ParseRequest {
                file,
                csv_data,
                reply,
            })
            .map_err(|_| LoadError::WorkerDisconnected)?;

        let response = response_rx
            .recv()
            .map_err(|_| LoadError::WorkerDisconnected)?;
        if response.file != file {
            return Err(LoadError::ProtocolMismatch {
                expected: file.file_name(),
                received: response.file.file_name(),
            });
        }
        Ok(response)
    }

    pub fn terminate(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.requests = None;
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("parse worker panicked");
        }
    }
}

impl Drop for ParseWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(requests: Receiver<ParseRequest>) {
    debug!("parse worker started");
    while let Ok(request) = requests.recv() {
        let ParseRequest {
            file,
            csv_data,
            reply,
        } = request;
        let name = file.file_name();
        info!(file = name, characters = csv_data.len(), "worker parsing");

        let response = match parse_records(file, &csv_data) {
            Ok(set) => {
                info!(file = name, rows = set.len(), "worker parsed");
                ParseResponse {
                    file,
                    success: true,
                    data: Some(set),
                    error: None,
                }
            }
            Err(parse_error) => {
                warn!(file = name, error = %parse_error, "worker failed to parse");
                ParseResponse {
                    file,
                    success: false,
                    data: None,
                    error: Some(parse_error.to_string()),
                }
            }
        };

        if reply.send(response).is_err() {
            debug!(file = name, "requester went away before the response");
        }
    }
    debug!("parse worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_one_request_per_file() {
        let worker = ParseWorker::spawn().expect("spawn worker");

        let skills = worker
            .parse(
                DatasetFile::Skills,
                "ID,PREFERREDLABEL\nskill-1,Welding\nskill-2,Typing\n".to_owned(),
            )
            .expect("response");
        assert!(skills.success);
        assert_eq!(skills.file, DatasetFile::Skills);
        assert_eq!(skills.data.map(|set| set.len()), Some(2));

        let broken = worker
            .parse(DatasetFile::OccupationSkillRelations, "NOPE\n1\n".to_owned())
            .expect("response");
        assert!(!broken.success);
        assert!(broken.data.is_none());
        assert!(broken.error.is_some_and(|message| message.contains("OCCUPATIONID")));

        worker.terminate();
    }
}
