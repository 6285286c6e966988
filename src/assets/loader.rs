use std::path::PathBuf;
use std::thread::JoinHandle;

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use log::{debug, error};

use super::import::{import_scene, ImportedScene};
use crate::error::AssetError;

pub struct LoadRequest {
    pub name: String,
    pub path: PathBuf,
}

pub struct LoadResponse {
    pub name: String,
    pub path: PathBuf,
    pub result: Result<ImportedScene, AssetError>,
}

fn loader_loop(rx: Receiver<LoadRequest>, tx: Sender<LoadResponse>, workers: usize) {
    while let Ok(LoadRequest { name, path }) = rx.recv() {
        debug!("importing '{}' from {}", name, path.display());
        let result = import_scene(&path, workers);
        if let Err(e) = &result {
            error!("failed to import '{}' from {}: {}", name, path.display(), e);
        }
        if tx.send(LoadResponse { name, path, result }).is_err() {
            break;
        }
    }
}

/// Imports scenes on a dedicated thread. Only CPU work happens there; the
/// owner of the `AssetPool` commits each response on its own thread.
pub struct LoaderThread {
    requests: Option<Sender<LoadRequest>>,
    responses: Receiver<LoadResponse>,
    handle: Option<JoinHandle<()>>,
}

impl LoaderThread {
    pub fn spawn(workers: usize) -> Self {
        let (req_tx, req_rx) = crossbeam::channel::unbounded::<LoadRequest>();
        let (res_tx, res_rx) = crossbeam::channel::unbounded::<LoadResponse>();
        let handle = std::thread::Builder::new()
            .name("scene loader".into())
            .spawn(move || loader_loop(req_rx, res_tx, workers))
            .map_err(|e| error!("failed to spawn loader thread: {}", e))
            .ok();
        Self {
            requests: Some(req_tx),
            responses: res_rx,
            handle,
        }
    }

    /// Queues an import. Returns `false` if the loader thread is gone.
    pub fn request(&self, name: impl Into<String>, path: impl Into<PathBuf>) -> bool {
        let request = LoadRequest {
            name: name.into(),
            path: path.into(),
        };
        match &self.requests {
            Some(tx) if self.handle.is_some() => tx.send(request).is_ok(),
            _ => false,
        }
    }

    /// A finished import, if one is waiting.
    pub fn try_recv(&self) -> Option<LoadResponse> {
        match self.responses.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the next import finishes. `None` once the thread exited.
    pub fn recv(&self) -> Option<LoadResponse> {
        self.responses.recv().ok()
    }
}

impl Drop for LoaderThread {
    fn drop(&mut self) {
        // closing the request channel ends the loop
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("loader thread panicked");
            }
        }
    }
}
