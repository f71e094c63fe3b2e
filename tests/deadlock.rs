//! A thread holding the workspace lock populates the model while another
//! thread's container resolution waits for that same lock. Both must finish.

use anyhow::{Result, anyhow};
use jmodel::config::CacheConfig;
use jmodel::context::ModelContext;
use jmodel::manager::ElementManager;
use jmodel::workspace::{ClasspathResolver, ProjectConfig, RootEntry, Workspace};
use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const TIME_LIMIT: Duration = Duration::from_secs(20);

/// Resolves containers under the workspace lock. For project "B" it first
/// meets the other thread at the barrier so the lock is contended.
struct LockingResolver {
    entered: Arc<Barrier>,
}

impl ClasspathResolver for LockingResolver {
    fn container_roots(&self, workspace: &Workspace, project: &str) -> io::Result<Vec<RootEntry>> {
        if project == "B" {
            self.entered.wait();
        }
        let _guard = workspace.lock();
        Ok(vec![RootEntry::folder("src")])
    }
}

#[test]
fn container_resolution_and_locked_population_both_complete() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for project in ["A", "B"] {
        std::fs::create_dir_all(dir.path().join(project).join("src"))?;
    }

    let entered = Arc::new(Barrier::new(2));
    let workspace = Arc::new(
        Workspace::on_filesystem().with_resolver(Arc::new(LockingResolver {
            entered: entered.clone(),
        })),
    );
    for project in ["A", "B"] {
        workspace.add_project(ProjectConfig::new(project, dir.path().join(project)));
    }
    let context = Arc::new(ModelContext::new(CacheConfig::default().with_memory_ratio(1.0)));
    let manager = Arc::new(ElementManager::new(context, workspace.clone()));
    let project_a = manager.model().project("A");
    let project_b = manager.model().project("B");

    let (tx, rx) = mpsc::channel::<(&'static str, Result<usize, String>)>();

    let holder = {
        let manager = manager.clone();
        let workspace = workspace.clone();
        let entered = entered.clone();
        let tx = tx.clone();
        let project = project_a.clone();
        thread::spawn(move || {
            let _outer = workspace.lock();
            entered.wait();
            let result = manager
                .open(&project)
                .map(|info| info.child_count())
                .map_err(|e| e.to_string());
            let _ = tx.send(("holder", result));
        })
    };

    let resolver = {
        let manager = manager.clone();
        let project = project_b.clone();
        thread::spawn(move || {
            let result = manager
                .open(&project)
                .map(|info| info.child_count())
                .map_err(|e| e.to_string());
            let _ = tx.send(("resolver", result));
        })
    };

    let mut finished = Vec::new();
    for _ in 0..2 {
        let (name, result) = rx
            .recv_timeout(TIME_LIMIT)
            .map_err(|_| anyhow!("deadlock: finished so far {finished:?}"))?;
        assert_eq!(result, Ok(1), "{name} failed");
        finished.push(name);
    }

    holder.join().map_err(|_| anyhow!("holder panicked"))?;
    resolver.join().map_err(|_| anyhow!("resolver panicked"))?;
    assert!(manager.is_open(&project_a));
    assert!(manager.is_open(&project_b));
    Ok(())
}
