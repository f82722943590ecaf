// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::containers::{ContainerError, VolumeMap};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

const PROD: &str = "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.fits";
const TASK_ID: &str = "TskAgent_01_01_20240101T000000-0001";

/// Scripted container runtime: create always yields `cont-1`; inspect
/// pops pre-loaded template outputs.
struct FakeRuntime {
    inspects: Mutex<VecDeque<String>>,
    removed: Mutex<Vec<String>>,
    fail_create: bool,
}

impl FakeRuntime {
    fn new(inspects: &[serde_json::Value]) -> Arc<Self> {
        Arc::new(Self {
            inspects: Mutex::new(inspects.iter().map(|v| v.to_string()).collect()),
            removed: Mutex::new(Vec::new()),
            fail_create: false,
        })
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(
        &self,
        _image: &str,
        _opts: &[String],
        _mapping: &VolumeMap,
        _exe: &str,
        _args: &[String],
    ) -> Result<String, ContainerError> {
        if self.fail_create {
            return Err(ContainerError::Launch {
                cmd_line: "docker run".into(),
                detail: "no such image".into(),
            });
        }
        Ok("cont-1".to_string())
    }

    async fn inspect(&self, id: &str, _format: Option<&str>) -> Result<String, ContainerError> {
        self.inspects
            .lock()
            .pop_front()
            .ok_or_else(|| ContainerError::Inspect(id.to_string(), "gone".into()))
    }

    async fn kill(&self, _id: &str) -> Result<(), ContainerError> {
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        self.removed.lock().push(id.to_string());
        Ok(())
    }
}

fn inspect_json(status: &str, exit_code: i64) -> serde_json::Value {
    json!({
        "Id": "cont-1",
        "State": { "Status": "x", "ExitCode": exit_code,
                   "StartedAt": "2024-01-01T00:00:01Z", "FinishedAt": "" },
        "Path": "python",
        "Args": [],
        "Config": { "WorkingDir": format!("/qpf/run/{TASK_ID}") },
        "Task_Status": status
    })
}

struct Fixture {
    _dir: tempfile::TempDir,
    wa: WorkArea,
    in_queue: Arc<Queue<TaskAssignment>>,
    out_queue: Arc<Queue<SpectrumUpdate>>,
    task_queue: Arc<Queue<TaskFrame>>,
    quit: CancellationToken,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "20240101T000000").unwrap();
    Fixture {
        wa,
        _dir: dir,
        in_queue: Arc::new(Queue::new()),
        out_queue: Arc::new(Queue::new()),
        task_queue: Arc::new(Queue::new()),
        quit: CancellationToken::new(),
    }
}

fn agent(f: &Fixture, runtime: Arc<FakeRuntime>) -> TaskAgent {
    TaskAgent::new(
        f.wa.clone(),
        "TskAgent_01_01".to_string(),
        Arc::clone(&f.in_queue),
        Arc::clone(&f.out_queue),
        Arc::clone(&f.task_queue),
        runtime,
        f.quit.clone(),
    )
}

/// Lay out a ready-to-run task folder with one input, one output and
/// one log file already present.
fn seed_task(f: &Fixture) -> TaskAssignment {
    let folder = f.wa.task_folder(TASK_ID);
    for sub in ["in", "out", "log"] {
        std::fs::create_dir_all(folder.join(sub)).unwrap();
    }
    std::fs::write(folder.join("in").join(PROD), b"x").unwrap();
    std::fs::write(
        folder.join("out/EUC_QLA_CAT-12345-120-M_20240101T000100.0Z_01.00.fits"),
        b"y",
    )
    .unwrap();
    std::fs::write(
        folder.join("log/EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.log"),
        b"z",
    )
    .unwrap();
    std::fs::write(
        folder.join("qla-proc.cfg"),
        serde_json::to_vec(&json!({
            "processor": "qla-proc",
            "script": "driver.py",
            "image": "debian",
            "exe": "python",
            "input": "in/*.fits",
            "output": "out/*.fits",
            "log": "log/*.log",
            "args": "-i {input}"
        }))
        .unwrap(),
    )
    .unwrap();
    TaskAssignment {
        task_id: TASK_ID.to_string(),
        task_folder: folder,
        processor: "qla-proc".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn frame_sequence_runs_scheduled_running_finished() {
    let f = fixture();
    let runtime = FakeRuntime::new(&[
        inspect_json("RUNNING", 0),  // first inspect after launch
        inspect_json("RUNNING", 0),  // poll 1
        inspect_json("FINISHED", 0), // poll 2
    ]);
    let mut ag = agent(&f, Arc::clone(&runtime));
    f.in_queue.push(seed_task(&f));

    ag.iterate().await; // launch
    ag.iterate().await; // running
    ag.iterate().await; // finished + staging

    let frames = f.task_queue.drain();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].just_created);
    assert_eq!(frames[0].status, TaskStatus::Scheduled);
    assert!(!frames[1].just_created);
    assert_eq!(frames[1].status, TaskStatus::Running);
    assert_eq!(frames[2].status, TaskStatus::Finished);
    assert!(frames.iter().all(|fr| fr.task_id == TASK_ID && fr.cont_id == "cont-1"));
}

#[tokio::test(start_paused = true)]
async fn terminal_status_stages_outputs_and_defers_removal() {
    let f = fixture();
    let runtime = FakeRuntime::new(&[
        inspect_json("RUNNING", 0),
        inspect_json("FINISHED", 0),
    ]);
    let mut ag = agent(&f, Arc::clone(&runtime));
    f.in_queue.push(seed_task(&f));

    ag.iterate().await;
    ag.iterate().await;

    // Logs went to the outbox, outputs went back to the inbox
    assert!(f
        .wa
        .local_outputs
        .join("EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.log")
        .is_file());
    assert!(f
        .wa
        .local_inbox
        .join("EUC_QLA_CAT-12345-120-M_20240101T000100.0Z_01.00.fits")
        .is_file());
    // The container is parked for deferred removal, not removed yet
    assert_eq!(ag.pending_removals(), 1);
    assert!(runtime.removed.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn inspect_carries_io_summary() {
    let f = fixture();
    let runtime = FakeRuntime::new(&[inspect_json("RUNNING", 0)]);
    let mut ag = agent(&f, runtime);
    f.in_queue.push(seed_task(&f));

    ag.iterate().await;

    let frames = f.task_queue.drain();
    let io = &frames[0].inspect["IO"];
    assert_eq!(io["input"], PROD);
    assert_eq!(io["p_log"], "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.log");
}

#[tokio::test(start_paused = true)]
async fn failed_inspect_is_transient() {
    let f = fixture();
    // Only the launch-time inspect is scripted; the next poll fails
    let runtime = FakeRuntime::new(&[inspect_json("RUNNING", 0)]);
    let mut ag = agent(&f, runtime);
    f.in_queue.push(seed_task(&f));

    ag.iterate().await; // launch
    ag.iterate().await; // poll fails, no frame, task still current

    let frames = f.task_queue.drain();
    assert_eq!(frames.len(), 1);
    // Spectrum still published every active iteration
    assert!(f.out_queue.len() >= 2);
}

#[tokio::test(start_paused = true)]
async fn launch_failure_drops_the_task() {
    let f = fixture();
    let runtime = Arc::new(FakeRuntime {
        inspects: Mutex::new(VecDeque::new()),
        removed: Mutex::new(Vec::new()),
        fail_create: true,
    });
    let mut ag = agent(&f, runtime);
    f.in_queue.push(seed_task(&f));

    ag.iterate().await;

    assert!(f.task_queue.is_empty());
    ag.iterate().await; // backlog is empty again, nothing to do
    assert!(f.task_queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn spectrum_counts_one_container_across_frames() {
    let f = fixture();
    let runtime = FakeRuntime::new(&[
        inspect_json("RUNNING", 0),
        inspect_json("RUNNING", 0),
        inspect_json("FINISHED", 0),
    ]);
    let mut ag = agent(&f, runtime);
    f.in_queue.push(seed_task(&f));

    ag.iterate().await;
    ag.iterate().await;
    ag.iterate().await;

    let last = f.out_queue.drain().pop().expect("spectrum updates published");
    assert_eq!(last.counts["FINISHED"], 1);
    assert_eq!(last.counts.values().sum::<u32>(), 1);
}
