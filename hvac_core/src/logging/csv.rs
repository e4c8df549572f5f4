// Small CSV audit trails alongside the tracing logs — one row per billing
// or scheduling event, for operators who want a flat file rather than a log
// pipeline. Best-effort: a write failure is logged via tracing and dropped,
// never escalated into the tick loop that produced the event.
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
};
use tracing::warn;

static FEES: OnceCell<Arc<Mutex<BufWriter<tokio::fs::File>>>> = OnceCell::const_new();
static SCHED: OnceCell<Arc<Mutex<BufWriter<tokio::fs::File>>>> = OnceCell::const_new();

async fn ensure_dir() {
    let _ = fs::create_dir_all("logs").await;
}

async fn get_file(
    cell: &OnceCell<Arc<Mutex<BufWriter<tokio::fs::File>>>>,
    path: &str,
    header: &str,
) -> Option<Arc<Mutex<BufWriter<tokio::fs::File>>>> {
    let result = cell
        .get_or_try_init(|| async move {
            ensure_dir().await;
            let fresh = !fs::try_exists(path).await.unwrap_or(false);
            let f = OpenOptions::new().create(true).append(true).open(path).await?;
            let writer = BufWriter::new(f);
            let m = Arc::new(Mutex::new(writer));
            if fresh {
                let mut g = m.lock().await;
                g.write_all(header.as_bytes()).await?;
                g.flush().await?;
            }
            Ok::<_, std::io::Error>(m)
        })
        .await;
    match result {
        Ok(arc) => Some(arc.clone()),
        Err(e) => {
            warn!(error = %e, path, "csv log: could not open file");
            None
        }
    }
}

/// fees.csv: ts,room_id,event,fee,total_fee
pub async fn log_fee_event(room_id: &str, event: &str, fee: f64, total_fee: f64) {
    let ts = Utc::now().to_rfc3339();
    let line = format!("{ts},{room_id},{event},{fee:.4},{total_fee:.4}\n");
    let Some(file) = get_file(&FEES, "logs/fees.csv", "ts,room_id,event,fee,total_fee\n").await else {
        return;
    };
    let mut f = file.lock().await;
    if f.write_all(line.as_bytes()).await.is_ok() {
        let _ = f.flush().await;
    }
}

/// scheduler.csv: ts,room_id,event,detail
pub async fn log_dispatch_event(room_id: &str, event: &str, detail: &str) {
    let ts = Utc::now().to_rfc3339();
    let line = format!("{ts},{room_id},{event},{detail}\n");
    let Some(file) = get_file(&SCHED, "logs/scheduler.csv", "ts,room_id,event,detail\n").await else {
        return;
    };
    let mut f = file.lock().await;
    if f.write_all(line.as_bytes()).await.is_ok() {
        let _ = f.flush().await;
    }
}
