// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// LPR/LPD client (RFC 1179) for network label printers.
//
// Most industrial label printers accept raw LPR on port 515 even when they
// speak nothing newer. The protocol is simple: open connection, send a
// control file (metadata), then send the data file (document bytes), with a
// one-byte ACK after each step.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, warn};

use etikett_core::error::{EtikettError, Result};

use crate::dispatch::PrintDispatcher;

/// Default LPR port.
pub const LPR_PORT: u16 = 515;

/// Timeout for the whole LPR exchange.
const LPR_TIMEOUT_SECS: u64 = 60;

/// Local hostname written into control files.
const CLIENT_NAME: &str = "etikett";

/// Minimal RFC 1179 client bound to one printer host.
pub struct LprDispatcher {
    host: String,
    port: u16,
    /// Queue used when a job names no printer.
    default_queue: String,
}

impl LprDispatcher {
    pub fn new(host: impl Into<String>, port: u16, default_queue: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            default_queue: default_queue.into(),
        }
    }
}

impl PrintDispatcher for LprDispatcher {
    async fn send(
        &self,
        bytes: &[u8],
        printer_name: Option<&str>,
        job_name: &str,
    ) -> Result<String> {
        let queue = printer_name.unwrap_or(&self.default_queue);
        let addr = format!("{}:{}", self.host, self.port);
        tokio::time::timeout(
            Duration::from_secs(LPR_TIMEOUT_SECS),
            send_lpr(&addr, queue, bytes, job_name),
        )
        .await
        .map_err(|_| {
            EtikettError::Dispatch(format!(
                "LPR exchange with {addr} timed out after {LPR_TIMEOUT_SECS}s"
            ))
        })?
    }
}

async fn read_ack(stream: &mut TcpStream, stage: &str) -> Result<u8> {
    let mut ack = [0u8; 1];
    stream
        .read_exact(&mut ack)
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR {stage} ack: {e}")))?;
    Ok(ack[0])
}

/// Run one RFC 1179 receive-job exchange:
/// 1. "receive a printer job" command (0x02 queue LF)
/// 2. control file with job metadata
/// 3. data file with the document bytes
async fn send_lpr(addr: &str, queue: &str, document_bytes: &[u8], job_name: &str) -> Result<String> {
    info!(addr = %addr, queue, job = job_name, "connecting via LPR");

    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR connect to {addr}: {e}")))?;

    let cmd = format!("\x02{queue}\n");
    stream
        .write_all(cmd.as_bytes())
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR command: {e}")))?;

    if read_ack(&mut stream, "job").await? != 0 {
        return Err(EtikettError::Dispatch(
            "LPR printer rejected the job request".into(),
        ));
    }

    // Job number is per-connection, so a constant is fine here.
    let job_num = 1;
    let control_file = format!(
        "H{CLIENT_NAME}\nP{CLIENT_NAME}\nJ{job_name}\nldfA{job_num:03}{CLIENT_NAME}\nUdfA{job_num:03}{CLIENT_NAME}\nN{job_name}\n"
    );
    let cf_header = format!("\x02{} cfA{job_num:03}{CLIENT_NAME}\n", control_file.len());

    stream
        .write_all(cf_header.as_bytes())
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR control header: {e}")))?;

    if read_ack(&mut stream, "control header").await? != 0 {
        return Err(EtikettError::Dispatch(
            "LPR printer rejected the control file".into(),
        ));
    }

    stream
        .write_all(control_file.as_bytes())
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR control file: {e}")))?;
    stream
        .write_all(&[0])
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR control term: {e}")))?;

    if read_ack(&mut stream, "control file").await? != 0 {
        return Err(EtikettError::Dispatch(
            "LPR printer rejected the control file contents".into(),
        ));
    }

    let df_header = format!("\x03{} dfA{job_num:03}{CLIENT_NAME}\n", document_bytes.len());
    stream
        .write_all(df_header.as_bytes())
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR data header: {e}")))?;

    if read_ack(&mut stream, "data header").await? != 0 {
        return Err(EtikettError::Dispatch(
            "LPR printer rejected the data file".into(),
        ));
    }

    stream
        .write_all(document_bytes)
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR data send: {e}")))?;
    stream
        .write_all(&[0])
        .await
        .map_err(|e| EtikettError::Dispatch(format!("LPR data term: {e}")))?;

    if read_ack(&mut stream, "final").await? != 0 {
        // Some firmwares misreport the final ack after accepting the data.
        warn!("LPR printer returned non-zero ack after data transfer");
    }

    info!(job = job_name, "LPR job sent");
    Ok(format!("job '{job_name}' accepted by {addr} queue {queue}"))
}
