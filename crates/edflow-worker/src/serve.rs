//! Newline-delimited JSON request loop.

use std::io::{self, BufRead, Write};

use edflow_model::EngineError;
use tracing::{debug, info, warn};

use crate::protocol::{ErrorPayload, Request, Response, recover_id};
use crate::worker::Worker;

/// Counters for one serve session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: usize,
    pub failed: usize,
}

/// Decodes one line into a request, answering undecodable lines directly.
pub fn decode_line(line: &str) -> Result<Request, Response> {
    serde_json::from_str(line).map_err(|err| {
        let error = EngineError::InvalidRequest {
            message: err.to_string(),
        };
        warn!(error = %error, "undecodable request");
        Response::error(
            recover_id(line),
            ErrorPayload::from_error(&error, error.kind().as_str()),
        )
    })
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    serde_json::to_writer(&mut *output, response)?;
    output.write_all(b"\n")?;
    output.flush()
}

/// Answers every request line from `input` on `output`, one response per
/// line. Progress lines precede the final response of their request.
///
/// # Errors
///
/// Fails only when reading input or writing a final response fails.
pub fn serve<R: BufRead, W: Write>(
    worker: &mut Worker,
    input: R,
    output: &mut W,
) -> io::Result<ServeStats> {
    let mut stats = ServeStats::default();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.requests += 1;
        let response = match decode_line(&line) {
            Ok(request) => worker.handle(request, &mut |progress| {
                write_response(output, progress)
            }),
            Err(response) => response,
        };
        if response.error.is_some() {
            stats.failed += 1;
        }
        write_response(output, &response)?;
        debug!(id = %response.id, "response written");
    }
    info!(
        requests = stats.requests,
        failed = stats.failed,
        "input closed"
    );
    Ok(stats)
}
