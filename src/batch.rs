//! Line-oriented batch scoring: one JSON patient form in, one JSON triage
//! result out, in input order.

use std::io::{BufRead, Write};

use crate::engine::TriageEngine;
use crate::models::{PatientForm, TriageResult};

/// Score every non-blank line of `input`. Lines that are not a JSON object,
/// including lines that are not UTF-8, still produce an output line (the safe
/// default). Returns lines scored.
pub fn score_lines<R: BufRead, W: Write>(
    engine: &TriageEngine,
    mut input: R,
    mut output: W,
) -> std::io::Result<usize> {
    let mut scored = 0;
    let mut line_no = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let result = match serde_json::from_slice::<PatientForm>(&buf) {
            Ok(form) => engine.predict_form(&form),
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Unreadable patient line");
                TriageResult::safe_default()
            }
        };

        serde_json::to_writer(&mut output, &result)?;
        output.write_all(b"\n")?;
        scored += 1;
    }
    output.flush()?;
    Ok(scored)
}
