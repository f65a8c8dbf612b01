//! Output for the presentation layer: plain text for terminals, JSON for tools.

use serde_json::{json, Value};

use crate::crash_dump::{CrashDirectory, CrashLog};
use crate::domain::TriageError;
use crate::kernel_log::{CallTraceBlock, StackFrame};
use crate::resolver::{FrameSelection, SourceLocation, TraceSelection};

/// Writes results to stdout in the selected format
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    json: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn crash_directories(&self, dirs: &[CrashDirectory]) {
        if self.json {
            let items: Vec<Value> = dirs
                .iter()
                .map(|d| {
                    json!({
                        "name": d.name,
                        "path": d.path.display().to_string(),
                        "has_log": d.has_log,
                    })
                })
                .collect();
            emit(&json!({ "directories": items }));
            return;
        }

        for dir in dirs {
            let marker = if dir.has_log { "" } else { "  (no log)" };
            println!("{}{marker}", dir.name);
        }
    }

    /// Call-trace listing of one log. An empty listing is reported together
    /// with `NoCallTraceFound`.
    pub fn call_traces(&self, log: &CrashLog, blocks: &[CallTraceBlock<'_>]) {
        if self.json {
            let mut value = json!({
                "directory": log.directory(),
                "log": log.path().display().to_string(),
                "call_traces": blocks,
            });
            if blocks.is_empty() {
                merge(&mut value, error_json(&TriageError::NoCallTraceFound));
            }
            emit(&value);
            return;
        }

        println!(
            "{}: {} call traces in {}",
            log.directory(),
            blocks.len(),
            log.path().display()
        );
        for block in blocks {
            println!(
                "  #{:<3} line {:<6} {}",
                block.index,
                block.line_number + 1,
                block.header.trim()
            );
        }
    }

    /// Position of the last call trace, for opening the log in a viewer
    pub fn trace_position(&self, log: &CrashLog, line: usize) {
        if self.json {
            emit(&json!({
                "file": log.path().display().to_string(),
                "line": line,
                "line_number": line + 1,
            }));
        } else {
            println!("{}:{}", log.path().display(), line + 1);
        }
    }

    pub fn trace_selection(&self, trace: &TraceSelection) {
        if self.json {
            let fault = match &trace.fault {
                Ok(fault) => json!({
                    "site": fault.site,
                    "location": result_json(fault.location.as_ref().map(location_json)),
                }),
                Err(e) => error_json(e),
            };
            emit(&json!({
                "index": trace.index,
                "line": trace.line_number,
                "header": trace.header,
                "frames": trace.frames,
                "fault": fault,
            }));
            return;
        }

        println!(
            "call trace #{} (line {}): {}",
            trace.index,
            trace.line_number + 1,
            trace.header.trim()
        );
        for (i, frame) in trace.frames.iter().enumerate() {
            println!("  {}", frame_line(i, frame));
        }

        match &trace.fault {
            Ok(fault) => {
                let site = &fault.site;
                println!(
                    "fault: {} [{}] (line {})",
                    site.function_ref,
                    site.module,
                    site.line_number + 1
                );
                match &fault.location {
                    Ok(location) => {
                        println!("  -> {}", location_text(location));
                        println!(
                            "You are viewing the first point of driver code which caused the crash"
                        );
                    }
                    Err(e) => println!("  {e}"),
                }
            }
            Err(e) => println!("fault: {e}"),
        }
    }

    pub fn frame_selection(&self, selection: &FrameSelection) {
        if self.json {
            emit(&json!({
                "index": selection.index,
                "frame": selection.frame,
                "location": selection.location.as_ref().map(location_json),
            }));
            return;
        }

        println!("{}", frame_line(selection.index, &selection.frame));
        match &selection.location {
            Some(location) => println!("  -> {}", location_text(location)),
            None => println!("  (no driver module, nothing to resolve)"),
        }
    }

    pub fn location(&self, location: &SourceLocation) {
        if self.json {
            emit(&location_json(location));
        } else {
            println!("{}", location_text(location));
        }
    }

    /// Report a failed request; text mode leaves this to the caller's stderr
    pub fn failure(&self, err: &TriageError) {
        if self.json {
            emit(&error_json(err));
        }
    }

    /// Like [`Reporter::failure`], for errors raised outside the pipeline
    pub fn error(&self, err: &anyhow::Error) {
        if !self.json {
            return;
        }
        match err.downcast_ref::<TriageError>() {
            Some(triage) => self.failure(triage),
            None => emit(&json!({ "error": "Error", "message": format!("{err:#}") })),
        }
    }
}

fn emit(value: &Value) {
    println!("{value:#}");
}

/// `#3 * <raw>`; the star marks frames that can be resolved
fn frame_line(index: usize, frame: &StackFrame) -> String {
    let mark = if frame.is_resolvable() { '*' } else { ' ' };
    format!("#{index:<3} {mark} {}", frame.raw.trim())
}

/// `path:line` with a 1-based line, the form editors accept
#[must_use]
pub fn location_text(location: &SourceLocation) -> String {
    format!("{}:{}", location.file.display(), location.line.one_based())
}

fn location_json(location: &SourceLocation) -> Value {
    json!({
        "file": location.file.display().to_string(),
        "line": location.line,
        "line_number": location.line.one_based(),
        "module": location.module,
        "function": location.function,
    })
}

fn error_json(err: &TriageError) -> Value {
    json!({ "error": err.kind(), "message": err.to_string() })
}

fn merge(target: &mut Value, extra: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        target.extend(extra);
    }
}

fn result_json(result: Result<Value, &TriageError>) -> Value {
    result.unwrap_or_else(error_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FunctionRef, LineIndex, ModuleName};
    use std::path::PathBuf;

    fn sample_location() -> SourceLocation {
        SourceLocation {
            file: PathBuf::from("/src/e1000/e1000.c"),
            line: LineIndex(411),
            module: ModuleName::from("e1000"),
            function: FunctionRef::from("my_probe+0x10"),
        }
    }

    #[test]
    fn test_location_text_is_one_based() {
        assert_eq!(location_text(&sample_location()), "/src/e1000/e1000.c:412");
    }

    #[test]
    fn test_location_json() {
        let value = location_json(&sample_location());
        assert_eq!(value["line"], 411);
        assert_eq!(value["line_number"], 412);
        assert_eq!(value["module"], "e1000");
        assert_eq!(value["function"], "my_probe+0x10");
    }

    #[test]
    fn test_error_json() {
        let value = error_json(&TriageError::UnknownFaultModule);
        assert_eq!(value["error"], "UnknownFaultModule");
        assert!(value["message"].as_str().unwrap().contains("known driver"));
    }

    #[test]
    fn test_merge_adds_error_fields() {
        let mut value = json!({ "call_traces": [] });
        merge(&mut value, error_json(&TriageError::NoCallTraceFound));
        assert_eq!(value["call_traces"], json!([]));
        assert_eq!(value["error"], "NoCallTraceFound");
    }

    #[test]
    fn test_frame_line_marks_resolvable() {
        let frame = StackFrame::parse(" nvme_irq_handler+0x20/0x40 [nvme]");
        assert_eq!(frame_line(2, &frame), "#2   * nvme_irq_handler+0x20/0x40 [nvme]");
        let frame = StackFrame::parse(" <TASK>");
        assert_eq!(frame_line(0, &frame), "#0     <TASK>");
    }
}
