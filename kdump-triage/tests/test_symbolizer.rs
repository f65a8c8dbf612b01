//! GdbSymbolizer against shell scripts standing in for gdb.
//!
//! The scripts are run through `/bin/sh <script>` (as leading arguments) so
//! they never need the executable bit.

use kdump_triage::domain::{FunctionRef, TriageError};
use kdump_triage::symbolization::{GdbSymbolizer, SymbolResolver};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Answers like gdb for `nvme_irq_handler+0x20`, and like a stale binary otherwise.
/// Arguments arrive as: --batch -ex "list *(<ref>)" <binary>
const FAKE_GDB: &str = r#"
echo "Reading symbols from $4..."
case "$3" in
    "list *(nvme_irq_handler+0x20)")
        echo "0x20 is in nvme_irq_handler (drivers/nvme/host/pci.c:1089)."
        echo "1084	static irqreturn_t nvme_irq_handler(int irq, void *data)"
        ;;
    *)
        echo "No symbol \"${3}\" in current context." >&2
        exit 1
        ;;
esac
"#;

const HANGING_GDB: &str = "exec sleep 5\n";

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-gdb.sh");
    std::fs::write(&path, body).unwrap();
    path
}

fn fake_symbolizer(script: &Path) -> GdbSymbolizer {
    GdbSymbolizer::new("/bin/sh").with_leading_args(vec![script.to_string_lossy().into_owned()])
}

#[test]
fn test_resolves_listing_header() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), FAKE_GDB);

    let location = fake_symbolizer(&script)
        .resolve(Path::new("/src/nvme/nvme.ko"), &FunctionRef::from("nvme_irq_handler+0x20"))
        .unwrap();

    assert_eq!(location.path, "drivers/nvme/host/pci.c");
    assert_eq!(location.file_name(), "pci.c");
    assert_eq!(location.line, 1089);
}

#[test]
fn test_unknown_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), FAKE_GDB);

    let err = fake_symbolizer(&script)
        .resolve(Path::new("/src/nvme/nvme.ko"), &FunctionRef::from("renamed_fn+0x4"))
        .unwrap_err();

    match err {
        TriageError::SymbolNotFound { function, binary } => {
            assert_eq!(function, "renamed_fn+0x4");
            assert_eq!(binary, PathBuf::from("/src/nvme/nvme.ko"));
        }
        other => panic!("expected SymbolNotFound, got {other:?}"),
    }
}

#[test]
fn test_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "exit 0\n");

    let err = fake_symbolizer(&script)
        .resolve(Path::new("/src/a/a.ko"), &FunctionRef::from("f"))
        .unwrap_err();
    assert!(matches!(err, TriageError::SymbolNotFound { .. }));
}

#[test]
fn test_hanging_debugger_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), HANGING_GDB);
    let symbolizer = fake_symbolizer(&script).with_timeout(Some(Duration::from_millis(200)));

    let started = Instant::now();
    let err = symbolizer
        .resolve(Path::new("/src/a/a.ko"), &FunctionRef::from("f+0x1"))
        .unwrap_err();

    assert!(matches!(err, TriageError::SymbolResolutionTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(4), "debugger was not killed");
}
