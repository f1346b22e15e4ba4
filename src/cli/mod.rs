//! CLI subcommand implementations for the `bizdb` binary.
//!
//! The binary is a thin external collaborator: it holds no parsing logic,
//! only argument handling and formatted output over [`crate::pagedb`],
//! [`crate::container`], and [`crate::efd`]'s public APIs. Each subcommand
//! module follows the teacher's pattern: an `Options` struct holding parsed
//! arguments and a `pub fn execute(opts, writer) -> Result<(), BizdbError>`
//! entry point, so output can be captured in tests or redirected via the
//! global `--output` flag.
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `bizdb db` | [`db`] | Table summary, or dump one table's rows |
//! | `bizdb container list` / `extract` | [`container`] | List entries, or extract to a directory |
//! | `bizdb supply unpack` | [`supply`] | Unpack an EFD supply package |

pub mod app;
pub mod container;
pub mod db;
pub mod supply;

/// Write a line to the given writer, converting `io::Error` to `BizdbError`.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::BizdbError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::BizdbError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;

/// Install a `tracing_subscriber` fmt layer when `-v/--verbose` is set. The
/// library itself stays silent (spec.md's formats decode synchronously and
/// report failure via `Result`); only the CLI narrates progress.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
