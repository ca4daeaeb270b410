//! helpers for logging.
//!
//! Every simulation rank logs to stderr.  Lines carry the rank so that interleaved output from a multi-rank run can
//! be pulled apart afterwards.
use std::sync::atomic::{AtomicU32, Ordering};

/// Rank stamped on log lines.  `u32::MAX` means "not part of a multi-rank run".
static RANK: AtomicU32 = AtomicU32::new(u32::MAX);

/// Log to stderr.
///
/// If called multiple times in the same process, only applies once.
pub fn log_to_stderr() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        env_logger::builder()
            .format(|buf, record| {
                use std::io::Write;

                let now = time::OffsetDateTime::now_utc();

                match current_rank() {
                    Some(rank) => writeln!(
                        buf,
                        "{} {} rank={} time={} target={}",
                        record.level(),
                        record.args(),
                        rank,
                        now,
                        record.target()
                    ),
                    None => writeln!(
                        buf,
                        "{} {} time={} target={}",
                        record.level(),
                        record.args(),
                        now,
                        record.target()
                    ),
                }
            })
            .init();
    });
}

/// Log to stderr, stamping every line with the given simulation rank.
///
/// The rank may be changed by calling this again; the logger itself is only installed once.
pub fn log_to_stderr_for_rank(rank: u32) {
    RANK.store(rank, Ordering::Relaxed);
    log_to_stderr();
}

/// The rank set by [log_to_stderr_for_rank], if any.
pub fn current_rank() -> Option<u32> {
    match RANK.load(Ordering::Relaxed) {
        u32::MAX => None,
        r => Some(r),
    }
}
