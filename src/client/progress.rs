//! Progress bar styling
// (c) 2024 Ross Younger

use console::Term;

/// Redraw rate limit for the progress display
pub(crate) const MAX_UPDATE_FPS: u8 = 20;

// a.txt [=========================>            ] 70% 1.24GB 2m30s @ 123.4MB/s
const PROGRESS_STYLE_COMPACT: &str =
    "{msg:.dim} {wide_bar:.cyan} {percent:>3}% {decimal_total_bytes:.dim} {eta} @ {decimal_bytes_per_sec}";

// Room for the bar, percentage and rate readout
const DATA_AND_PROGRESS: usize = 55;

// an-extremely-long-file-name-that-would-squeeze-the-bar-to-nothing     70% 1.24GB
// [==========================>                         ] 2m30s @ 123.4MB/s
const PROGRESS_STYLE_OVERLONG: &str =
    "{wide_msg:.dim} {percent:>3}% {decimal_total_bytes:.dim}\n{wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec}";

fn use_long_style(terminal: &Term, msg_size: usize) -> bool {
    let term_width = terminal.size().1 as usize; // this returns a reasonable default if it can't detect
    msg_size + DATA_AND_PROGRESS > term_width
}

/// Picks a template for a file name of the given length
pub(crate) fn progress_style_for(terminal: &Term, msg_size: usize) -> &'static str {
    if use_long_style(terminal, msg_size) {
        PROGRESS_STYLE_OVERLONG
    } else {
        PROGRESS_STYLE_COMPACT
    }
}
