//! `tracing` output for the page. Each event becomes one console line.

use std::io;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Global (or environment variable) holding filter directives, e.g. `info,story_shell=debug`.
pub const LOG_FILTER_KEY: &str = "STORY_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Buffers one formatted event and hands it to `sink` when dropped.
pub struct LineWriter {
    buf: Vec<u8>,
    sink: fn(&str),
}

impl io::Write for LineWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end();
        if !line.is_empty() {
            (self.sink)(line);
        }
    }
}

#[derive(Clone, Copy)]
pub struct LineMakeWriter {
    sink: fn(&str),
}

impl LineMakeWriter {
    pub fn new(sink: fn(&str)) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for LineMakeWriter {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            buf: Vec::new(),
            sink: self.sink,
        }
    }
}

/// Filter from `directives`, falling back to `info` when absent or unparsable.
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

#[cfg(target_arch = "wasm32")]
fn console_sink(line: &str) {
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(line));
}

#[cfg(not(target_arch = "wasm32"))]
fn console_sink(line: &str) {
    eprintln!("{line}");
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    let filter = env_filter(crate::app::read_global(LOG_FILTER_KEY).as_deref());
    #[cfg(not(target_arch = "wasm32"))]
    let filter = EnvFilter::try_from_env(LOG_FILTER_KEY)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let installed = tracing_subscriber::fmt()
        .with_writer(LineMakeWriter::new(console_sink))
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time()
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("logging ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use tracing_subscriber::filter::LevelFilter;

    thread_local! {
        static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn capture(line: &str) {
        LINES.with(|l| l.borrow_mut().push(line.to_string()));
    }

    #[test]
    fn writer_emits_one_line_per_event() {
        let make = LineMakeWriter::new(capture);
        {
            let mut w = make.make_writer();
            write!(w, " INFO story: ").unwrap();
            writeln!(w, "ready").unwrap();
        }
        drop(make.make_writer());
        LINES.with(|l| assert_eq!(*l.borrow(), vec![" INFO story: ready".to_string()]));
    }

    #[test]
    fn filter_directives_fall_back_to_info() {
        assert_eq!(env_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(env_filter(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            env_filter(Some("warn")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
        assert_eq!(
            env_filter(Some("info,story_shell=debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            env_filter(Some("story_shell=loudest")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
