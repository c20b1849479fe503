use std::fmt;

/// Receives the narration of a traced search, one line per considered
/// branch. `depth` is the nesting level of the branch.
pub trait TraceSink {
    fn line(&mut self, depth: usize, message: &str);
}

/// Collects indented lines, two spaces per level.
impl TraceSink for Vec<String> {
    fn line(&mut self, depth: usize, message: &str) {
        self.push(format!("{:indent$}{}", "", message, indent = depth * 2));
    }
}

/// Forwards every line to `tracing` at debug level, depth as a field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn line(&mut self, depth: usize, message: &str) {
        tracing::debug!(target: "blackjack_ev::trace", depth, "{}", message);
    }
}

/// Narration context for one top-level `decide` call. The depth travels as
/// an ordinary argument, so returning from a branch restores it.
pub(crate) struct Trace<'a> {
    sink: Option<&'a mut dyn TraceSink>,
}

impl<'a> Trace<'a> {
    pub(crate) fn disabled() -> Self {
        Self { sink: None }
    }

    pub(crate) fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Memo tables are bypassed while narrating.
    pub(crate) fn enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn line(&mut self, depth: usize, message: fmt::Arguments<'_>) {
        if let Some(sink) = self.sink.as_mut() {
            sink.line(depth, &message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_indents_by_depth() {
        let mut lines: Vec<String> = Vec::new();
        let mut trace = Trace::new(&mut lines);
        assert!(trace.enabled());
        trace.line(0, format_args!("top"));
        trace.line(2, format_args!("nested {}", 1));
        assert_eq!(lines, vec!["top".to_string(), "    nested 1".to_string()]);
    }

    #[test]
    fn disabled_trace_is_silent() {
        let mut trace = Trace::disabled();
        assert!(!trace.enabled());
        trace.line(0, format_args!("ignored"));
    }
}
