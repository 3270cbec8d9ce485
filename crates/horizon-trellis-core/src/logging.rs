//! Debug formatting helpers for tracing output.
//!
//! - [`format_tree`] - indented dump of any tree-shaped structure, used by
//!   the host tree to log the current node hierarchy
//! - [`PerfSpan`] - logs the elapsed wall-clock time of a scope on drop

use std::fmt::Write as _;
use std::time::Instant;

/// Produce an indented, one-line-per-node dump of a tree.
///
/// `label` renders a single node; `children` lists its children. The output
/// is meant for `tracing::debug!` payloads, not for machine consumption.
///
/// # Example
///
/// ```
/// use horizon_trellis_core::logging::format_tree;
///
/// struct T(&'static str, Vec<T>);
///
/// let tree = T("window", vec![T("box", vec![T("label", vec![])])]);
/// let dump = format_tree(&tree, &|n| n.0.to_string(), &|n| n.1.iter().collect());
/// assert_eq!(dump, "window\n  box\n    label\n");
/// ```
pub fn format_tree<N: ?Sized>(
    root: &N,
    label: &dyn Fn(&N) -> String,
    children: &dyn Fn(&N) -> Vec<&N>,
) -> String {
    let mut out = String::new();
    format_subtree(root, label, children, 0, &mut out);
    out
}

fn format_subtree<N: ?Sized>(
    node: &N,
    label: &dyn Fn(&N) -> String,
    children: &dyn Fn(&N) -> Vec<&N>,
    depth: usize,
    out: &mut String,
) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    let _ = writeln!(out, "{}", label(node));
    for child in children(node) {
        format_subtree(child, label, children, depth + 1, out);
    }
}

/// Logs the elapsed time of a scope when dropped.
///
/// ```
/// use horizon_trellis_core::logging::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("apply_update");
///     // ... work ...
/// } // trace event with the elapsed time is emitted here
/// ```
pub struct PerfSpan {
    name: &'static str,
    start: Instant,
}

impl PerfSpan {
    /// Start timing a named scope.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        tracing::trace!(
            target: "horizon_trellis_core::perf",
            name = self.name,
            elapsed_us = self.start.elapsed().as_micros() as u64,
            "scope finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct T(&'static str, Vec<T>);

    #[test]
    fn test_format_tree_indents_by_depth() {
        let tree = T(
            "root",
            vec![T("a", vec![T("a1", vec![])]), T("b", vec![])],
        );
        let dump = format_tree(&tree, &|n| n.0.to_string(), &|n| n.1.iter().collect());
        assert_eq!(dump, "root\n  a\n    a1\n  b\n");
    }

    #[test]
    fn test_perf_span_does_not_panic() {
        let _span = PerfSpan::new("noop");
    }
}
