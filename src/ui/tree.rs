//! Plan rendering as a destination-rooted tree

use crate::diff::SyncPlan;
use crate::types::{OpKind, Operation};
use std::collections::BTreeMap;
use std::fmt::Write;

const BLANK_MARKER: &str = "   ";

#[derive(Default)]
struct Node {
    kind: Option<OpKind>,
    dir: bool,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn insert(&mut self, operation: &Operation) {
        let mut node = self;
        for part in operation.path().split('/').filter(|part| !part.is_empty()) {
            node.dir = true;
            node = node.children.entry(part.to_string()).or_default();
        }
        node.kind = Some(operation.kind());
        if operation.is_dir_delete() {
            node.dir = true;
        }
    }

    fn render(&self, prefix: &str, out: &mut String) {
        let last = self.children.len().saturating_sub(1);
        for (index, (name, child)) in self.children.iter().enumerate() {
            let (connector, indent) = if index == last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            let marker = child.kind.map_or(BLANK_MARKER, OpKind::marker);
            let suffix = if child.dir { "/" } else { "" };
            let _ = writeln!(out, "{prefix}{connector}{marker} {name}{suffix}");
            child.render(&format!("{prefix}{indent}"), out);
        }
    }
}

/// Render a plan as the destination's future shape
///
/// Every affected path carries its marker (`[+]` copy, `[~]` replace,
/// `[-]` delete); ancestors without an operation of their own are shown
/// unmarked. A per-kind count line closes the report.
pub fn render_plan(plan: &SyncPlan) -> String {
    if plan.is_empty() {
        return "Directories are already in sync.".to_string();
    }

    let mut root = Node::default();
    for operation in plan.iter() {
        root.insert(operation);
    }

    let mut out = String::new();
    let destination = plan.destination_root.display().to_string();
    let _ = writeln!(out, "{}/", destination.trim_end_matches('/'));
    root.render("", &mut out);
    out.push('\n');
    out.push_str(&format_counts(plan));
    out
}

/// `copy: N  replace: N  delete: N`
pub fn format_counts(plan: &SyncPlan) -> String {
    OpKind::ORDER
        .iter()
        .map(|kind| format!("{}: {}", kind.label(), plan.count(*kind)))
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn plan(operations: Vec<Operation>) -> SyncPlan {
        SyncPlan::from_operations(PathBuf::from("src"), PathBuf::from("/backup/dst"), operations)
    }

    #[test]
    fn test_empty_plan_message() {
        assert_eq!(render_plan(&plan(Vec::new())), "Directories are already in sync.");
    }

    #[test]
    fn test_render_concrete_scenario() {
        let rendered = render_plan(&plan(vec![
            Operation::copy("sub/b.txt"),
            Operation::replace("a.txt"),
            Operation::delete_file("sub/c.txt"),
        ]));

        let expected = "\
/backup/dst/
├── [~] a.txt
└──     sub/
    ├── [+] b.txt
    └── [-] c.txt

copy: 1  replace: 1  delete: 1";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_directory_delete_marked_with_trailing_slash() {
        let rendered = render_plan(&plan(vec![
            Operation::delete_dir("sub/empty"),
            Operation::copy("z.txt"),
        ]));

        assert!(rendered.contains("├──     sub/\n│   └── [-] empty/\n"));
        assert!(rendered.contains("└── [+] z.txt\n"));
        assert!(rendered.ends_with("copy: 1  replace: 0  delete: 1"));
    }

    #[test]
    fn test_marked_directory_keeps_children() {
        let rendered = render_plan(&plan(vec![
            Operation::delete_dir("old"),
            Operation::delete_file("old/x.txt"),
        ]));

        assert!(rendered.contains("└── [-] old/\n    └── [-] x.txt\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let ops = vec![
            Operation::copy("b/2"),
            Operation::copy("a/1"),
            Operation::copy("b/1"),
        ];
        let first = render_plan(&plan(ops.clone()));
        let second = render_plan(&plan(ops.into_iter().rev().collect()));
        assert_eq!(first, second);
    }
}
