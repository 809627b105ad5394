//! SyncPlan - the three ordered operation sequences

use crate::types::{path_depth, OpKind, Operation};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Plan produced by comparing two directory states
///
/// Operations are grouped by kind. Copy and replace sequences, and file deletes,
/// are sorted lexicographically by path; directory deletes follow the file
/// deletes, deepest first. The plan is never modified after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    copies: Vec<Operation>,
    replaces: Vec<Operation>,
    deletes: Vec<Operation>,
}

impl SyncPlan {
    /// Group and order a set of operations into a plan
    ///
    /// # Example
    /// ```
    /// use mirrorsync::diff::SyncPlan;
    /// use mirrorsync::types::{OpKind, Operation};
    /// use std::path::PathBuf;
    ///
    /// let plan = SyncPlan::from_operations(
    ///     PathBuf::from("src"),
    ///     PathBuf::from("dst"),
    ///     vec![
    ///         Operation::delete_dir("a"),
    ///         Operation::copy("b.txt"),
    ///         Operation::delete_dir("a/b"),
    ///         Operation::delete_file("z.txt"),
    ///     ],
    /// );
    ///
    /// let deletes: Vec<_> = plan.operations(OpKind::Delete).iter().map(|op| op.path()).collect();
    /// assert_eq!(deletes, vec!["z.txt", "a/b", "a"]);
    /// assert_eq!(plan.count(OpKind::Copy), 1);
    /// ```
    pub fn from_operations(
        source_root: PathBuf,
        destination_root: PathBuf,
        operations: impl IntoIterator<Item = Operation>,
    ) -> Self {
        let mut plan = Self {
            source_root,
            destination_root,
            copies: Vec::new(),
            replaces: Vec::new(),
            deletes: Vec::new(),
        };

        for operation in operations {
            match operation.kind() {
                OpKind::Copy => plan.copies.push(operation),
                OpKind::Replace => plan.replaces.push(operation),
                OpKind::Delete => plan.deletes.push(operation),
            }
        }

        plan.copies.sort_by(|a, b| a.path().cmp(b.path()));
        plan.replaces.sort_by(|a, b| a.path().cmp(b.path()));
        plan.deletes.sort_by(delete_order);
        plan.copies.dedup();
        plan.replaces.dedup();
        plan.deletes.dedup();

        plan
    }

    /// Ordered operations of one kind
    pub fn operations(&self, kind: OpKind) -> &[Operation] {
        match kind {
            OpKind::Copy => &self.copies,
            OpKind::Replace => &self.replaces,
            OpKind::Delete => &self.deletes,
        }
    }

    /// All operations in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        OpKind::ORDER
            .into_iter()
            .flat_map(move |kind| self.operations(kind).iter())
    }

    pub fn count(&self, kind: OpKind) -> usize {
        self.operations(kind).len()
    }

    pub fn len(&self) -> usize {
        self.copies.len() + self.replaces.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// File deletes first (lexicographic), then directory deletes deepest-first
fn delete_order(a: &Operation, b: &Operation) -> Ordering {
    match (a.is_dir_delete(), b.is_dir_delete()) {
        (false, false) => a.path().cmp(b.path()),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => path_depth(b.path())
            .cmp(&path_depth(a.path()))
            .then_with(|| a.path().cmp(b.path())),
    }
}
