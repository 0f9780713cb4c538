//! # Invocation Walk
//!
//! Depth-first pre-order traversal of a Soroban authorization tree.
//!
//! ```text
//!        root (depth 0)
//!       /    \
//!     a (1)   d (1)        visit order: root, a, b, c, d
//!    /   \
//!  b (2)  c (2)
//! ```

use stellar_xdr::curr::SorobanAuthorizedInvocation;

use super::errors::InvocationDepthExceeded;
use super::value_objects::MAX_INVOCATION_DEPTH;

/// Visit every node of the tree rooted at `root`, parents before children.
///
/// The visitor receives each node with its depth (root is 0). The walk stops
/// at the first visitor error, or with [`InvocationDepthExceeded`] when a node
/// lies at `MAX_INVOCATION_DEPTH` or deeper.
pub fn walk_invocation<E, F>(root: &SorobanAuthorizedInvocation, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&SorobanAuthorizedInvocation, usize) -> Result<(), E>,
    E: From<InvocationDepthExceeded>,
{
    walk_at(root, 0, visit)
}

fn walk_at<E, F>(node: &SorobanAuthorizedInvocation, depth: usize, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&SorobanAuthorizedInvocation, usize) -> Result<(), E>,
    E: From<InvocationDepthExceeded>,
{
    if depth >= MAX_INVOCATION_DEPTH {
        return Err(InvocationDepthExceeded {
            max: MAX_INVOCATION_DEPTH,
        }
        .into());
    }
    visit(node, depth)?;
    for child in node.sub_invocations.iter() {
        walk_at(child, depth + 1, visit)?;
    }
    Ok(())
}
